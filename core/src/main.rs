mod cors;

use std::{sync::Arc, time::Duration};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_stats::{StatsClient, StatsRegistry};
use api_subs::ClassifierOptions;
use common::env_config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(config.is_production()).expect("Failed to set up logger");
    }

    // subscription badge rules
    let classifier_options = web::Data::new(ClassifierOptions::from(config.as_ref()));
    log::info!("Subscription classifier: {:?}", classifier_options.get_ref());

    // one stats cache per session, shared by all workers
    let client = StatsClient::new(&config.backend).map_err(std::io::Error::other)?;
    log::info!(
        "Stats from {} cached for {}ms",
        client.stats_url(),
        config.stats_ttl.as_millis()
    );
    let registry = web::Data::new(
        StatsRegistry::new(Arc::new(client), config.stats_ttl)
            .with_idle_timeout(config.stats_idle_timeout),
    );

    // sweep sessions nobody asked about for a while
    let sweeper = registry.clone();
    actix_web::rt::spawn(async move {
        let mut tick = actix_web::rt::time::interval((sweeper.idle_timeout() / 2).max(Duration::from_secs(1)));
        loop {
            tick.tick().await;
            sweeper.purge_idle();
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(classifier_options.clone())
            .app_data(registry.clone())
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_subs::mount_subs())
                    .service(api_stats::mount_dashboard()),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
