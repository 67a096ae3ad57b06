use actix_web::web::{self};
use middleware::session::SessionMiddleware;

pub mod cache;

pub mod routes {
    pub mod stats;
}

pub mod services {
    pub mod client;
    pub mod registry;
}

pub mod models {
    pub mod stats;
}

pub mod middleware {
    pub mod session;
}

pub use cache::StatsCache;
pub use services::{
    client::StatsClient,
    registry::{StatsRegistry, StatsSource},
};

pub fn session_middleware() -> SessionMiddleware {
    SessionMiddleware::new()
}

pub fn mount_dashboard() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<actix_web::body::BoxBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("/dashboard")
        .wrap(session_middleware())
        .service(routes::stats::get_stats)
        .service(routes::stats::post_refresh_stats)
        .service(routes::stats::delete_stats)
}
