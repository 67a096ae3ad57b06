use std::fs::File;

use colored::{ColoredString, Colorize};
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

const LOG_FILE: &str = "wordtowallet.log";

/// Sends records to stdout with colored levels and to [`LOG_FILE`] as plain
/// text. Debug in development, info in production.
pub fn setup(is_production: bool) -> Result<(), fern::InitError> {
    File::create(LOG_FILE).map_err(fern::InitError::Io)?;

    let level = if is_production {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Debug
    };

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {} {} {}",
                timestamp(),
                level_label(record.level()),
                record.target().bright_black(),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {} {}",
                timestamp(),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(fern::log_file(LOG_FILE)?);

    fern::Dispatch::new()
        .level(level)
        // upstream client internals
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("hyper_util", log::LevelFilter::Off)
        .level_for("h2", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        // server internals, keep worker start/stop
        .level_for("actix_server", log::LevelFilter::Info)
        .level_for("actix_http", log::LevelFilter::Warn)
        .level_for("mio", log::LevelFilter::Off)
        .chain(console)
        .chain(file)
        .apply()?;
    Ok(())
}

fn timestamp() -> impl std::fmt::Display {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
}

/// Fixed-width, colored level tag for the console.
fn level_label(level: log::Level) -> ColoredString {
    match level {
        log::Level::Error => "ERROR".red().bold(),
        log::Level::Warn => "WARN ".yellow(),
        log::Level::Info => "INFO ".green(),
        log::Level::Debug => "DEBUG".magenta(),
        log::Level::Trace => "TRACE".bright_black(),
    }
}

pub fn middleware() -> LoggerMiddleware {
    LoggerMiddleware::new()
}
