use actix_web::{web, App, HttpServer};
use log::{error, info, warn};
use std::io;

use book_catalog::api;
use book_catalog::app_state::AppState;
use book_catalog::config::AppConfig;

fn init_logging(config: &AppConfig) {
    if let Err(e) = log4rs::init_file(&config.logging.config_file, Default::default()) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        warn!("Could not load log config {} ({}), logging to stderr", config.logging.config_file, e);
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::load().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    init_logging(&config);

    let state = AppState::from_config(config.clone()).map_err(|e| {
        error!("Failed to initialize storage: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    if config.storage.sweep_orphans_on_start {
        match state.catalog.sweep_orphans() {
            Ok(report) if report.is_clean() => info!("Catalog is consistent"),
            Ok(report) => warn!("Startup sweep: {:?}", report),
            Err(e) => error!("Startup sweep failed: {}", e),
        }
    }

    info!("Starting server on {}:{}", config.server.host, config.server.port);
    let max_payload_size = config.server.max_payload_size;
    let data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(data.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .configure(api::configure)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
