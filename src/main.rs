use std::sync::Arc;

use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use anyhow::Context;
use chat_relay::config::Config;
use chat_relay::model::HttpUpstream;
use chat_relay::web::routes;
use chat_relay::AppState;
use dotenv::dotenv;
use log::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting chat relay");

    let config = Config::from_env().context("failed to load configuration")?;
    if config.upstream.api_key.is_none() {
        warn!(
            "No API key configured for {}; chat will be answered from quick replies and fallbacks only",
            config.upstream.provider.name()
        );
    }

    let upstream = HttpUpstream::new(config.upstream.clone())?;
    let app_state = Data::new(
        AppState::new(&config, Arc::new(upstream)).context("failed to build chat service")?,
    );

    info!("Listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
