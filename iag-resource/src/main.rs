//! Demo resource server
//!
//! Exits 1 when the listening port cannot be bound.

use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use iag_resource::{configure, AppState, Config};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;
    let bind_addr = ("0.0.0.0", config.port);
    info!(port = config.port, resource = %config.resource, "starting iag-resource");

    let state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
