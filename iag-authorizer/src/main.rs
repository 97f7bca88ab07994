//! IAG authorizer server
//!
//! Exits 1 when the delegation store cannot be opened or the listening
//! port cannot be bound.

use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use iag_authorizer::store::DelegationStore;
use iag_authorizer::{configure, AppState, Config};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;
    let store = DelegationStore::open(&config.db_path).await?;
    info!(db = %config.db_path, strict = config.strict, "delegation store open");

    let bind_addr = ("0.0.0.0", config.port);
    info!(port = config.port, "starting iag-authorizer");

    let state = web::Data::new(AppState { config, store });

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
