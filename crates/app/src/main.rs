mod animals;
mod error;
mod router;
mod telemetry;

use std::net::SocketAddr;

use refugio_geo::GeoClient;
use refugio_storage::Database;
use refugio_util::{load_env_file, AppConfig};
use tracing::info;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let storage = Database::connect(&config.database_url).await?;
    // Serving traffic against a store missing its table is not acceptable,
    // so schema setup failure aborts startup.
    storage.ensure_schema().await?;

    let geo_base = Url::parse(&config.georef_base_url)?;
    let http = reqwest::Client::builder()
        .timeout(config.geo_timeout)
        .build()?;
    let geo = GeoClient::new(geo_base, http);

    let state = router::AppState::new(metrics, storage, geo);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
