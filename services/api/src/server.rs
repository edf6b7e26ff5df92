use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use souk::config::AppConfig;
use souk::error::AppError;
use souk::listings::{seed, ListingHub};
use souk::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryListingDirectory};
use crate::routes::with_listing_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = match args.seed.take() {
        Some(path) => {
            let records = seed::records_from_path(&path)?;
            info!(count = records.len(), path = %path.display(), "seeded listing directory");
            Arc::new(InMemoryListingDirectory::seeded(records))
        }
        None => Arc::new(InMemoryListingDirectory::default()),
    };
    let hub = Arc::new(ListingHub::new(
        directory,
        config.listings.session_settings(),
        config.listings.bookmark_dir.clone(),
    ));

    let app = with_listing_routes(hub)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "listing workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
