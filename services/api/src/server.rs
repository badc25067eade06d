use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryDirectory, Services};
use crate::routes::with_domain_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use wvpp_compliance::config::AppConfig;
use wvpp_compliance::error::AppError;
use wvpp_compliance::telemetry;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = InMemoryDirectory::sample(Local::now().date_naive());
    let services = Services::in_memory(&config.reminders, directory);
    if config.reminders.cron_secret.is_none() {
        info!("REMINDER_CRON_SECRET not set; reminder tick endpoint will refuse all calls");
    }

    let app = with_domain_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "wvpp compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
