use crate::cli::ServeArgs;
use crate::infra::{build_followup_service, open_store, AppState};
use crate::routes::with_followup_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use job_tracker::config::AppConfig;
use job_tracker::error::AppError;
use job_tracker::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let store = open_store(&config)?;
    let followup_service = Arc::new(build_followup_service(&config, store));

    let app = with_followup_routes(followup_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        live_send_mode = config.followup.live_send_mode,
        "job tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
