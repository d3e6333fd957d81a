use chrono::{Local, NaiveDateTime};
use job_tracker::config::AppConfig;
use job_tracker::error::AppError;
use job_tracker::store::SqliteStore;
use job_tracker::workflows::followup::{ApplicationStatus, FollowUpService, LoggingDispatcher};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type TrackerService = FollowUpService<SqliteStore, LoggingDispatcher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Opens the configured database and applies pending schema changes.
pub(crate) fn open_store(config: &AppConfig) -> Result<SqliteStore, AppError> {
    let store = SqliteStore::open(&config.database.path)?;
    store.init_schema()?;
    info!(path = %config.database.path.display(), "tracker database ready");
    Ok(store)
}

pub(crate) fn build_followup_service(config: &AppConfig, store: SqliteStore) -> TrackerService {
    FollowUpService::new(
        Arc::new(store),
        Arc::new(LoggingDispatcher),
        config.followup.evaluation_config(),
        config.followup.dispatch_settings(),
    )
}

pub(crate) fn parse_status(raw: &str) -> Result<ApplicationStatus, String> {
    raw.parse::<ApplicationStatus>().map_err(|err| err.to_string())
}

pub(crate) fn resolve_moment(value: Option<NaiveDateTime>) -> NaiveDateTime {
    value.unwrap_or_else(|| Local::now().naive_local())
}
