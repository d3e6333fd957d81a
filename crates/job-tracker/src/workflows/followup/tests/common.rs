use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::workflows::followup::dispatch::{DispatchError, FollowUpDispatcher, FollowUpMessage};
use crate::workflows::followup::domain::{ApplicationId, ApplicationSnapshot};
use crate::workflows::followup::repository::{FollowUpRepository, RepositoryError};
use crate::workflows::followup::{
    followup_router, DispatchSettings, EvaluationConfig, FollowUpService,
};

pub(super) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 20)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .expect("valid timestamp")
}

pub(super) fn days_ago(days: i64) -> NaiveDateTime {
    now() - Duration::days(days)
}

pub(super) fn snapshot(id: i64, status: &str, applied_days_ago: i64) -> ApplicationSnapshot {
    ApplicationSnapshot {
        id: ApplicationId(id),
        status: status.to_string(),
        applied_at: Some(days_ago(applied_days_ago)),
        response_received: false,
        followup_sent: false,
        followup_override_days: None,
        company_name: Some(format!("Company {id}")),
        job_title: Some("Business Analyst".to_string()),
    }
}

pub(super) fn applied(id: i64, applied_days_ago: i64) -> ApplicationSnapshot {
    snapshot(id, "APPLIED", applied_days_ago)
}

pub(super) fn candidate_ids(snapshots: &[ApplicationSnapshot]) -> Vec<i64> {
    crate::workflows::followup::select_followup_candidates(snapshots, now(), 7)
        .candidates
        .iter()
        .map(|candidate| candidate.application.id.0)
        .collect()
}

pub(super) fn live_settings() -> DispatchSettings {
    DispatchSettings {
        live_send_mode: true,
        recipient: Some("followups@example.com".to_string()),
        sender_name: "Test Sender".to_string(),
        max_per_run: 10,
    }
}

pub(super) fn build_service(
    snapshots: Vec<ApplicationSnapshot>,
    settings: DispatchSettings,
) -> (
    FollowUpService<MemoryRepository, MemoryDispatcher>,
    Arc<MemoryRepository>,
    Arc<MemoryDispatcher>,
) {
    let repository = Arc::new(MemoryRepository::with(snapshots));
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let service = FollowUpService::new(
        repository.clone(),
        dispatcher.clone(),
        EvaluationConfig::default(),
        settings,
    );
    (service, repository, dispatcher)
}

/// In-memory store keyed by id; `snapshot` preserves insertion order.
#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<BTreeMap<i64, ApplicationSnapshot>>,
    order: Mutex<Vec<i64>>,
}

impl MemoryRepository {
    pub(super) fn with(snapshots: Vec<ApplicationSnapshot>) -> Self {
        let repository = Self::default();
        {
            let mut records = repository.records.lock().expect("repository mutex poisoned");
            let mut order = repository.order.lock().expect("repository mutex poisoned");
            for snapshot in snapshots {
                order.push(snapshot.id.0);
                records.insert(snapshot.id.0, snapshot);
            }
        }
        repository
    }

    pub(super) fn get(&self, id: i64) -> ApplicationSnapshot {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&id)
            .cloned()
            .expect("record present")
    }

    fn update<F>(&self, id: ApplicationId, apply: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut ApplicationSnapshot) -> Result<(), RepositoryError>,
    {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        let snapshot = records.get_mut(&id.0).ok_or(RepositoryError::NotFound(id))?;
        apply(snapshot)
    }
}

impl FollowUpRepository for MemoryRepository {
    fn snapshot(&self) -> Result<Vec<ApplicationSnapshot>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        let order = self.order.lock().expect("repository mutex poisoned");
        Ok(order
            .iter()
            .filter_map(|id| records.get(id).cloned())
            .collect())
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationSnapshot>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records.get(&id.0).cloned())
    }

    fn mark_followup_sent(
        &self,
        id: ApplicationId,
        _at: NaiveDateTime,
        _message: Option<&FollowUpMessage>,
    ) -> Result<(), RepositoryError> {
        self.update(id, |snapshot| {
            snapshot.check_followup_mark()?;
            snapshot.followup_sent = true;
            Ok(())
        })
    }

    fn record_response(
        &self,
        id: ApplicationId,
        _at: NaiveDateTime,
    ) -> Result<(), RepositoryError> {
        self.update(id, |snapshot| {
            snapshot.response_received = true;
            Ok(())
        })
    }
}

/// Repository whose follow-up marks always lose the race.
pub(super) struct RacingRepository {
    pub(super) inner: MemoryRepository,
}

impl FollowUpRepository for RacingRepository {
    fn snapshot(&self) -> Result<Vec<ApplicationSnapshot>, RepositoryError> {
        self.inner.snapshot()
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationSnapshot>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn mark_followup_sent(
        &self,
        id: ApplicationId,
        _at: NaiveDateTime,
        _message: Option<&FollowUpMessage>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::AlreadyFollowedUp(id))
    }

    fn record_response(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
    ) -> Result<(), RepositoryError> {
        self.inner.record_response(id, at)
    }
}

pub(super) struct UnavailableRepository;

impl FollowUpRepository for UnavailableRepository {
    fn snapshot(&self) -> Result<Vec<ApplicationSnapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ApplicationId) -> Result<Option<ApplicationSnapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn mark_followup_sent(
        &self,
        _id: ApplicationId,
        _at: NaiveDateTime,
        _message: Option<&FollowUpMessage>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_response(
        &self,
        _id: ApplicationId,
        _at: NaiveDateTime,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryDispatcher {
    sent: Mutex<Vec<FollowUpMessage>>,
}

impl MemoryDispatcher {
    pub(super) fn sent(&self) -> Vec<FollowUpMessage> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl FollowUpDispatcher for MemoryDispatcher {
    fn send(&self, message: &FollowUpMessage) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(message.clone());
        Ok(())
    }
}

/// Dispatcher that refuses messages for one application id.
pub(super) struct FlakyDispatcher {
    pub(super) failing_id: i64,
    pub(super) delegate: MemoryDispatcher,
}

impl FollowUpDispatcher for FlakyDispatcher {
    fn send(&self, message: &FollowUpMessage) -> Result<(), DispatchError> {
        if message.application_id.0 == self.failing_id {
            return Err(DispatchError::Transport("smtp timeout".to_string()));
        }
        self.delegate.send(message)
    }
}

pub(super) fn router_with_service(
    service: FollowUpService<MemoryRepository, MemoryDispatcher>,
) -> axum::Router {
    followup_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
