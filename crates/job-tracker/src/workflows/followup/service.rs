use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::dispatch::{FollowUpDispatcher, FollowUpMessage};
use super::domain::{Application, ApplicationId, ApplicationStatus, FollowUpState};
use super::evaluation::{
    EvaluationConfig, FollowUpEvaluator, FollowUpSelection, ValidationIssue, WaitPeriod,
};
use super::repository::{FollowUpRepository, RepositoryError};

/// Outbound delivery controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// When false every dispatch is a dry run and nothing is written.
    pub live_send_mode: bool,
    /// Every message is routed here; required in live mode.
    pub recipient: Option<String>,
    pub sender_name: String,
    /// Oldest candidates first, at most this many per run.
    pub max_per_run: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            live_send_mode: false,
            recipient: None,
            sender_name: "Job Seeker".to_string(),
            max_per_run: 10,
        }
    }
}

/// Service composing the repository, evaluator, and outbound dispatcher.
pub struct FollowUpService<R, D> {
    repository: Arc<R>,
    dispatcher: Arc<D>,
    evaluator: FollowUpEvaluator,
    settings: DispatchSettings,
    dispatch_lock: Mutex<()>,
}

impl<R, D> FollowUpService<R, D>
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        dispatcher: Arc<D>,
        config: EvaluationConfig,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            evaluator: FollowUpEvaluator::new(config),
            settings,
            dispatch_lock: Mutex::new(()),
        }
    }

    pub fn evaluator(&self) -> &FollowUpEvaluator {
        &self.evaluator
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Evaluate the current snapshot without touching storage.
    pub fn review(&self, now: NaiveDateTime) -> Result<FollowUpSelection, FollowUpServiceError> {
        let snapshots = self.repository.snapshot()?;
        let selection = self.evaluator.select(&snapshots, now);

        for issue in &selection.issues {
            warn!(application_id = issue.application_id().0, %issue, "follow-up input issue");
        }
        info!(
            evaluated = selection.evaluated,
            candidates = selection.candidates.len(),
            upcoming = selection.upcoming.len(),
            rejected = selection.rejected(),
            "follow-up review complete"
        );

        Ok(selection)
    }

    /// Send follow-ups for the oldest due applications, up to `max_per_run`.
    ///
    /// An application is marked followed up only after the dispatcher confirms the
    /// send. Runs are serialized so a concurrent run re-reads the marks of the
    /// previous one.
    pub fn dispatch(&self, now: NaiveDateTime) -> Result<DispatchReport, FollowUpServiceError> {
        let _guard = self
            .dispatch_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("dispatch lock poisoned".to_string()))?;

        let live = self.settings.live_send_mode;
        if live && self.settings.recipient.is_none() {
            return Err(FollowUpServiceError::MissingRecipient);
        }

        let selection = self.review(now)?;
        let limit = self.settings.max_per_run;
        let deferred = selection.candidates.len().saturating_sub(limit);
        let mut outcomes = Vec::new();

        for candidate in selection.candidates.iter().take(limit) {
            let message = FollowUpMessage::compose(
                candidate,
                self.settings.recipient.as_deref(),
                &self.settings.sender_name,
            );
            let application = &candidate.application;

            let (status, detail) = if !live {
                info!(
                    application_id = application.id.0,
                    company = application.company_label(),
                    title = application.title_label(),
                    days_since_applied = candidate.days_since_applied,
                    "[dry run] would send follow-up"
                );
                (DispatchStatus::DryRun, None)
            } else {
                self.deliver(&message, now)
            };

            outcomes.push(DispatchOutcome {
                application_id: application.id,
                company_name: application.company_name.clone(),
                job_title: application.job_title.clone(),
                days_since_applied: candidate.days_since_applied,
                status,
                detail,
            });
        }

        if deferred > 0 {
            info!(
                deferred,
                limit, "follow-up run limit reached; remaining candidates deferred"
            );
        }

        Ok(DispatchReport {
            evaluated_at: now,
            dry_run: !live,
            candidates: selection.candidates.len(),
            deferred,
            outcomes,
            issues: selection.issues,
        })
    }

    fn deliver(
        &self,
        message: &FollowUpMessage,
        now: NaiveDateTime,
    ) -> (DispatchStatus, Option<String>) {
        let id = message.application_id;

        if let Err(err) = self.dispatcher.send(message) {
            warn!(application_id = id.0, error = %err, "follow-up dispatch failed");
            return (DispatchStatus::Failed, Some(err.to_string()));
        }

        match self.repository.mark_followup_sent(id, now, Some(message)) {
            Ok(()) => {
                info!(application_id = id.0, "follow-up sent and recorded");
                (DispatchStatus::Sent, None)
            }
            Err(err) if err.is_conflict() => {
                warn!(application_id = id.0, error = %err, "follow-up recorded concurrently");
                (DispatchStatus::Conflict, Some(err.to_string()))
            }
            Err(err) => {
                warn!(application_id = id.0, error = %err, "follow-up sent but not recorded");
                (DispatchStatus::Failed, Some(err.to_string()))
            }
        }
    }

    /// Confirm a follow-up that was dispatched outside of [`Self::dispatch`].
    pub fn mark_sent(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
    ) -> Result<FollowUpUpdate, FollowUpServiceError> {
        self.repository.mark_followup_sent(id, at, None)?;
        info!(application_id = id.0, "follow-up marked sent");
        self.describe_update(id, at)
    }

    /// Record inbound correspondence; the application leaves the follow-up flow for good.
    pub fn record_response(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
    ) -> Result<FollowUpUpdate, FollowUpServiceError> {
        self.repository.record_response(id, at)?;
        info!(application_id = id.0, "response recorded");
        self.describe_update(id, at)
    }

    /// The write is already committed; records that fail validation come back without a view.
    fn describe_update(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
    ) -> Result<FollowUpUpdate, FollowUpServiceError> {
        let snapshot = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound(id))?;

        let (view, issues) = match Application::from_snapshot(&snapshot) {
            Ok(application) => (
                Some(FollowUpStatusView::build(&self.evaluator, &application, at)),
                Vec::new(),
            ),
            Err(issues) => {
                warn!(
                    application_id = id.0,
                    issues = issues.len(),
                    "update recorded for a record that cannot be evaluated"
                );
                (None, issues)
            }
        };

        Ok(FollowUpUpdate {
            application_id: id,
            recorded_at: at,
            view,
            issues,
        })
    }

    /// Follow-up state and next eligible time for one application.
    pub fn status(
        &self,
        id: ApplicationId,
        now: NaiveDateTime,
    ) -> Result<FollowUpStatusView, FollowUpServiceError> {
        let snapshot = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound(id))?;
        let application = Application::from_snapshot(&snapshot).map_err(|issues| {
            FollowUpServiceError::InvalidRecord {
                application_id: id,
                issues,
            }
        })?;

        Ok(FollowUpStatusView::build(&self.evaluator, &application, now))
    }
}

/// Per-application outcome of a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    DryRun,
    Conflict,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub application_id: ApplicationId,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub days_since_applied: i64,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub evaluated_at: NaiveDateTime,
    pub dry_run: bool,
    pub candidates: usize,
    pub deferred: usize,
    pub outcomes: Vec<DispatchOutcome>,
    pub issues: Vec<ValidationIssue>,
}

impl DispatchReport {
    pub fn count(&self, status: DispatchStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }
}

/// Follow-up view of a single application for API and CLI responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpStatusView {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub state: FollowUpState,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub applied_at: NaiveDateTime,
    pub next_followup_at: NaiveDateTime,
    pub wait: WaitPeriod,
    pub followup_sent: bool,
    pub response_received: bool,
}

impl FollowUpStatusView {
    pub fn build(
        evaluator: &FollowUpEvaluator,
        application: &Application,
        now: NaiveDateTime,
    ) -> Self {
        let default_wait_days = evaluator.config().default_wait_days;
        Self {
            application_id: application.id,
            status: application.status,
            state: evaluator.state(application, now),
            company_name: application.company_name.clone(),
            job_title: application.job_title.clone(),
            applied_at: application.applied_at,
            next_followup_at: evaluator.next_followup_time(application),
            wait: super::evaluation::wait_period(application, default_wait_days),
            followup_sent: application.followup_sent,
            response_received: application.response_received,
        }
    }
}

/// Outcome of a follow-up or response write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpUpdate {
    pub application_id: ApplicationId,
    pub recorded_at: NaiveDateTime,
    /// Absent when the stored record cannot be evaluated; see `issues`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<FollowUpStatusView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

/// Error raised by the follow-up service.
#[derive(Debug, thiserror::Error)]
pub enum FollowUpServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("application {application_id} cannot be evaluated: {}", join_issues(.issues))]
    InvalidRecord {
        application_id: ApplicationId,
        issues: Vec<ValidationIssue>,
    },
    #[error("live send mode requires a follow-up recipient")]
    MissingRecipient,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
