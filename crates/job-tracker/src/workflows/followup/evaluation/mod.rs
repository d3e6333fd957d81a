mod config;
mod policy;
mod rules;

pub use config::{EvaluationConfig, DEFAULT_WAIT_DAYS};
pub use policy::{WaitPeriod, WaitSource};
pub use rules::{Eligibility, ExclusionReason};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, ApplicationSnapshot, FollowUpState};
use policy::resolve_wait_period;

/// Problem found in a single record while building a selection.
///
/// Missing timestamps and unknown statuses reject the record; an invalid override
/// only downgrades it to the default waiting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("application {application_id} has no applied_at timestamp")]
    MissingAppliedAt { application_id: ApplicationId },
    #[error("application {application_id} has unrecognized status '{value}'")]
    UnknownStatus {
        application_id: ApplicationId,
        value: String,
    },
    #[error(
        "application {application_id} has invalid follow-up override of {days} day(s); default wait applied"
    )]
    InvalidOverride {
        application_id: ApplicationId,
        days: i64,
    },
}

impl ValidationIssue {
    pub fn application_id(&self) -> ApplicationId {
        match self {
            ValidationIssue::MissingAppliedAt { application_id }
            | ValidationIssue::UnknownStatus { application_id, .. }
            | ValidationIssue::InvalidOverride { application_id, .. } => *application_id,
        }
    }

    pub fn rejects_record(&self) -> bool {
        match self {
            ValidationIssue::MissingAppliedAt { .. } | ValidationIssue::UnknownStatus { .. } => {
                true
            }
            ValidationIssue::InvalidOverride { .. } => false,
        }
    }
}

/// Application that is due for a follow-up right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpCandidate {
    pub application: Application,
    pub wait: WaitPeriod,
    pub due_at: NaiveDateTime,
    pub days_since_applied: i64,
}

/// Eligible application whose waiting period has not elapsed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingFollowUp {
    pub application_id: ApplicationId,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub applied_at: NaiveDateTime,
    pub due_at: NaiveDateTime,
    pub wait: WaitPeriod,
}

/// Result of evaluating a snapshot batch at a fixed `now`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowUpSelection {
    /// Due applications, oldest `applied_at` first.
    pub candidates: Vec<FollowUpCandidate>,
    /// Not yet due, soonest first.
    pub upcoming: Vec<UpcomingFollowUp>,
    pub issues: Vec<ValidationIssue>,
    pub evaluated: usize,
}

impl FollowUpSelection {
    pub fn rejected(&self) -> usize {
        let mut ids: Vec<ApplicationId> = self
            .issues
            .iter()
            .filter(|issue| issue.rejects_record())
            .map(ValidationIssue::application_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Stateless evaluator bound to a default waiting period.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpEvaluator {
    config: EvaluationConfig,
}

impl FollowUpEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> EvaluationConfig {
        self.config
    }

    pub fn select(
        &self,
        snapshots: &[ApplicationSnapshot],
        now: NaiveDateTime,
    ) -> FollowUpSelection {
        select_followup_candidates(snapshots, now, self.config.default_wait_days)
    }

    pub fn next_followup_time(&self, application: &Application) -> NaiveDateTime {
        next_followup_time(application, self.config.default_wait_days)
    }

    pub fn state(&self, application: &Application, now: NaiveDateTime) -> FollowUpState {
        follow_up_state(application, now, self.config.default_wait_days)
    }
}

/// Select the applications that are due for a follow-up at `now`.
///
/// Pure: reads only the provided snapshot. Invalid records are reported in
/// [`FollowUpSelection::issues`] and never abort the rest of the batch.
pub fn select_followup_candidates(
    snapshots: &[ApplicationSnapshot],
    now: NaiveDateTime,
    default_wait_days: u32,
) -> FollowUpSelection {
    let mut selection = FollowUpSelection {
        evaluated: snapshots.len(),
        ..FollowUpSelection::default()
    };

    for snapshot in snapshots {
        let application = match Application::from_snapshot(snapshot) {
            Ok(application) => application,
            Err(issues) => {
                selection.issues.extend(issues);
                continue;
            }
        };

        let resolved = resolve_wait_period(&application, default_wait_days);
        if let Some(issue) = resolved.issue {
            selection.issues.push(issue);
        }
        let wait = resolved.period;
        let due_at = wait.due_at(application.applied_at);

        match rules::check(&application, due_at, now) {
            Eligibility::Candidate => {
                let days_since_applied = (now - application.applied_at).num_days();
                selection.candidates.push(FollowUpCandidate {
                    application,
                    wait,
                    due_at,
                    days_since_applied,
                });
            }
            Eligibility::Excluded {
                reason: ExclusionReason::NotDue { due_at },
            } => selection.upcoming.push(UpcomingFollowUp {
                application_id: application.id,
                company_name: application.company_name,
                job_title: application.job_title,
                applied_at: application.applied_at,
                due_at,
                wait,
            }),
            Eligibility::Excluded { .. } => {}
        }
    }

    // Stable sorts: ties keep input order.
    selection
        .candidates
        .sort_by_key(|candidate| candidate.application.applied_at);
    selection.upcoming.sort_by_key(|upcoming| upcoming.due_at);

    selection
}

/// Earliest moment `application` becomes due: `applied_at + wait_days`.
pub fn next_followup_time(application: &Application, default_wait_days: u32) -> NaiveDateTime {
    resolve_wait_period(application, default_wait_days)
        .period
        .due_at(application.applied_at)
}

/// Resolve the waiting period applied to `application`, ignoring invalid overrides.
pub fn wait_period(application: &Application, default_wait_days: u32) -> WaitPeriod {
    resolve_wait_period(application, default_wait_days).period
}

/// Check a single application against the follow-up rules.
pub fn evaluate(
    application: &Application,
    now: NaiveDateTime,
    default_wait_days: u32,
) -> Eligibility {
    let due_at = next_followup_time(application, default_wait_days);
    rules::check(application, due_at, now)
}

/// Position of `application` in the follow-up state machine at `now`.
pub fn follow_up_state(
    application: &Application,
    now: NaiveDateTime,
    default_wait_days: u32,
) -> FollowUpState {
    let due_at = next_followup_time(application, default_wait_days);
    rules::state(application, due_at, now)
}
