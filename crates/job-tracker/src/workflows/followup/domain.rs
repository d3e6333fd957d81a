use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::evaluation::ValidationIssue;

/// Identifier wrapper for tracked applications (SQLite row id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Status tracked for every application in the job search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Ready,
    Applied,
    Responded,
    Interviewing,
    Offered,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Ready,
        ApplicationStatus::Applied,
        ApplicationStatus::Responded,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offered,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::Ready => "READY",
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Responded => "RESPONDED",
            ApplicationStatus::Interviewing => "INTERVIEWING",
            ApplicationStatus::Offered => "OFFERED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }

    /// Only applications still waiting on the employer can be followed up.
    pub const fn is_followup_eligible(self) -> bool {
        match self {
            ApplicationStatus::Applied | ApplicationStatus::Ready => true,
            ApplicationStatus::Draft
            | ApplicationStatus::Responded
            | ApplicationStatus::Interviewing
            | ApplicationStatus::Offered
            | ApplicationStatus::Rejected
            | ApplicationStatus::Withdrawn => false,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownStatus(raw.to_string()))
    }
}

/// Raw application row as read from storage, before validation.
///
/// `status` stays textual and `applied_at` optional so malformed rows can be
/// reported back to the caller instead of failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub id: ApplicationId,
    pub status: String,
    pub applied_at: Option<NaiveDateTime>,
    pub response_received: bool,
    pub followup_sent: bool,
    pub followup_override_days: Option<i64>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}

impl ApplicationSnapshot {
    /// Preconditions for storing a follow-up mark against this row.
    ///
    /// Only the flags and the status are checked; a missing `applied_at` does not block
    /// the write.
    pub fn check_followup_mark(&self) -> Result<(), TransitionError> {
        if self.response_received {
            return Err(TransitionError::ResponseReceived(self.id));
        }
        if self.followup_sent {
            return Err(TransitionError::AlreadyFollowedUp(self.id));
        }
        match self.status.parse::<ApplicationStatus>() {
            Ok(status) if status.is_followup_eligible() => Ok(()),
            _ => Err(TransitionError::IneligibleStatus {
                application_id: self.id,
                status: self.status.clone(),
            }),
        }
    }
}

/// Validated application the evaluator reasons about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    pub applied_at: NaiveDateTime,
    pub response_received: bool,
    pub followup_sent: bool,
    pub followup_override_days: Option<i64>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
}

impl Application {
    /// Validate a storage snapshot, collecting every problem that disqualifies it.
    pub fn from_snapshot(snapshot: &ApplicationSnapshot) -> Result<Self, Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        let status = match snapshot.status.parse::<ApplicationStatus>() {
            Ok(status) => Some(status),
            Err(UnknownStatus(value)) => {
                issues.push(ValidationIssue::UnknownStatus {
                    application_id: snapshot.id,
                    value,
                });
                None
            }
        };

        if snapshot.applied_at.is_none() {
            issues.push(ValidationIssue::MissingAppliedAt {
                application_id: snapshot.id,
            });
        }

        match (status, snapshot.applied_at) {
            (Some(status), Some(applied_at)) => Ok(Self {
                id: snapshot.id,
                status,
                applied_at,
                response_received: snapshot.response_received,
                followup_sent: snapshot.followup_sent,
                followup_override_days: snapshot.followup_override_days,
                company_name: snapshot.company_name.clone(),
                job_title: snapshot.job_title.clone(),
            }),
            _ => Err(issues),
        }
    }

    /// Record a confirmed follow-up dispatch. Monotonic; refused after a response and
    /// for statuses that are no longer waiting on the employer.
    pub fn record_followup_sent(&mut self) -> Result<(), TransitionError> {
        if self.response_received {
            return Err(TransitionError::ResponseReceived(self.id));
        }
        if self.followup_sent {
            return Err(TransitionError::AlreadyFollowedUp(self.id));
        }
        if !self.status.is_followup_eligible() {
            return Err(TransitionError::IneligibleStatus {
                application_id: self.id,
                status: self.status.label().to_string(),
            });
        }
        self.followup_sent = true;
        Ok(())
    }

    /// Record inbound correspondence. Idempotent.
    pub fn record_response(&mut self) {
        self.response_received = true;
    }

    pub fn company_label(&self) -> &str {
        self.company_name.as_deref().unwrap_or("Unknown")
    }

    pub fn title_label(&self) -> &str {
        self.job_title.as_deref().unwrap_or("Untitled role")
    }
}

/// Follow-up progression of a single application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpState {
    /// Status no longer waiting on the employer (rejected, interviewing, draft...).
    Ineligible,
    NotDue,
    Due,
    FollowedUp,
    Responded,
}

impl FollowUpState {
    pub const fn label(self) -> &'static str {
        match self {
            FollowUpState::Ineligible => "ineligible",
            FollowUpState::NotDue => "not_due",
            FollowUpState::Due => "due",
            FollowUpState::FollowedUp => "followed_up",
            FollowUpState::Responded => "responded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("application {0} already has a follow-up recorded")]
    AlreadyFollowedUp(ApplicationId),
    #[error("application {0} already received a response")]
    ResponseReceived(ApplicationId),
    #[error("application {application_id} has status '{status}' and cannot be followed up")]
    IneligibleStatus {
        application_id: ApplicationId,
        status: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(status: &str, applied_at: Option<NaiveDateTime>) -> ApplicationSnapshot {
        ApplicationSnapshot {
            id: ApplicationId(42),
            status: status.to_string(),
            applied_at,
            response_received: false,
            followup_sent: false,
            followup_override_days: None,
            company_name: Some("Humana".to_string()),
            job_title: Some("Data Analyst".to_string()),
        }
    }

    fn applied_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 1)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(
            "applied".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::Applied)
        );
        assert_eq!(
            " Ready ".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::Ready)
        );
        assert!("ghosted".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn only_waiting_statuses_are_eligible() {
        let eligible: Vec<_> = ApplicationStatus::ALL
            .into_iter()
            .filter(|status| status.is_followup_eligible())
            .collect();
        assert_eq!(
            eligible,
            vec![ApplicationStatus::Ready, ApplicationStatus::Applied]
        );
    }

    #[test]
    fn from_snapshot_reports_every_problem() {
        let issues = Application::from_snapshot(&snapshot("ghosted", None))
            .expect_err("invalid snapshot rejected");
        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|issue| issue.application_id() == ApplicationId(42)));
    }

    #[test]
    fn followup_is_refused_after_response() {
        let mut application =
            Application::from_snapshot(&snapshot("APPLIED", Some(applied_at())))
                .expect("valid snapshot");
        application.record_response();

        assert_eq!(
            application.record_followup_sent(),
            Err(TransitionError::ResponseReceived(ApplicationId(42)))
        );
        assert!(!application.followup_sent);
    }

    #[test]
    fn followup_is_recorded_once() {
        let mut application =
            Application::from_snapshot(&snapshot("READY", Some(applied_at())))
                .expect("valid snapshot");

        application.record_followup_sent().expect("first follow-up");
        assert!(application.followup_sent);
        assert_eq!(
            application.record_followup_sent(),
            Err(TransitionError::AlreadyFollowedUp(ApplicationId(42)))
        );
    }

    #[test]
    fn followup_is_refused_for_closed_statuses() {
        let mut application =
            Application::from_snapshot(&snapshot("REJECTED", Some(applied_at())))
                .expect("valid snapshot");

        assert_eq!(
            application.record_followup_sent(),
            Err(TransitionError::IneligibleStatus {
                application_id: ApplicationId(42),
                status: "REJECTED".to_string(),
            })
        );
        assert!(!application.followup_sent);
    }

    #[test]
    fn snapshot_mark_check_ignores_missing_dates() {
        assert_eq!(snapshot("APPLIED", None).check_followup_mark(), Ok(()));

        let mut responded = snapshot("APPLIED", None);
        responded.response_received = true;
        assert_eq!(
            responded.check_followup_mark(),
            Err(TransitionError::ResponseReceived(ApplicationId(42)))
        );

        assert!(matches!(
            snapshot("ghosted", Some(applied_at())).check_followup_mark(),
            Err(TransitionError::IneligibleStatus { .. })
        ));
    }
}
