use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::super::domain::{Application, ApplicationStatus, FollowUpState};

/// Outcome of checking one application against the follow-up rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Eligibility {
    Candidate,
    Excluded { reason: ExclusionReason },
}

impl Eligibility {
    pub fn is_candidate(&self) -> bool {
        matches!(self, Eligibility::Candidate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    IneligibleStatus { status: ApplicationStatus },
    ResponseReceived,
    AlreadyFollowedUp,
    NotDue { due_at: NaiveDateTime },
}

impl ExclusionReason {
    pub fn summary(&self) -> String {
        match self {
            ExclusionReason::IneligibleStatus { status } => {
                format!("status {status} is not eligible for follow-up")
            }
            ExclusionReason::ResponseReceived => "response already received".to_string(),
            ExclusionReason::AlreadyFollowedUp => "follow-up already sent".to_string(),
            ExclusionReason::NotDue { due_at } => {
                format!("not due until {}", due_at.format("%Y-%m-%d %H:%M"))
            }
        }
    }
}

pub(crate) fn check(
    application: &Application,
    due_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Eligibility {
    let reason = if !application.status.is_followup_eligible() {
        ExclusionReason::IneligibleStatus {
            status: application.status,
        }
    } else if application.response_received {
        ExclusionReason::ResponseReceived
    } else if application.followup_sent {
        ExclusionReason::AlreadyFollowedUp
    } else if now < due_at {
        ExclusionReason::NotDue { due_at }
    } else {
        return Eligibility::Candidate;
    };

    Eligibility::Excluded { reason }
}

pub(crate) fn state(
    application: &Application,
    due_at: NaiveDateTime,
    now: NaiveDateTime,
) -> FollowUpState {
    if application.response_received {
        FollowUpState::Responded
    } else if application.followup_sent {
        FollowUpState::FollowedUp
    } else if !application.status.is_followup_eligible() {
        FollowUpState::Ineligible
    } else if now >= due_at {
        FollowUpState::Due
    } else {
        FollowUpState::NotDue
    }
}
