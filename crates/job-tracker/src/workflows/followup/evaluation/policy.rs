use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::super::domain::Application;
use super::ValidationIssue;

/// Where the waiting period applied to an application came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitSource {
    Default,
    CompanyOverride,
}

/// Waiting period between applying and the first follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPeriod {
    pub days: u32,
    pub source: WaitSource,
}

impl WaitPeriod {
    pub fn duration(&self) -> Duration {
        Duration::days(i64::from(self.days))
    }

    /// Moment the application becomes due, saturating at the calendar limit.
    pub fn due_at(&self, applied_at: NaiveDateTime) -> NaiveDateTime {
        applied_at
            .checked_add_signed(self.duration())
            .unwrap_or(NaiveDateTime::MAX)
    }
}

pub(crate) struct ResolvedWait {
    pub(crate) period: WaitPeriod,
    pub(crate) issue: Option<ValidationIssue>,
}

/// A positive company override always replaces the default, larger or smaller.
/// Non-positive overrides are reported and the default applies to that record only.
pub(crate) fn resolve_wait_period(
    application: &Application,
    default_wait_days: u32,
) -> ResolvedWait {
    let default = WaitPeriod {
        days: default_wait_days,
        source: WaitSource::Default,
    };

    match application.followup_override_days {
        None => ResolvedWait {
            period: default,
            issue: None,
        },
        Some(days) => match u32::try_from(days) {
            Ok(days) if days > 0 => ResolvedWait {
                period: WaitPeriod {
                    days,
                    source: WaitSource::CompanyOverride,
                },
                issue: None,
            },
            _ => ResolvedWait {
                period: default,
                issue: Some(ValidationIssue::InvalidOverride {
                    application_id: application.id,
                    days,
                }),
            },
        },
    }
}
