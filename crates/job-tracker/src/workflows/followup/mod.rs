//! Follow-up eligibility for tracked job applications.
//!
//! The evaluator is pure: callers hand it a storage snapshot and an explicit `now`.
//! Writes to `followup_sent` and `response_received` go through
//! [`FollowUpRepository`], which serializes them against the backing store.

pub mod dispatch;
pub mod domain;
pub mod evaluation;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use dispatch::{DispatchError, FollowUpDispatcher, FollowUpMessage, LoggingDispatcher};
pub use domain::{
    Application, ApplicationId, ApplicationSnapshot, ApplicationStatus, FollowUpState,
    TransitionError, UnknownStatus,
};
pub use evaluation::{
    evaluate, follow_up_state, next_followup_time, select_followup_candidates, wait_period,
    Eligibility, EvaluationConfig, ExclusionReason, FollowUpCandidate, FollowUpEvaluator,
    FollowUpSelection, UpcomingFollowUp, ValidationIssue, WaitPeriod, WaitSource,
    DEFAULT_WAIT_DAYS,
};
pub use repository::{FollowUpRepository, RepositoryError};
pub use router::followup_router;
pub use service::{
    DispatchOutcome, DispatchReport, DispatchSettings, DispatchStatus, FollowUpService,
    FollowUpServiceError, FollowUpStatusView, FollowUpUpdate,
};
