use chrono::NaiveDateTime;

use super::dispatch::FollowUpMessage;
use super::domain::{ApplicationId, ApplicationSnapshot, TransitionError};

/// Storage abstraction so the follow-up service can be exercised in isolation.
///
/// Implementations serialize the two writes: `mark_followup_sent` must only succeed
/// for an eligible application that has neither a follow-up nor a response recorded
/// (see [`ApplicationSnapshot::check_followup_mark`]). A delivered `message` is stored
/// together with the mark.
pub trait FollowUpRepository: Send + Sync {
    fn snapshot(&self) -> Result<Vec<ApplicationSnapshot>, RepositoryError>;
    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationSnapshot>, RepositoryError>;
    fn mark_followup_sent(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
        message: Option<&FollowUpMessage>,
    ) -> Result<(), RepositoryError>;
    fn record_response(&self, id: ApplicationId, at: NaiveDateTime)
        -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application {0} already has a follow-up recorded")]
    AlreadyFollowedUp(ApplicationId),
    #[error("application {0} already received a response")]
    ResponseReceived(ApplicationId),
    #[error("application {application_id} has status '{status}' and cannot be followed up")]
    IneligibleStatus {
        application_id: ApplicationId,
        status: String,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RepositoryError::AlreadyFollowedUp(_)
                | RepositoryError::ResponseReceived(_)
                | RepositoryError::IneligibleStatus { .. }
        )
    }
}

impl From<TransitionError> for RepositoryError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::AlreadyFollowedUp(id) => RepositoryError::AlreadyFollowedUp(id),
            TransitionError::ResponseReceived(id) => RepositoryError::ResponseReceived(id),
            TransitionError::IneligibleStatus {
                application_id,
                status,
            } => RepositoryError::IneligibleStatus {
                application_id,
                status,
            },
        }
    }
}
