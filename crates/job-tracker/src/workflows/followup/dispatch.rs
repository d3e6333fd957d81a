use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::ApplicationId;
use super::evaluation::FollowUpCandidate;

/// Outbound follow-up ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpMessage {
    pub application_id: ApplicationId,
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
}

impl FollowUpMessage {
    pub fn compose(
        candidate: &FollowUpCandidate,
        recipient: Option<&str>,
        sender_name: &str,
    ) -> Self {
        let application = &candidate.application;
        let title = application.title_label();
        let company = application
            .company_name
            .as_deref()
            .unwrap_or("your company");
        let applied_on = application.applied_at.format("%B %d, %Y");

        let body = format!(
            "Hi there,\n\n\
             I wanted to follow up on my application for the {title} position at {company} \
             that I submitted on {applied_on}.\n\n\
             I remain very interested in this opportunity and would appreciate any update on \
             the status of my application.\n\n\
             Thank you for your time and consideration.\n\n\
             Best regards,\n\
             {sender_name}\n"
        );

        Self {
            application_id: application.id,
            recipient: recipient.map(str::to_string),
            subject: format!("Following up on {title} application"),
            body,
        }
    }
}

/// Outbound transport hook (e-mail adapters live outside this crate).
pub trait FollowUpDispatcher: Send + Sync {
    fn send(&self, message: &FollowUpMessage) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("follow-up has no recipient")]
    MissingRecipient,
    #[error("dispatch transport unavailable: {0}")]
    Transport(String),
}

/// Dispatcher that only writes the message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

impl FollowUpDispatcher for LoggingDispatcher {
    fn send(&self, message: &FollowUpMessage) -> Result<(), DispatchError> {
        let recipient = message
            .recipient
            .as_deref()
            .ok_or(DispatchError::MissingRecipient)?;
        info!(
            application_id = message.application_id.0,
            %recipient,
            subject = %message.subject,
            "follow-up delivered to log transport"
        );
        Ok(())
    }
}
