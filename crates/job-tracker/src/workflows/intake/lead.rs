use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{JobStatus, NewApplication, NewJob, SqliteStore, StoreError};
use crate::workflows::followup::ApplicationStatus;

/// A single job lead entered by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub company: String,
    pub title: String,
    pub url: Option<String>,
    pub location: Option<String>,
    pub applied_at: Option<NaiveDateTime>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadReceipt {
    pub company_id: i64,
    pub job_id: i64,
    pub application_id: i64,
}

/// Records the lead's company, job, and application in one call.
///
/// The application status defaults to `APPLIED` when an applied date is given and
/// `DRAFT` otherwise.
pub fn add_lead(store: &SqliteStore, lead: &NewLead) -> Result<LeadReceipt, StoreError> {
    let title = lead.title.trim();
    if title.is_empty() {
        return Err(StoreError::Invalid("job title is empty".to_string()));
    }

    let status = lead.status.unwrap_or(if lead.applied_at.is_some() {
        ApplicationStatus::Applied
    } else {
        ApplicationStatus::Draft
    });

    let company_id = store.upsert_company(&lead.company, None)?;
    let mut job = NewJob::new(company_id, title);
    job.url = lead.url.clone();
    job.location = lead.location.clone();
    job.source = Some("Manual".to_string());
    if lead.applied_at.is_some() || status == ApplicationStatus::Applied {
        job.status = JobStatus::Applied;
    }
    let job_id = store.insert_job(&job)?;

    let application_id = store.insert_application(&NewApplication {
        job_id,
        status,
        applied_at: lead.applied_at,
        notes: None,
    })?;

    info!(
        company = %lead.company.trim(),
        title,
        application_id,
        status = %status,
        "lead recorded"
    );

    Ok(LeadReceipt {
        company_id,
        job_id,
        application_id,
    })
}
