use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::workflows::followup::ApplicationStatus;

/// Pipeline state of a job lead, independent of any application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Applied,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Applied => "applied",
            JobStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
    Skip,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
            Priority::Skip => "SKIP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteType {
    Remote,
    Hybrid,
    Onsite,
}

impl RemoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteType::Remote => "remote",
            RemoteType::Hybrid => "hybrid",
            RemoteType::Onsite => "onsite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub company_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub location: Option<String>,
    pub remote_type: RemoteType,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub job_type: Option<String>,
    pub employment_type: Option<String>,
    pub status: JobStatus,
    pub priority: Priority,
    pub skills_match: Option<i64>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl NewJob {
    pub fn new(company_id: i64, title: impl Into<String>) -> Self {
        Self {
            company_id,
            title: title.into(),
            url: None,
            location: None,
            remote_type: RemoteType::Onsite,
            salary_min: None,
            salary_max: None,
            job_type: None,
            employment_type: None,
            status: JobStatus::New,
            priority: Priority::Medium,
            skills_match: None,
            source: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub job_id: i64,
    pub status: ApplicationStatus,
    pub applied_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

/// Follow-up message stored with a confirmed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentFollowUp {
    pub id: i64,
    pub application_id: i64,
    pub channel: String,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub sent_at: Option<NaiveDateTime>,
}

/// Row counts grouped by stored status text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub applications: BTreeMap<String, i64>,
    pub jobs: BTreeMap<String, i64>,
}

impl StatusSummary {
    pub fn total_applications(&self) -> i64 {
        self.applications.values().sum()
    }

    pub fn total_jobs(&self) -> i64 {
        self.jobs.values().sum()
    }
}
