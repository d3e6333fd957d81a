//! Lead intake: spreadsheet imports and manually entered leads.

mod lead;
mod mapping;
mod parser;

pub use lead::{add_lead, LeadReceipt, NewLead};

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{NewApplication, NewJob, SqliteStore, StoreError};
use crate::timestamps::parse_timestamp;
use crate::workflows::followup::ApplicationStatus;

use parser::LeadRow;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read job tracker export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid job tracker CSV: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Counts reported after an import; `errors` rows were skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub applications: usize,
    pub errors: usize,
}

pub struct JobLeadImporter;

impl JobLeadImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        store: &SqliteStore,
    ) -> Result<ImportSummary, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, store)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        store: &SqliteStore,
    ) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();

        for (index, row) in parser::read_rows(reader)?.into_iter().enumerate() {
            let line = index + 2;
            let outcome = match row {
                Ok(row) => import_row(&row, store).map_err(|err| err.to_string()),
                Err(err) => Err(err.to_string()),
            };

            match outcome {
                Ok(with_application) => {
                    summary.imported += 1;
                    if with_application {
                        summary.applications += 1;
                    }
                }
                Err(reason) => {
                    warn!(line, %reason, "skipping job tracker row");
                    summary.errors += 1;
                }
            }
        }

        info!(
            imported = summary.imported,
            applications = summary.applications,
            errors = summary.errors,
            "job tracker import finished"
        );
        Ok(summary)
    }
}

/// Returns whether an application row was created alongside the job.
fn import_row(row: &LeadRow, store: &SqliteStore) -> Result<bool, StoreError> {
    let company = row.company.as_deref().unwrap_or("Unknown Company");
    let title = row.title.as_deref().unwrap_or("Untitled");

    let company_id = store.upsert_company(company, row.industry.as_deref())?;
    let (salary_min, salary_max) = mapping::parse_salary_range(&row.salary_range);

    let mut job = NewJob::new(company_id, title);
    job.url = row.url.clone();
    job.location = Some(row.job_type.clone()).filter(|value| !value.is_empty());
    job.remote_type = mapping::map_remote_type(&row.job_type, &row.employment_type);
    job.salary_min = salary_min;
    job.salary_max = salary_max;
    job.job_type = Some(row.job_type.clone()).filter(|value| !value.is_empty());
    job.employment_type = Some(row.employment_type.clone()).filter(|value| !value.is_empty());
    job.status = mapping::map_job_status(&row.application_status);
    job.priority = mapping::map_priority(&row.priority);
    job.skills_match = mapping::parse_skills_match(&row.skills_match);
    job.source = Some(row.source.clone().unwrap_or_else(|| "CSV Import".to_string()));
    job.notes = row.notes.clone();
    let job_id = store.insert_job(&job)?;

    if row.application_status.trim() != "Applied" {
        return Ok(false);
    }

    let applied_at = match row.application_date.as_deref().map(parse_timestamp) {
        Some(Ok(applied_at)) => applied_at,
        Some(Err(reason)) => {
            warn!(title, company, %reason, "applied row has an unreadable date");
            return Ok(false);
        }
        None => return Ok(false),
    };

    store.insert_application(&NewApplication {
        job_id,
        status: ApplicationStatus::Applied,
        applied_at: Some(applied_at),
        notes: None,
    })?;
    Ok(true)
}
