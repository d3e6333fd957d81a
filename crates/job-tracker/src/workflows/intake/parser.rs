use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One row of the job tracker spreadsheet export.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LeadRow {
    #[serde(rename = "Job Title", default, deserialize_with = "empty_string_as_none")]
    pub(crate) title: Option<String>,
    #[serde(rename = "Company", default, deserialize_with = "empty_string_as_none")]
    pub(crate) company: Option<String>,
    #[serde(rename = "Industry", default, deserialize_with = "empty_string_as_none")]
    pub(crate) industry: Option<String>,
    #[serde(rename = "Salary Range", default)]
    pub(crate) salary_range: String,
    #[serde(rename = "Job Type", default)]
    pub(crate) job_type: String,
    #[serde(rename = "Employment Type", default)]
    pub(crate) employment_type: String,
    #[serde(rename = "Application Status", default)]
    pub(crate) application_status: String,
    #[serde(
        rename = "Application Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) application_date: Option<String>,
    #[serde(rename = "Job URL", default, deserialize_with = "empty_string_as_none")]
    pub(crate) url: Option<String>,
    #[serde(rename = "Priority", default)]
    pub(crate) priority: String,
    #[serde(rename = "Skills Match %", default)]
    pub(crate) skills_match: String,
    #[serde(rename = "Source", default, deserialize_with = "empty_string_as_none")]
    pub(crate) source: Option<String>,
    #[serde(
        rename = "Notes/Key Requirements",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) notes: Option<String>,
}

/// Yields each row independently so one malformed line does not abort the batch.
pub(crate) fn read_rows<R: Read>(
    reader: R,
) -> Result<Vec<Result<LeadRow, csv::Error>>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    csv_reader.headers()?;

    Ok(csv_reader.deserialize::<LeadRow>().collect())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
