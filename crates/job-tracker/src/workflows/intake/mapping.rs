use crate::store::{JobStatus, Priority, RemoteType};

/// Parses the tracker's salary shorthand into annual bounds.
///
/// `$75-95k` is a range in thousands; `$25/hr (~$36k/yr)` uses the annual estimate;
/// descriptive `Director (est 150-190)` strings take the first two numbers as thousands.
pub(crate) fn parse_salary_range(raw: &str) -> (Option<i64>, Option<i64>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() || matches!(trimmed.to_ascii_uppercase().as_str(), "TBD" | "N/A") {
        return (None, None);
    }

    let cleaned = trimmed.replace(['$', ','], "");

    if cleaned.contains("/hr") {
        if let Some((_, annual)) = cleaned.split_once('~') {
            let annual = annual.replace("/yr", "").replace(')', "");
            if let Some(amount) = thousands(&annual) {
                return (Some(amount), Some(amount));
            }
        }
    }

    if cleaned.contains('-') && cleaned.contains('k') {
        let stripped = cleaned.replace('k', "");
        if let Some((low, high)) = stripped.split_once('-') {
            if let (Some(low), Some(high)) = (scaled(low), scaled(high)) {
                return (Some(low), Some(high));
            }
        }
    }

    if cleaned.contains("Director") || cleaned.contains("est") {
        let numbers: Vec<i64> = cleaned
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .filter_map(|part| part.parse().ok())
            .collect();
        if let [low, high, ..] = numbers.as_slice() {
            return (Some(low * 1000), Some(high * 1000));
        }
    }

    (None, None)
}

fn thousands(value: &str) -> Option<i64> {
    let value = value.trim();
    value.strip_suffix('k').and_then(scaled)
}

fn scaled(value: &str) -> Option<i64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .map(|amount| (amount * 1000.0).round() as i64)
}

pub(crate) fn map_priority(raw: &str) -> Priority {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HIGH" => Priority::High,
        "LOW" => Priority::Low,
        "SKIP" => Priority::Skip,
        _ => Priority::Medium,
    }
}

pub(crate) fn map_job_status(raw: &str) -> JobStatus {
    match raw.trim() {
        "Applied" => JobStatus::Applied,
        "CLOSED/FILLED" | "N/A" => JobStatus::Closed,
        _ => JobStatus::New,
    }
}

pub(crate) fn map_remote_type(job_type: &str, employment_type: &str) -> RemoteType {
    let combined = format!("{job_type} {employment_type}").to_ascii_lowercase();
    if combined.contains("remote") {
        RemoteType::Remote
    } else if combined.contains("hybrid") {
        RemoteType::Hybrid
    } else {
        RemoteType::Onsite
    }
}

pub(crate) fn parse_skills_match(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return None;
    }
    trimmed.replace('%', "").trim().parse().ok()
}
