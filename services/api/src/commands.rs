use crate::infra::{build_followup_service, open_store, parse_status, resolve_moment};
use chrono::NaiveDateTime;
use clap::{ArgGroup, Args};
use job_tracker::config::AppConfig;
use job_tracker::error::AppError;
use job_tracker::store::{SqliteStore, StatusSummary};
use job_tracker::telemetry;
use job_tracker::timestamps::parse_timestamp;
use job_tracker::workflows::followup::{
    ApplicationId, ApplicationStatus, DispatchReport, DispatchStatus, FollowUpSelection,
    FollowUpStatusView, FollowUpUpdate, WaitPeriod, WaitSource,
};
use job_tracker::workflows::intake::{add_lead, JobLeadImporter, NewLead};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct MomentArgs {
    /// Evaluate as of this time instead of now (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    #[command(flatten)]
    pub(crate) moment: MomentArgs,
    /// Print the selection as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TargetArgs {
    /// Application id
    pub(crate) id: i64,
    /// When the event happened (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) at: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub(crate) struct SetStatusArgs {
    /// Application id
    pub(crate) id: i64,
    /// New status, e.g. APPLIED, INTERVIEWING or REJECTED
    #[arg(value_parser = parse_status)]
    pub(crate) status: ApplicationStatus,
    /// Applied date stamped when moving to APPLIED (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) at: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub(crate) struct AddApplicationArgs {
    #[arg(long)]
    pub(crate) company: String,
    #[arg(long)]
    pub(crate) title: String,
    #[arg(long)]
    pub(crate) url: Option<String>,
    #[arg(long)]
    pub(crate) location: Option<String>,
    /// Date the application was submitted
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) applied_at: Option<NaiveDateTime>,
    /// Initial status (defaults to APPLIED with --applied-at, DRAFT otherwise)
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Option<ApplicationStatus>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("change").required(true).args(["days", "clear"])))]
pub(crate) struct CompanyOverrideArgs {
    /// Company name as stored in the tracker
    pub(crate) name: String,
    /// Days to wait before following up with this company
    #[arg(long)]
    pub(crate) days: Option<i64>,
    /// Remove the override and use the default wait again
    #[arg(long)]
    pub(crate) clear: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Path to the job tracker CSV export
    pub(crate) path: PathBuf,
}

fn bootstrap() -> Result<(AppConfig, SqliteStore), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let store = open_store(&config)?;
    Ok((config, store))
}

pub(crate) fn run_review(args: ReviewArgs) -> Result<(), AppError> {
    let (config, store) = bootstrap()?;
    let service = build_followup_service(&config, store);
    let now = resolve_moment(args.moment.now);
    let selection = service.review(now)?;

    if args.json {
        print_json(&selection)?;
    } else {
        render_selection(&selection, now);
    }
    Ok(())
}

pub(crate) fn run_dispatch(args: MomentArgs) -> Result<(), AppError> {
    let (config, store) = bootstrap()?;
    let service = build_followup_service(&config, store);
    let report = service.dispatch(resolve_moment(args.now))?;
    render_dispatch(&report);
    Ok(())
}

pub(crate) fn run_next_followup(args: TargetArgs) -> Result<(), AppError> {
    let (config, store) = bootstrap()?;
    let service = build_followup_service(&config, store);
    let view = service.status(ApplicationId(args.id), resolve_moment(args.at))?;
    render_status(&view);
    Ok(())
}

pub(crate) fn run_mark_sent(args: TargetArgs) -> Result<(), AppError> {
    let (config, store) = bootstrap()?;
    let service = build_followup_service(&config, store);
    let update = service.mark_sent(ApplicationId(args.id), resolve_moment(args.at))?;
    render_update("Follow-up recorded", &update);
    Ok(())
}

pub(crate) fn run_record_response(args: TargetArgs) -> Result<(), AppError> {
    let (config, store) = bootstrap()?;
    let service = build_followup_service(&config, store);
    let update = service.record_response(ApplicationId(args.id), resolve_moment(args.at))?;
    render_update("Response recorded", &update);
    Ok(())
}

pub(crate) fn run_set_status(args: SetStatusArgs) -> Result<(), AppError> {
    let (_, store) = bootstrap()?;
    store.update_status(ApplicationId(args.id), args.status, resolve_moment(args.at))?;
    println!("Application #{} is now {}", args.id, args.status);
    Ok(())
}

pub(crate) fn run_add_application(args: AddApplicationArgs) -> Result<(), AppError> {
    let (_, store) = bootstrap()?;
    let receipt = add_lead(
        &store,
        &NewLead {
            company: args.company,
            title: args.title,
            url: args.url,
            location: args.location,
            applied_at: args.applied_at,
            status: args.status,
        },
    )?;
    println!(
        "Recorded application #{} (job #{}, company #{})",
        receipt.application_id, receipt.job_id, receipt.company_id
    );
    Ok(())
}

pub(crate) fn run_summary() -> Result<(), AppError> {
    let (_, store) = bootstrap()?;
    render_summary(&store.status_summary()?);
    Ok(())
}

pub(crate) fn run_company_override(args: CompanyOverrideArgs) -> Result<(), AppError> {
    let (_, store) = bootstrap()?;
    let days = if args.clear { None } else { args.days };
    store.set_company_override(&args.name, days)?;
    match days {
        Some(days) => println!("{}: follow up after {} days", args.name, days),
        None => println!("{}: using the default follow-up wait", args.name),
    }
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let (_, store) = bootstrap()?;
    let summary = JobLeadImporter::from_path(&args.path, &store)?;
    println!("Imported {} jobs from {}", summary.imported, args.path.display());
    println!("  Applications created: {}", summary.applications);
    println!("  Rows skipped: {}", summary.errors);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

fn wait_label(wait: &WaitPeriod) -> String {
    match wait.source {
        WaitSource::Default => format!("{}d default", wait.days),
        WaitSource::CompanyOverride => format!("{}d company override", wait.days),
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

fn render_selection(selection: &FollowUpSelection, now: NaiveDateTime) {
    println!("Follow-up review as of {}", now.format("%Y-%m-%d %H:%M"));
    println!("Evaluated applications: {}", selection.evaluated);

    if selection.candidates.is_empty() {
        println!("\nDue for follow-up: none");
    } else {
        println!("\nDue for follow-up ({})", selection.candidates.len());
        for candidate in &selection.candidates {
            let application = &candidate.application;
            println!(
                "  #{} {} - {} | applied {} ({} days ago) | wait {}",
                application.id.0,
                application.company_label(),
                application.title_label(),
                application.applied_at.format("%Y-%m-%d"),
                candidate.days_since_applied,
                wait_label(&candidate.wait)
            );
        }
    }

    if !selection.upcoming.is_empty() {
        println!("\nComing due ({})", selection.upcoming.len());
        for upcoming in &selection.upcoming {
            println!(
                "  #{} {} - {} | due {} | wait {}",
                upcoming.application_id.0,
                or_unknown(&upcoming.company_name),
                or_unknown(&upcoming.job_title),
                upcoming.due_at.format("%Y-%m-%d %H:%M"),
                wait_label(&upcoming.wait)
            );
        }
    }

    if !selection.issues.is_empty() {
        println!("\nRecords needing attention ({})", selection.issues.len());
        for issue in &selection.issues {
            println!("  {}", issue);
        }
    }
}

fn render_dispatch(report: &DispatchReport) {
    let mode = if report.dry_run { "dry run" } else { "live" };
    println!(
        "Follow-up dispatch ({mode}) as of {}",
        report.evaluated_at.format("%Y-%m-%d %H:%M")
    );
    println!(
        "Candidates: {} | processed: {} | deferred: {}",
        report.candidates,
        report.outcomes.len(),
        report.deferred
    );

    for outcome in &report.outcomes {
        let status = match outcome.status {
            DispatchStatus::Sent => "sent",
            DispatchStatus::DryRun => "would send",
            DispatchStatus::Conflict => "already recorded",
            DispatchStatus::Failed => "failed",
        };
        let detail = outcome
            .detail
            .as_deref()
            .map(|detail| format!(" ({detail})"))
            .unwrap_or_default();
        println!(
            "  #{} {} - {} | {} days | {}{}",
            outcome.application_id.0,
            or_unknown(&outcome.company_name),
            or_unknown(&outcome.job_title),
            outcome.days_since_applied,
            status,
            detail
        );
    }

    if !report.issues.is_empty() {
        println!("Records needing attention: {}", report.issues.len());
    }
}

fn render_status(view: &FollowUpStatusView) {
    println!(
        "Application #{} {} - {}",
        view.application_id.0,
        or_unknown(&view.company_name),
        or_unknown(&view.job_title)
    );
    println!("  Status: {}", view.status);
    println!("  Follow-up state: {}", view.state.label());
    println!("  Applied: {}", view.applied_at.format("%Y-%m-%d %H:%M"));
    println!(
        "  Next follow-up: {} (wait {})",
        view.next_followup_at.format("%Y-%m-%d %H:%M"),
        wait_label(&view.wait)
    );
}

fn render_update(action: &str, update: &FollowUpUpdate) {
    println!(
        "{action} for application #{} at {}",
        update.application_id.0,
        update.recorded_at.format("%Y-%m-%d %H:%M")
    );
    match &update.view {
        Some(view) => render_status(view),
        None => {
            println!("  Follow-up timing unavailable:");
            for issue in &update.issues {
                println!("    {issue}");
            }
        }
    }
}

fn render_summary(summary: &StatusSummary) {
    println!("Applications: {}", summary.total_applications());
    for (status, count) in &summary.applications {
        println!("  {status}: {count}");
    }
    println!("Jobs: {}", summary.total_jobs());
    for (status, count) in &summary.jobs {
        println!("  {status}: {count}");
    }
}
