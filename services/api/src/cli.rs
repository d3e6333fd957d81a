use crate::commands::{
    run_add_application, run_company_override, run_dispatch, run_import, run_mark_sent,
    run_next_followup, run_record_response, run_review, run_set_status, run_summary,
    AddApplicationArgs, CompanyOverrideArgs, ImportArgs, MomentArgs, ReviewArgs, SetStatusArgs,
    TargetArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Job Tracker",
    about = "Track job applications and decide which ones are due for a follow-up",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Review and send follow-ups for applications awaiting a response
    Followups {
        #[command(subcommand)]
        command: FollowUpCommand,
    },
    /// Record and update tracked applications
    Applications {
        #[command(subcommand)]
        command: ApplicationCommand,
    },
    /// Manage per-company settings
    Companies {
        #[command(subcommand)]
        command: CompanyCommand,
    },
    /// Import a job tracker CSV export into the database
    Import(ImportArgs),
}

#[derive(Subcommand, Debug)]
enum FollowUpCommand {
    /// List applications due for a follow-up and those coming due
    Review(ReviewArgs),
    /// Send follow-ups for due applications (dry run unless LIVE_SEND_MODE is set)
    Dispatch(MomentArgs),
    /// Show when an application becomes due for a follow-up
    Next(TargetArgs),
    /// Record that a follow-up was sent outside the dispatcher
    MarkSent(TargetArgs),
}

#[derive(Subcommand, Debug)]
enum ApplicationCommand {
    /// Add a job lead with its application record
    Add(AddApplicationArgs),
    /// Record that the employer responded
    Respond(TargetArgs),
    /// Change an application's status
    Status(SetStatusArgs),
    /// Count applications and jobs by status
    Summary,
}

#[derive(Subcommand, Debug)]
enum CompanyCommand {
    /// Set or clear a company's follow-up wait in days
    Override(CompanyOverrideArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Followups { command } => match command {
            FollowUpCommand::Review(args) => run_review(args),
            FollowUpCommand::Dispatch(args) => run_dispatch(args),
            FollowUpCommand::Next(args) => run_next_followup(args),
            FollowUpCommand::MarkSent(args) => run_mark_sent(args),
        },
        Command::Applications { command } => match command {
            ApplicationCommand::Add(args) => run_add_application(args),
            ApplicationCommand::Respond(args) => run_record_response(args),
            ApplicationCommand::Status(args) => run_set_status(args),
            ApplicationCommand::Summary => run_summary(),
        },
        Command::Companies {
            command: CompanyCommand::Override(args),
        } => run_company_override(args),
        Command::Import(args) => run_import(args),
    }
}
