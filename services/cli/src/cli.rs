use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use loan_desk::config::AppConfig;
use loan_desk::dashboard::StatusFilter;
use loan_desk::error::AppError;
use loan_desk::telemetry;
use tracing::debug;

use crate::commands::{self, Context};

#[derive(Parser, Debug)]
#[command(
    name = "loan-desk",
    about = "Review, approve, and disburse loan applications from the command line",
    version
)]
struct Cli {
    /// Override the loan service base URL (LOAN_DESK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Override the file holding the signed-in user (LOAN_DESK_SESSION_FILE)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print status counts, purpose totals, and the trend series (default command)
    Summary,
    /// List applications matching the search text and status filter
    List(QueryArgs),
    /// Approve a pending application
    Approve(TargetArgs),
    /// Reject a pending application
    Reject(TargetArgs),
    /// Disburse an approved loan for its recorded amount
    Disburse(TargetArgs),
    /// Submit a new loan application as the signed-in user
    Apply(ApplyArgs),
    /// Write the filtered application list as CSV
    Export(ExportArgs),
    /// Forget the signed-in user
    Logout,
}

#[derive(Args, Debug, Default)]
pub(crate) struct QueryArgs {
    /// Case-insensitive match against applicant name or purpose
    #[arg(long, default_value = "")]
    pub(crate) search: String,
    /// ALL, PENDING, APPROVED, or REJECTED
    #[arg(long, default_value_t = StatusFilter::All)]
    pub(crate) status: StatusFilter,
}

#[derive(Args, Debug)]
pub(crate) struct TargetArgs {
    /// Application identifier as reported by `list`
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) profession: String,
    #[arg(long)]
    pub(crate) purpose: String,
    #[arg(long)]
    pub(crate) amount: f64,
    #[arg(long)]
    pub(crate) credit_score: i64,
    /// Provident fund statement to attach
    #[arg(long)]
    pub(crate) pf_account_pdf: Option<PathBuf>,
    /// Latest salary slip to attach
    #[arg(long)]
    pub(crate) salary_slip: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) query: QueryArgs,
    /// Destination CSV file
    #[arg(long)]
    pub(crate) output: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;

    if let Some(api_url) = cli.api_url.as_deref() {
        config.backend.set_base_url(api_url)?;
    }
    if let Some(session_file) = cli.session_file {
        config.session.file = session_file;
    }

    telemetry::init(&config.telemetry)?;
    debug!(environment = ?config.environment, api = %config.backend.base_url, "configuration loaded");

    let context = Context::new(config);
    match cli.command.unwrap_or(Command::Summary) {
        Command::Summary => commands::summary(&context).await,
        Command::List(args) => commands::list(&context, args).await,
        Command::Approve(args) => commands::approve(&context, args).await,
        Command::Reject(args) => commands::reject(&context, args).await,
        Command::Disburse(args) => commands::disburse(&context, args).await,
        Command::Apply(args) => commands::apply(&context, args).await,
        Command::Export(args) => commands::export(&context, args).await,
        Command::Logout => commands::logout(&context),
    }
}
