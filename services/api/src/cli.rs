use crate::commands::{
    run_export, run_questions, run_results, ExportArgs, QuestionsArgs, ResultsArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hireflow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "hireflow",
    about = "Review screened candidates, track hiring pipelines, and export shortlists",
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
    /// Load screening results and print the ranked, filtered candidate list
    Results(ResultsArgs),
    /// Write the filtered candidate list to a CSV file
    Export(ExportArgs),
    /// Print generated interview questions for a job
    Questions(QuestionsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) backend: BackendArgs,
}

/// Overrides for the scoring backend connection.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct BackendArgs {
    /// Override APP_BACKEND_URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
    /// Override APP_API_TOKEN
    #[arg(long)]
    pub(crate) token: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Results(args) => run_results(args).await,
        Command::Export(args) => run_export(args).await,
        Command::Questions(args) => run_questions(args).await,
    }
}
