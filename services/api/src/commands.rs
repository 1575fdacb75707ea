use crate::cli::BackendArgs;
use crate::infra::{
    apply_backend_overrides, build_session, parse_date, parse_score_filter, require_loaded,
    LiveSession,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::pipeline::{FilterCriteria, JobId, ScoreFilter};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Result-list filters shared by `results` and `export`.
#[derive(Args, Debug)]
pub(crate) struct FilterArgs {
    /// Only candidates assigned to this job
    #[arg(long)]
    job_id: Option<String>,
    /// Case-insensitive match on name, email, or skills
    #[arg(long, default_value = "")]
    search: String,
    /// Score bucket: all, excellent, good, fair, low
    #[arg(long, value_parser = parse_score_filter, default_value = "all")]
    score: ScoreFilter,
    #[arg(long, default_value_t = 0.0)]
    min_score: f64,
    #[arg(long, default_value_t = 100.0)]
    max_score: f64,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            job_id: self.job_id.clone().map(JobId::new),
            shortlisted_only: false,
            search: self.search.clone(),
            score_filter: self.score,
            min_score: self.min_score,
            max_score: self.max_score,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ResultsArgs {
    #[command(flatten)]
    backend: BackendArgs,
    #[command(flatten)]
    filters: FilterArgs,
    /// Maximum number of ranked rows to print
    #[arg(long, default_value_t = 25)]
    limit: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    backend: BackendArgs,
    #[command(flatten)]
    filters: FilterArgs,
    /// Directory the CSV file is written to
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// Title used in the file name; defaults to the filtered job's title
    #[arg(long)]
    job_title: Option<String>,
    /// Date stamp for the file name (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct QuestionsArgs {
    #[command(flatten)]
    backend: BackendArgs,
    /// Job to generate interview questions for
    #[arg(long)]
    job_id: String,
}

async fn loaded_session(backend: &BackendArgs) -> Result<Arc<LiveSession>, AppError> {
    let mut config = AppConfig::load()?;
    apply_backend_overrides(&mut config, backend)?;

    let session = build_session(&config)?;
    require_loaded(session.refresh(None).await)?;
    Ok(session)
}

pub(crate) async fn run_results(args: ResultsArgs) -> Result<(), AppError> {
    let session = loaded_session(&args.backend).await?;
    let criteria = args.filters.criteria();
    let displayed = session.displayed(&criteria);
    let summary = session.summary(&criteria);

    println!(
        "Screening results: {} candidates, average score {:.1}",
        summary.total, summary.average_score
    );
    for bucket in &summary.buckets {
        println!("  {:<10} {}", bucket.label, bucket.count);
    }

    if displayed.is_empty() {
        println!("\nNo candidates match the current filters.");
        return Ok(());
    }

    println!("\nRanked candidates");
    for (index, candidate) in displayed.iter().take(args.limit).enumerate() {
        println!(
            "{:>3}. {:<28} {:>5.1}  {:<9} {}",
            index + 1,
            candidate.name,
            candidate.score,
            candidate.match_level().label(),
            candidate.email
        );
    }
    if displayed.len() > args.limit {
        println!("  ... {} more", displayed.len() - args.limit);
    }

    println!("\nJobs");
    for job in session.jobs() {
        println!("  {} ({})", job.title, job.id);
    }

    Ok(())
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let session = loaded_session(&args.backend).await?;
    let criteria = args.filters.criteria();
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let export = session.export(&criteria, &BTreeSet::new(), args.job_title.as_deref(), date)?;
    let path = export.write_to_dir(&args.out)?;

    println!("Exported {} candidates to {}", export.rows, path.display());
    Ok(())
}

pub(crate) async fn run_questions(args: QuestionsArgs) -> Result<(), AppError> {
    let session = loaded_session(&args.backend).await?;
    let job_id = JobId::new(args.job_id);
    let Some(job) = session.job(&job_id) else {
        println!("No job with id {job_id}.");
        return Ok(());
    };
    let categories = session.questions(&job_id).unwrap_or_default();

    println!("Interview questions for {}", job.title);
    for category in categories {
        println!("\n{}", category.category);
        for question in category.questions {
            println!("  - {question}");
        }
    }
    Ok(())
}
