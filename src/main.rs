use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod catalog;
mod db;
mod labels;
mod models;
mod records;
mod report;
mod stats;
mod validation;

use catalog::QuestionCatalog;
use models::{AggregateReport, Submission, SubmissionRecord};

#[derive(Parser)]
#[command(name = "event-feedback")]
#[command(about = "Event feedback evaluations and results dashboard", long_about = None)]
struct Cli {
    /// Question catalog in TOML; the built-in event catalog is used when omitted
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample evaluations and an admin access code
    Seed,
    /// Import evaluations from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Validate and store one evaluation read from a JSON file
    Submit {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print headline results
    Summary {
        #[arg(long, env = "ADMIN_ACCESS_CODE", hide_env_values = true)]
        access_code: String,
    },
    /// Generate the results dashboard
    Report {
        #[arg(long, env = "ADMIN_ACCESS_CODE", hide_env_values = true)]
        access_code: String,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = "results.md")]
        out: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Checks the access code, then fetches and aggregates every evaluation.
async fn load_results(
    pool: &PgPool,
    access_code: &str,
    catalog: &QuestionCatalog,
) -> anyhow::Result<AggregateReport> {
    if !db::verify_access_code(pool, access_code).await? {
        return Err(db::AccessDenied.into());
    }
    let submissions: Vec<Submission> = db::fetch_submissions(pool)
        .await
        .context("failed to load evaluations")?
        .into_iter()
        .map(records::parse_record)
        .collect();
    Ok(stats::aggregate(&submissions, catalog))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog = match &cli.catalog {
        Some(path) => QuestionCatalog::load(path)
            .with_context(|| format!("invalid catalog {}", path.display()))?,
        None => QuestionCatalog::default(),
    };

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the evaluation Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} evaluations from {}.", csv.display());
        }
        Commands::Submit { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let raw: SubmissionRecord = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not an evaluation record", file.display()))?;
            let submission = records::parse_record(raw);
            validation::validate_submission(&submission, &catalog)?;

            let record = SubmissionRecord::from(&submission);
            let id = db::insert_submission(&pool, &record)
                .await
                .context("failed to submit evaluation, please try again")?;
            match id {
                Some(id) => println!("Evaluation {id} submitted. Thank you!"),
                None => println!("Evaluation was already submitted."),
            }
        }
        Commands::Summary { access_code } => {
            let results = load_results(&pool, &access_code, &catalog).await?;
            print!("{}", report::build_summary(&results));
        }
        Commands::Report {
            access_code,
            format,
            out,
        } => {
            let results = load_results(&pool, &access_code, &catalog).await?;
            let contents = match format {
                ReportFormat::Markdown => {
                    report::build_report(&results, &catalog, chrono::Utc::now())
                }
                ReportFormat::Json => serde_json::to_string_pretty(&results)?,
            };
            std::fs::write(&out, contents)?;
            info!("{} respondents aggregated", results.total_respondents);
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
