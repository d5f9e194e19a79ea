use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod analytics;
mod bulk;
mod client;
mod db;
mod error;
mod history;
mod models;
mod report;
mod slot;

use crate::bulk::BulkOptions;
use crate::client::{PredictionClient, Predictor, DEFAULT_API_URL};
use crate::history::HistoryStore;
use crate::models::{PredictionInput, PredictionRequest, RiskLevel, RowResult};
use crate::slot::{FileSlot, Slot, DEFAULT_HISTORY_KEY};

#[derive(Parser)]
#[command(name = "academic-insight")]
#[command(about = "Student risk predictions with a local history and analytics", long_about = None)]
struct Cli {
    /// Base address of the prediction API
    #[arg(long, global = true, env = "PREDICTION_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Directory holding the history file
    #[arg(long, global = true, env = "ACADEMIC_INSIGHT_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Keep history in Postgres instead of a local file
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Slot key the history is stored under
    #[arg(long, global = true, env = "ACADEMIC_INSIGHT_HISTORY_KEY", default_value = DEFAULT_HISTORY_KEY)]
    history_key: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the Postgres schema
    InitDb,
    /// Check whether the prediction API is reachable
    Health,
    /// Predict risk for one student and record it
    Predict {
        #[arg(long)]
        marks: f64,
        #[arg(long)]
        attendance: f64,
        #[arg(long, default_value = "")]
        feedback: String,
    },
    /// Predict every row of a marks,attendance,feedback CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Pause after each row, in milliseconds
        #[arg(long, default_value_t = 100)]
        pause_ms: u64,
    },
    /// List recorded predictions, newest first
    History {
        #[arg(long, value_enum)]
        risk: Option<RiskFilter>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete all recorded predictions
    Clear,
    /// Summarize recorded predictions
    Analytics {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RiskFilter {
    Good,
    Average,
    AtRisk,
}

impl From<RiskFilter> for RiskLevel {
    fn from(filter: RiskFilter) -> Self {
        match filter {
            RiskFilter::Good => RiskLevel::Good,
            RiskFilter::Average => RiskLevel::Average,
            RiskFilter::AtRisk => RiskLevel::AtRisk,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

struct Storage {
    database_url: Option<String>,
    data_dir: Option<PathBuf>,
    history_key: String,
}

impl Storage {
    async fn open_slot(&self) -> anyhow::Result<Box<dyn Slot>> {
        if let Some(database_url) = self.database_url.as_deref() {
            let pool = db::connect(database_url).await?;
            return Ok(Box::new(db::PgSlot::new(pool)));
        }
        let dir = self.data_dir.clone().unwrap_or_else(FileSlot::default_dir);
        tracing::debug!(dir = %dir.display(), "using file history");
        Ok(Box::new(FileSlot::new(dir)))
    }

    async fn open_history(&self) -> anyhow::Result<HistoryStore> {
        let slot = self.open_slot().await?;
        Ok(HistoryStore::load(slot, self.history_key.clone()).await)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let storage = Storage {
        database_url: cli.database_url,
        data_dir: cli.data_dir,
        history_key: cli.history_key,
    };
    let client = PredictionClient::new(&cli.api_url);

    match cli.command {
        Commands::InitDb => {
            let database_url = storage
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set to initialize the Postgres schema")?;
            let pool = db::connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Health => {
            if client.health_check().await {
                println!("Prediction API at {} is healthy.", client.base_url());
            } else {
                anyhow::bail!("prediction API at {} is not reachable", client.base_url());
            }
        }
        Commands::Predict {
            marks,
            attendance,
            feedback,
        } => {
            let request = PredictionRequest {
                marks,
                attendance,
                feedback,
            };
            let result = client.predict(&request).await?;
            let mut history = storage.open_history().await?;
            let record = history
                .append(PredictionInput::from_result(&request, result))
                .await?;

            println!("Risk: {}", record.risk);
            println!("Sentiment: {}", record.sentiment);
            for reason in &record.reasons {
                println!("- {reason}");
            }
        }
        Commands::Import { csv, pause_ms } => {
            let text = std::fs::read_to_string(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let mut history = storage.open_history().await?;
            let options = BulkOptions {
                row_pause: std::time::Duration::from_millis(pause_ms),
            };
            let summary = bulk::import_csv(&text, &client, &mut history, &options, |progress| {
                eprintln!(
                    "Processing: {:.0}% ({}/{})",
                    progress.percent(),
                    progress.attempted,
                    progress.total
                );
            })
            .await?;

            println!(
                "Processed {} students: {} successful, {} failed, {} at risk.",
                summary.total, summary.successful, summary.failed, summary.at_risk
            );
            let failures = summary
                .outcomes
                .iter()
                .enumerate()
                .filter(|(_, outcome)| !outcome.is_success());
            for (index, outcome) in failures {
                if let RowResult::Failure { error } = &outcome.result {
                    println!(
                        "- row {} (marks {}, attendance {}): {error}",
                        index + 1,
                        outcome.row.marks,
                        outcome.row.attendance
                    );
                }
            }
        }
        Commands::History { risk, limit } => {
            let history = storage.open_history().await?;
            let records: Vec<_> = match risk {
                Some(filter) => history.filter_by_risk(filter.into()),
                None => history.records().iter().collect(),
            };

            if records.is_empty() {
                println!("No predictions recorded.");
                return Ok(());
            }

            println!(
                "Showing {} of {} predictions:",
                records.len().min(limit),
                history.len()
            );

            for record in records.iter().take(limit) {
                println!(
                    "- {} marks {} attendance {}% -> {} / {}: {}",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.marks,
                    record.attendance,
                    record.risk,
                    record.sentiment,
                    record.feedback
                );
            }
        }
        Commands::Clear => {
            let mut history = storage.open_history().await?;
            history.clear().await?;
            println!("History cleared.");
        }
        Commands::Analytics { json } => {
            let history = storage.open_history().await?;
            let summary = analytics::summarize(history.records());
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("Total predictions: {}", summary.total);
            println!(
                "At risk: {} ({:.1}%)",
                summary.at_risk_count, summary.at_risk_percentage
            );
            println!("Average marks: {:.1}", summary.average_marks);
            for entry in &summary.risk_distribution {
                println!("- {}: {}", entry.risk, entry.students);
            }
            for (title, ranges) in [
                ("Marks", &summary.marks_ranges),
                ("Attendance", &summary.attendance_ranges),
            ] {
                println!("{title}:");
                for range in ranges {
                    println!(
                        "  {:>8}  good {:>3}  average {:>3}  at-risk {:>3}  total {:>3}",
                        range.range,
                        range.good,
                        range.average,
                        range.at_risk,
                        range.total()
                    );
                }
            }
        }
        Commands::Report { out } => {
            let history = storage.open_history().await?;
            let report = report::build_report(chrono::Utc::now(), history.records());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
