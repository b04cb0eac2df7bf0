//! Receipt pipeline CLI
//!
//! Submit receipts for analysis, drive the artifact sweep and inspect
//! expense records. The sweep subcommand is what an external scheduler
//! (cron or similar) invokes periodically.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use receipts_core::{ConfidenceLabel, PipelineConfig};
use receipts_llm::{ExpenseExtractor, HttpLlmClient};
use receipts_pipeline::{
    FileStore, FsFileStore, HttpAnalysisClient, JsonCategoryDirectory, JsonRecordStore,
    RecordStore, TaskOrchestrator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "receipts")]
#[command(about = "Receipt capture and expense extraction pipeline")]
struct Args {
    /// Data directory holding receipts, artifacts and records
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a receipt file for analysis
    Submit {
        /// Path to the receipt (pdf/jpg/jpeg/png/gif/tiff/tif)
        #[arg(short, long)]
        file: PathBuf,

        /// Submitting user ID
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Run one artifact sweep over all in-flight jobs
    Sweep,

    /// Show the record for one submitted file
    Status {
        /// File ID printed at submission time
        #[arg(long)]
        file_id: String,
    },

    /// List records created by a user
    List {
        /// User ID to list records for
        #[arg(short, long, default_value = "local")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "receipts=info"
                    .parse()
                    .expect("directive is compile-time constant"),
            ),
        )
        .init();

    let args = Args::parse();
    let config = PipelineConfig::from_env();

    let records = Arc::new(JsonRecordStore::new(args.data_dir.join("records")));

    match args.command {
        Command::Submit { file, user } => {
            let orchestrator = build_orchestrator(&args.data_dir, config, records)?;
            submit(&orchestrator, &args.data_dir, &file, &user).await?;
        }
        Command::Sweep => {
            let orchestrator = build_orchestrator(&args.data_dir, config, records)?;
            let summary = orchestrator.sweep().await?;
            println!(
                "swept {} job(s): {} ready, {} not ready, {} failed",
                summary.swept, summary.ready, summary.not_ready, summary.failed
            );
        }
        Command::Status { file_id } => {
            status(records.as_ref(), &file_id)?;
        }
        Command::List { user } => {
            list(records.as_ref(), &user)?;
        }
    }

    Ok(())
}

fn build_orchestrator(
    data_dir: &Path,
    config: PipelineConfig,
    records: Arc<JsonRecordStore>,
) -> Result<TaskOrchestrator> {
    let files = Arc::new(FsFileStore::new(data_dir));
    let categories = Arc::new(JsonCategoryDirectory::new(data_dir.join("categories.json")));
    let analysis = Arc::new(HttpAnalysisClient::from_env()?);
    let extractor = ExpenseExtractor::new(Arc::new(HttpLlmClient::from_env()?));

    Ok(TaskOrchestrator::new(
        config, files, records, categories, analysis, extractor,
    ))
}

async fn submit(
    orchestrator: &TaskOrchestrator,
    data_dir: &Path,
    file: &Path,
    user: &str,
) -> Result<()> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("file path has no file name")?;
    let bytes =
        std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;

    // Stage the receipt inside the pipeline's file store
    let file_id = format!("incoming/{file_name}");
    FsFileStore::new(data_dir).save(&file_id, &bytes)?;

    let job = orchestrator.submit(&file_id, &file_name, user).await?;
    info!(tracking_id = %job.tracking_id, "receipt submitted");
    println!("submitted: file_id={file_id} tracking_id={}", job.tracking_id);
    println!("awaiting analysis output at {}", job.output_file_path);
    Ok(())
}

fn status(records: &dyn RecordStore, file_id: &str) -> Result<()> {
    let Some(record) = records.get(file_id)? else {
        println!("no record for file_id={file_id}");
        return Ok(());
    };

    println!("file:       {} ({})", record.file_name, record.file_id);
    println!("status:     {}", record.status);
    println!("tracking:   {}", record.tracking_id);
    println!(
        "expense:    {} | {:.2} | {} | category {}",
        record.expense.vendor, record.expense.amount, record.expense.date, record.expense.category_id
    );
    println!(
        "confidence: {:.2} ({})",
        record.composite_confidence,
        ConfidenceLabel::for_score(record.composite_confidence)
    );
    if record.expense.requires_review {
        println!(
            "review:     required - {}",
            record.expense.review_reason.as_deref().unwrap_or("no reason recorded")
        );
    }
    if let Some(error) = &record.error_message {
        println!("error:      {error}");
    }
    Ok(())
}

fn list(records: &dyn RecordStore, user: &str) -> Result<()> {
    let mut records = records.list_by_user(user)?;
    records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    if records.is_empty() {
        println!("no records for user {user}");
        return Ok(());
    }
    for record in records {
        println!(
            "{:<10} {:<8} {:>10.2}  {}  {}",
            record.status.to_string(),
            ConfidenceLabel::for_score(record.composite_confidence).to_string(),
            record.expense.amount,
            record.expense.date,
            record.expense.vendor,
        );
    }
    Ok(())
}
