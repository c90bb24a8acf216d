//! Batch processing command - run many files through the OCR job queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use hoadon_core::invoice::VietInvoiceParser;
use hoadon_core::jobs::{JobStatus, OcrJob, OcrJobQueue, OcrPipeline};
use hoadon_core::ocr::{is_supported_file, OcrService};
use hoadon_core::store::InvoiceStore;

use super::config;
use super::output::money;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files
    #[arg(required = true)]
    input: String,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Also write a summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Uploader recorded on each job
    #[arg(long, default_value = "cli")]
    uploader: String,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = config::load(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported_file(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let store = Arc::new(InvoiceStore::open(&config.storage.invoices_path)?);
    let pipeline = Arc::new(OcrPipeline::new(
        OcrService::from_config(&config.ocr),
        VietInvoiceParser::from_config(&config.extraction),
    ));

    let queue = OcrJobQueue::new(config.jobs.queue_capacity.max(files.len()));
    let workers = args.jobs.unwrap_or(config.jobs.workers);
    let pool = queue.start(workers, pipeline, Arc::clone(&store)).await?;

    for path in &files {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        queue
            .enqueue(path.clone(), filename, args.uploader.clone(), None)
            .await?;
    }
    queue.close().await;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let workers = tokio::spawn(pool.join());
    while !workers.is_finished() {
        let finished = queue.jobs().await.iter().filter(|j| j.status.is_finished()).count();
        pb.set_position(finished as u64);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    workers.await?;
    pb.finish_and_clear();

    let mut results = queue.jobs().await;
    results.sort_by(|a, b| a.filename.cmp(&b.filename));

    let successful: Vec<&OcrJob> = results
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .collect();
    let failed: Vec<&OcrJob> = results
        .iter()
        .filter(|j| j.status == JobStatus::Failed)
        .collect();

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &results, &store)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !successful.is_empty() {
        println!();
        for job in &successful {
            if let Some(invoice) = job.invoice_id.and_then(|id| store.get(id)) {
                println!(
                    "  {} {} → #{} {} {}",
                    style("✓").green(),
                    job.filename,
                    invoice.id,
                    invoice.invoice_code,
                    money(invoice.total_amount, &invoice.currency)
                );
            }
        }
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for job in &failed {
            println!(
                "  - {}: {}",
                job.filepath.display(),
                job.error_message.as_deref().unwrap_or("unknown error")
            );
        }

        if !args.continue_on_error {
            anyhow::bail!("Processing failed for {} file(s)", failed.len());
        }
        warn!("{} file(s) failed", failed.len());
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[OcrJob], store: &InvoiceStore) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_id",
        "invoice_code",
        "total_amount",
        "confidence",
        "error",
    ])?;

    for job in results {
        let invoice = job.invoice_id.and_then(|id| store.get(id));
        wtr.write_record([
            job.filename.clone(),
            job.status.as_str().to_string(),
            job.invoice_id.map(|id| id.to_string()).unwrap_or_default(),
            invoice
                .as_ref()
                .map(|i| i.invoice_code.clone())
                .unwrap_or_default(),
            invoice
                .as_ref()
                .map(|i| i.total_amount.to_string())
                .unwrap_or_default(),
            invoice
                .as_ref()
                .map(|i| format!("{:.2}", i.confidence))
                .unwrap_or_default(),
            job.error_message.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    debug!("Wrote batch summary for {} jobs", results.len());
    Ok(())
}
