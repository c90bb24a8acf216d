//! Background OCR jobs: a bounded producer/consumer queue with status tracking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{HoadonError, JobError};
use crate::invoice::VietInvoiceParser;
use crate::models::invoice::Invoice;
use crate::ocr::{OcrResult, OcrService};
use crate::store::InvoiceStore;

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Progress reported once a worker picks a job up.
pub const PROGRESS_STARTED: u8 = 10;
/// Progress reported once text has been recognized.
pub const PROGRESS_RECOGNIZED: u8 = 70;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One uploaded file waiting for OCR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrJob {
    pub id: Uuid,
    pub filepath: PathBuf,
    pub filename: String,
    pub uploader: String,
    pub user_id: Option<String>,
    pub status: JobStatus,
    /// 0 to 100.
    pub progress: u8,
    pub invoice_id: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OcrJob {
    fn new(filepath: PathBuf, filename: String, uploader: String, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filepath,
            filename,
            uploader,
            user_id,
            status: JobStatus::Queued,
            progress: 0,
            invoice_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The two blocking steps of a job.
pub trait JobProcessor: Send + Sync + 'static {
    /// Recognize the text of a file.
    fn recognize(&self, path: &Path) -> crate::Result<OcrResult>;

    /// Turn recognized text into an invoice record.
    fn extract(&self, ocr: &OcrResult, filename: &str) -> crate::Result<Invoice>;
}

/// OCR service followed by the Vietnamese invoice parser.
pub struct OcrPipeline {
    ocr: OcrService,
    parser: VietInvoiceParser,
}

impl OcrPipeline {
    pub fn new(ocr: OcrService, parser: VietInvoiceParser) -> Self {
        Self { ocr, parser }
    }
}

impl JobProcessor for OcrPipeline {
    fn recognize(&self, path: &Path) -> crate::Result<OcrResult> {
        Ok(self.ocr.extract_text(path)?)
    }

    fn extract(&self, ocr: &OcrResult, filename: &str) -> crate::Result<Invoice> {
        if ocr.is_empty() {
            return Err(crate::error::ExtractionError::NoData.into());
        }
        let result = self.parser.extract_fields(&ocr.text, filename);
        for warning in &result.warnings {
            debug!("{}: {}", filename, warning);
        }
        Ok(Invoice::from_extracted(
            &result.invoice,
            filename,
            result.confidence,
            &ocr.text,
        ))
    }
}

type JobMap = Arc<RwLock<HashMap<Uuid, OcrJob>>>;

/// Queue of OCR jobs consumed by a fixed set of workers.
pub struct OcrJobQueue {
    jobs: JobMap,
    sender: RwLock<Option<mpsc::Sender<Uuid>>>,
    receiver: Mutex<Option<mpsc::Receiver<Uuid>>>,
}

impl OcrJobQueue {
    /// Queue holding at most `capacity` unclaimed jobs.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Register a job and hand it to the workers. Waits while the queue is full.
    pub async fn enqueue(
        &self,
        filepath: impl Into<PathBuf>,
        filename: impl Into<String>,
        uploader: impl Into<String>,
        user_id: Option<String>,
    ) -> Result<Uuid> {
        let sender = self
            .sender
            .read()
            .await
            .clone()
            .ok_or(JobError::QueueClosed)?;

        let job = OcrJob::new(filepath.into(), filename.into(), uploader.into(), user_id);
        let id = job.id;
        info!("Queued OCR job {} for {}", id, job.filename);
        self.jobs.write().await.insert(id, job);

        if sender.send(id).await.is_err() {
            self.jobs.write().await.remove(&id);
            return Err(JobError::QueueClosed);
        }
        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Option<OcrJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Set a job's status and progress; invoice id and error are kept when `None`.
    pub async fn update(
        &self,
        id: Uuid,
        status: JobStatus,
        progress: u8,
        invoice_id: Option<u64>,
        error_message: Option<String>,
    ) -> Result<OcrJob> {
        update_job(&self.jobs, id, status, progress, invoice_id, error_message).await
    }

    /// Queued jobs, oldest first.
    pub async fn pending(&self, limit: usize) -> Vec<OcrJob> {
        let mut queued: Vec<OcrJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.status == JobStatus::Queued)
            .cloned()
            .collect();
        queued.sort_by_key(|job| job.created_at);
        queued.truncate(limit);
        queued
    }

    /// All known jobs, oldest first.
    pub async fn jobs(&self) -> Vec<OcrJob> {
        let mut jobs: Vec<OcrJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Forget a finished job. Queued and running jobs cannot be removed.
    pub async fn remove(&self, id: Uuid) -> Result<OcrJob> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get(&id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        if !job.status.is_finished() {
            return Err(JobError::InProgress(id.to_string()));
        }
        jobs.remove(&id).ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Drop every completed or failed job, returning how many were removed.
    pub async fn clear_finished(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.status.is_finished());
        let removed = before - jobs.len();
        if removed > 0 {
            debug!("Cleared {} finished OCR jobs", removed);
        }
        removed
    }

    /// Stop accepting jobs. Workers exit once the queue is drained.
    pub async fn close(&self) {
        if self.sender.write().await.take().is_some() {
            debug!("OCR job queue closed");
        }
    }

    /// Spawn `workers` tasks consuming the queue. Can only be called once.
    pub async fn start(
        &self,
        workers: usize,
        processor: Arc<dyn JobProcessor>,
        store: Arc<InvoiceStore>,
    ) -> Result<WorkerPool> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| JobError::Failed("workers already started".to_string()))?;
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = workers.max(1);
        info!("Starting {} OCR workers", workers);

        let handles = (0..workers)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let jobs = Arc::clone(&self.jobs);
                let processor = Arc::clone(&processor);
                let store = Arc::clone(&store);

                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(id) = next else {
                            break;
                        };
                        debug!("Worker {} picked up job {}", worker, id);
                        run_job(&jobs, id, &processor, &store).await;
                    }
                    debug!("Worker {} stopped", worker);
                })
            })
            .collect();

        Ok(WorkerPool { handles })
    }
}

impl Default for OcrJobQueue {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Handles of running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Wait for every worker to finish. Close the queue first.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("OCR worker panicked: {}", e);
            }
        }
    }
}

async fn update_job(
    jobs: &JobMap,
    id: Uuid,
    status: JobStatus,
    progress: u8,
    invoice_id: Option<u64>,
    error_message: Option<String>,
) -> Result<OcrJob> {
    let mut jobs = jobs.write().await;
    let job = jobs
        .get_mut(&id)
        .ok_or_else(|| JobError::NotFound(id.to_string()))?;

    job.status = status;
    job.progress = progress.min(PROGRESS_DONE);
    if invoice_id.is_some() {
        job.invoice_id = invoice_id;
    }
    if error_message.is_some() {
        job.error_message = error_message;
    }
    job.updated_at = Utc::now();
    Ok(job.clone())
}

async fn run_job(
    jobs: &JobMap,
    id: Uuid,
    processor: &Arc<dyn JobProcessor>,
    store: &Arc<InvoiceStore>,
) {
    let job = match update_job(jobs, id, JobStatus::Processing, PROGRESS_STARTED, None, None).await {
        Ok(job) => job,
        Err(e) => {
            warn!("Skipping job: {}", e);
            return;
        }
    };

    let outcome = match process_job(jobs, &job, processor, store).await {
        Ok(invoice_id) => {
            info!("Job {} stored invoice {}", id, invoice_id);
            update_job(jobs, id, JobStatus::Completed, PROGRESS_DONE, Some(invoice_id), None).await
        }
        Err(e) => {
            warn!("Job {} failed: {}", id, e);
            let progress = jobs
                .read()
                .await
                .get(&id)
                .map_or(job.progress, |current| current.progress);
            update_job(jobs, id, JobStatus::Failed, progress, None, Some(e.to_string())).await
        }
    };

    if let Err(e) = outcome {
        error!("Could not record outcome of job {}: {}", id, e);
    }
}

async fn process_job(
    jobs: &JobMap,
    job: &OcrJob,
    processor: &Arc<dyn JobProcessor>,
    store: &Arc<InvoiceStore>,
) -> crate::Result<u64> {
    let worker = Arc::clone(processor);
    let path = job.filepath.clone();
    let ocr = tokio::task::spawn_blocking(move || worker.recognize(&path))
        .await
        .map_err(|e| JobError::Failed(e.to_string()))??;

    update_job(jobs, job.id, JobStatus::Processing, PROGRESS_RECOGNIZED, None, None).await?;

    let worker = Arc::clone(processor);
    let filename = job.filename.clone();
    let invoice = tokio::task::spawn_blocking(move || worker.extract(&ocr, &filename))
        .await
        .map_err(|e| JobError::Failed(e.to_string()))??;

    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || store.insert(invoice))
        .await
        .map_err(|e| HoadonError::from(JobError::Failed(e.to_string())))?
}
