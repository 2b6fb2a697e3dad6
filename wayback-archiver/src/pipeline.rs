use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ErrorKind, Result};
use crate::fetch::{FetchedPage, Fetcher};
use crate::index::IndexRecord;
use crate::io::{ensure_dir, write_page};
use crate::mapper::UrlMapper;
use crate::throttle::{sleep_unless, RateLimiter};

pub const DEFAULT_OUTPUT_DIR: &str = "archived_pages";

const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_root: PathBuf,
    /// Process only the first `limit` records, in index order. Zero means no limit.
    pub limit: Option<usize>,
    pub delay: Duration,
    pub workers: usize,
    /// Extra attempts for network errors, 429 and 5xx responses.
    pub retries: u32,
    /// First retry backoff; doubles per attempt up to 30 seconds.
    pub retry_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            limit: None,
            delay: Duration::from_secs(1),
            workers: 1,
            retries: 0,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPage {
    pub original_url: String,
    pub snapshot_url: String,
    pub local_path: PathBuf,
    pub success: bool,
    pub http_status: Option<u16>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    /// Set when the run stopped early because of an interrupt.
    pub cancelled: bool,
    pub pages: Vec<StoredPage>,
}

impl ArchiveSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn failures(&self) -> impl Iterator<Item = &StoredPage> {
        self.pages.iter().filter(|page| !page.success)
    }

    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ArchiveError::filesystem(path_ref, e.into()))?;
        fs::write(path_ref, json).map_err(|e| ArchiveError::filesystem(path_ref, e))
    }
}

enum Outcome {
    Skipped,
    Stored(StoredPage),
    /// Interrupted while waiting to fetch; nothing was requested.
    Cancelled,
}

pub struct Pipeline<F: Fetcher> {
    fetcher: F,
    mapper: UrlMapper,
    config: PipelineConfig,
    cancel: Arc<AtomicBool>,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(fetcher: F, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            mapper: UrlMapper::default(),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_mapper(mut self, mapper: UrlMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Setting this flag stops the run before the next request goes out,
    /// cutting short any delay or backoff wait. Files already written are kept.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn run(&self, records: &[IndexRecord]) -> ArchiveSummary {
        let records = match self.config.limit {
            Some(limit) if limit > 0 && limit < records.len() => {
                info!("Limited to {} URLs", limit);
                &records[..limit]
            }
            _ => records,
        };

        info!(
            "Downloading {} pages to {}...",
            records.len(),
            self.config.output_root.display()
        );

        let cursor = AtomicUsize::new(0);
        let workers = self.config.workers.clamp(1, records.len().max(1));

        let (mut outcomes, interrupted) = if workers == 1 {
            self.work(records, &cursor)
        } else {
            let cursor = &cursor;
            thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|_| scope.spawn(move || self.work(records, cursor)))
                    .collect();
                let mut outcomes = Vec::new();
                let mut interrupted = false;
                for handle in handles {
                    match handle.join() {
                        Ok((worker_outcomes, worker_interrupted)) => {
                            outcomes.extend(worker_outcomes);
                            interrupted |= worker_interrupted;
                        }
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
                (outcomes, interrupted)
            })
        };
        outcomes.sort_by_key(|(position, _)| *position);

        let mut summary = ArchiveSummary {
            cancelled: interrupted,
            ..ArchiveSummary::default()
        };
        for (_, outcome) in outcomes {
            match outcome {
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Cancelled => {}
                Outcome::Stored(page) => {
                    summary.attempted += 1;
                    if page.success {
                        summary.succeeded += 1;
                    }
                    summary.pages.push(page);
                }
            }
        }

        if summary.cancelled {
            warn!(
                "Interrupted after {} of {} records",
                summary.attempted + summary.skipped,
                records.len()
            );
        }
        info!(
            "Attempted {}, succeeded {}, failed {}, skipped {}",
            summary.attempted,
            summary.succeeded,
            summary.failed(),
            summary.skipped
        );
        summary
    }

    /// Pulls records off the shared cursor until none are left. Each worker
    /// paces its own requests. The flag is true when the worker stopped
    /// with records still unprocessed.
    fn work(
        &self,
        records: &[IndexRecord],
        cursor: &AtomicUsize,
    ) -> (Vec<(usize, Outcome)>, bool) {
        let mut limiter = RateLimiter::new(self.config.delay);
        let mut outcomes = Vec::new();
        loop {
            if self.is_cancelled() {
                return (outcomes, cursor.load(Ordering::SeqCst) < records.len());
            }
            let position = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(record) = records.get(position) else {
                return (outcomes, false);
            };
            match self.process(position, records.len(), record, &mut limiter) {
                Outcome::Cancelled => return (outcomes, true),
                outcome => outcomes.push((position, outcome)),
            }
        }
    }

    fn process(
        &self,
        position: usize,
        total: usize,
        record: &IndexRecord,
        limiter: &mut RateLimiter,
    ) -> Outcome {
        if let Err(e) = record.validate() {
            warn!("Skipping record {}: {}", position + 1, e);
            return Outcome::Skipped;
        }

        let snapshot_url = self
            .mapper
            .snapshot_url(&record.original_url, &record.timestamp);
        let local = self.mapper.local_path(&record.original_url);
        let page_dir = local.dir_under(&self.config.output_root);
        let page_file = local.file_under(&self.config.output_root);

        info!("[{}/{}] Downloading: {}", position + 1, total, snapshot_url);

        let mut attempts = 0;
        let result = match ensure_dir(&page_dir) {
            Err(e) => Err(e),
            Ok(()) => match self.fetch_with_retry(&snapshot_url, limiter, &mut attempts) {
                None => {
                    info!("Interrupted before fetching {}", snapshot_url);
                    return Outcome::Cancelled;
                }
                Some(fetched) => fetched.and_then(|page| {
                    write_page(&page_file, &page.body)?;
                    Ok(page.status)
                }),
            },
        };

        let stored = match result {
            Ok(status) => {
                info!("Saved: {}", page_file.display());
                StoredPage {
                    original_url: record.original_url.clone(),
                    snapshot_url,
                    local_path: page_file,
                    success: true,
                    http_status: Some(status),
                    error_kind: None,
                    error_message: None,
                    attempts,
                }
            }
            Err(e) => {
                error!(
                    "Error downloading {} (original {}): {}",
                    snapshot_url, record.original_url, e
                );
                StoredPage {
                    original_url: record.original_url.clone(),
                    snapshot_url,
                    local_path: page_file,
                    success: false,
                    http_status: e.http_status(),
                    error_kind: Some(e.kind()),
                    error_message: Some(e.to_string()),
                    attempts,
                }
            }
        };
        Outcome::Stored(stored)
    }

    /// `None` when the run was interrupted before the first request went out.
    fn fetch_with_retry(
        &self,
        url: &str,
        limiter: &mut RateLimiter,
        attempts: &mut u32,
    ) -> Option<Result<FetchedPage>> {
        let mut backoff = self.config.retry_backoff;
        loop {
            if !limiter.acquire_unless(&self.cancel) {
                return None;
            }
            *attempts += 1;
            match self.fetcher.fetch(url) {
                Ok(page) => return Some(Ok(page)),
                Err(e)
                    if e.is_retryable()
                        && *attempts <= self.config.retries
                        && !self.is_cancelled() =>
                {
                    warn!(
                        "Attempt {} for {} failed: {}; retrying in {:?}",
                        attempts, url, e, backoff
                    );
                    if !sleep_unless(backoff, &self.cancel) {
                        return Some(Err(e));
                    }
                    backoff = backoff.saturating_mul(2).min(MAX_RETRY_BACKOFF);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
