use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::adb::client::AdbClient;
use crate::app::config::{ResolverSettings, MAX_WORKERS};
use crate::app::error::AppError;
use crate::app::models::{AppName, PackagePath, ResolveProgress, ResolveReport};
use crate::app::name_cache::NameCache;

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub worker_count: usize,
    /// Drop empty/empty results instead of caching them, so the package is retried next pass.
    pub retry_empty_names: bool,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl From<&ResolverSettings> for ResolveOptions {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            worker_count: settings.worker_count,
            retry_empty_names: settings.retry_empty_names,
            cancel_flag: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProgressDelta {
    worker: usize,
}

/// Splits `items` into exactly `workers` contiguous chunks whose sizes differ by at most one.
pub fn partition<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let base = items.len() / workers;
    let extra = items.len() % workers;
    let mut iter = items.into_iter();
    (0..workers)
        .map(|index| {
            let size = base + usize::from(index < extra);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

pub struct NameResolver<'a> {
    client: &'a AdbClient,
    options: ResolveOptions,
}

impl<'a> NameResolver<'a> {
    pub fn new(client: &'a AdbClient, options: ResolveOptions) -> Self {
        Self { client, options }
    }

    /// One resolution pass over every package on `serial` that `cache` does not hold yet.
    ///
    /// `on_progress` runs on the calling thread after each inspection finishes on any worker.
    /// The cache is saved once at the end, including when the pass was cancelled or a worker
    /// panicked; the panic is then returned as an error.
    pub fn resolve(
        &self,
        cache: &mut NameCache,
        serial: &str,
        trace_id: &str,
        mut on_progress: impl FnMut(ResolveProgress),
    ) -> Result<ResolveReport, AppError> {
        let started = Instant::now();
        let worker_count = self.options.worker_count.clamp(1, MAX_WORKERS);
        let cancel_flag = self
            .options
            .cancel_flag
            .clone()
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

        self.client.push_inspection_tool(serial, trace_id);

        let pending: Vec<PackagePath> = self
            .client
            .list_packages_with_paths(serial, trace_id)
            .into_iter()
            .filter(|entry| !cache.contains(&entry.package_name))
            .collect();
        let total = pending.len();
        info!(
            trace_id = %trace_id,
            serial = %serial,
            total,
            workers = worker_count,
            cached = cache.len(),
            "resolving app names"
        );
        on_progress(ResolveProgress {
            completed: 0,
            total,
        });

        let chunks = partition(pending, worker_count);
        let mut per_worker_completed = vec![0usize; worker_count];
        let client = self.client;
        let cancel: &AtomicBool = &cancel_flag;

        let outcomes: Vec<Result<Vec<(String, AppName)>, AppError>> = thread::scope(|scope| {
            let (progress_tx, progress_rx) = mpsc::sync_channel::<ProgressDelta>(worker_count * 4);

            let mut handles = Vec::new();
            for (worker, chunk) in chunks.into_iter().enumerate() {
                if chunk.is_empty() {
                    continue;
                }
                let progress_tx = progress_tx.clone();
                handles.push(scope.spawn(move || {
                    run_worker(client, serial, worker, chunk, cancel, progress_tx, trace_id)
                }));
            }
            drop(progress_tx);

            let mut completed = 0usize;
            for delta in progress_rx.iter() {
                per_worker_completed[delta.worker] += 1;
                completed += 1;
                on_progress(ResolveProgress { completed, total });
            }

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().map_err(|_| {
                        AppError::system("Name resolution worker panicked", trace_id)
                    })
                })
                .collect()
        });

        let mut resolved = 0usize;
        let mut fault = None;
        for outcome in outcomes {
            match outcome {
                Ok(names) => {
                    for (package_name, name) in names {
                        if name.is_empty() && self.options.retry_empty_names {
                            continue;
                        }
                        cache.set(package_name, name);
                        resolved += 1;
                    }
                }
                Err(err) => {
                    warn!(trace_id = %trace_id, serial = %serial, error = %err.error, "worker failed");
                    fault.get_or_insert(err);
                }
            }
        }

        cache.save(trace_id)?;
        if let Some(err) = fault {
            return Err(err);
        }

        let cancelled = cancel_flag.load(Ordering::SeqCst);
        let elapsed_ms = started.elapsed().as_millis();
        info!(
            trace_id = %trace_id,
            serial = %serial,
            total,
            resolved,
            cancelled,
            elapsed_ms,
            "app name resolution finished"
        );

        Ok(ResolveReport {
            serial: serial.to_string(),
            total,
            resolved,
            per_worker_completed,
            elapsed_ms,
            cancelled,
            finished_at: Utc::now().to_rfc3339(),
        })
    }
}

fn run_worker(
    client: &AdbClient,
    serial: &str,
    worker: usize,
    chunk: Vec<PackagePath>,
    cancel_flag: &AtomicBool,
    progress: SyncSender<ProgressDelta>,
    trace_id: &str,
) -> Vec<(String, AppName)> {
    let mut resolved = Vec::with_capacity(chunk.len());
    for entry in chunk {
        if cancel_flag.load(Ordering::SeqCst) {
            debug!(trace_id = %trace_id, worker, "worker stopping on cancel");
            break;
        }
        let name = client.inspect_apk(serial, &entry.apk_path, Some(cancel_flag), trace_id);
        if progress.send(ProgressDelta { worker }).is_err() {
            break;
        }
        match name {
            Some(name) => resolved.push((entry.package_name, name)),
            None => debug!(
                trace_id = %trace_id,
                worker,
                package_name = %entry.package_name,
                "no badging output"
            ),
        }
    }
    resolved
}
