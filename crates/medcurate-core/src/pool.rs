//! Bounded worker pool for per-shard jobs
//!
//! Jobs run on a dedicated rayon [`ThreadPool`] of `width` threads. The
//! submitting thread takes a [`Semaphore`] permit before spawning each job,
//! so at most `width` jobs are queued or running at once and submission
//! blocks beyond that. Each job owns its permit and gives it back when it
//! returns. Results flow back over a channel and are handed to the caller's
//! `on_complete` on the submitting thread, in completion order.
//!
//! A job that returns `Err` or panics is recorded as a [`JobError`]; the
//! remaining jobs keep running. Every spawned job has finished before
//! [`run`] returns.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::semaphore::Semaphore;
use crate::shutdown::shutdown_flag;

/// Why a job produced no value
#[derive(Debug)]
pub enum JobError<E> {
    /// The job ran and returned an error
    Failed(E),
    /// The job panicked; payload message if it was a string
    Panicked(String),
}

impl<E: std::fmt::Display> std::fmt::Display for JobError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(e) => std::fmt::Display::fmt(e, f),
            Self::Panicked(msg) => write!(f, "worker panicked: {msg}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for JobError<E> {}

/// Everything the pool did with the submitted items
#[derive(Debug)]
pub struct PoolReport<I, T, E> {
    pub completed: Vec<(I, T)>,
    pub failed: Vec<(I, JobError<E>)>,
    /// Items never started because shutdown was requested
    pub not_started: Vec<I>,
}

impl<I, T, E> PoolReport<I, T, E> {
    pub fn submitted(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

fn build_pool(width: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(width)
        .thread_name(|i| format!("medcurate-worker-{i}"))
        .build()
}

/// Run `job` over `items` with at most `width` concurrent invocations.
///
/// Stops submitting when the global shutdown flag is raised.
pub fn run<I, T, E, F>(
    items: Vec<I>,
    width: usize,
    job: F,
    on_complete: impl FnMut(&I, &Result<T, JobError<E>>),
) -> Result<PoolReport<I, T, E>, ThreadPoolBuildError>
where
    I: Sync,
    T: Send,
    E: Send,
    F: Fn(&I) -> Result<T, E> + Sync,
{
    run_until(items, width, shutdown_flag(), job, on_complete)
}

/// [`run`] with an explicit stop flag.
///
/// Errors only if the thread pool cannot be created.
pub fn run_until<I, T, E, F>(
    items: Vec<I>,
    width: usize,
    stop: &AtomicBool,
    job: F,
    mut on_complete: impl FnMut(&I, &Result<T, JobError<E>>),
) -> Result<PoolReport<I, T, E>, ThreadPoolBuildError>
where
    I: Sync,
    T: Send,
    E: Send,
    F: Fn(&I) -> Result<T, E> + Sync,
{
    let width = width.max(1);
    let pool = build_pool(width)?;
    let slots = Semaphore::new(width);
    let mut results: Vec<Option<Result<T, JobError<E>>>> = items.iter().map(|_| None).collect();

    // Submission stays on the calling thread so blocking on a permit never
    // occupies a worker.
    pool.in_place_scope(|s| {
        let (tx, rx) = mpsc::channel::<(usize, Result<T, JobError<E>>)>();
        let job = &job;

        for (idx, item) in items.iter().enumerate() {
            if stop.load(Ordering::Relaxed) {
                log::warn!(
                    "Shutdown requested, {} items not submitted",
                    items.len() - idx
                );
                break;
            }

            let permit = slots.acquire();

            // Reap whatever finished while we waited for the slot
            while let Ok((done, result)) = rx.try_recv() {
                on_complete(&items[done], &result);
                results[done] = Some(result);
            }

            let tx = tx.clone();
            s.spawn(move |_| {
                let result = match catch_unwind(AssertUnwindSafe(|| job(item))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(JobError::Failed(e)),
                    Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
                };
                drop(permit);
                // Receiver outlives every sender inside the scope
                let _ = tx.send((idx, result));
            });
        }

        drop(tx);
        for (done, result) in rx {
            on_complete(&items[done], &result);
            results[done] = Some(result);
        }
    });

    let mut report = PoolReport {
        completed: Vec::new(),
        failed: Vec::new(),
        not_started: Vec::new(),
    };
    for (item, result) in items.into_iter().zip(results) {
        match result {
            Some(Ok(value)) => report.completed.push((item, value)),
            Some(Err(e)) => report.failed.push((item, e)),
            None => report.not_started.push(item),
        }
    }
    Ok(report)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
