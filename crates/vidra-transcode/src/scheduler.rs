//! Admission control for encoder jobs.
//!
//! The hardware encoder tolerates one job at a time, and the operator caps
//! how many jobs may start per rolling window. Both limits queue work
//! instead of rejecting it: a submission waits as long as it takes and then
//! runs. Nothing is retried and nothing is persisted; a job that is still
//! queued when the process exits is simply gone.

use crate::encoder::EncodeError;
use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

/// Lifecycle of one submission, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// One unit of encoder work, identified by the video it belongs to.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub id: Uuid,
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub submitted_at: Instant,
}

impl TranscodeJob {
    pub fn new(id: Uuid, input: PathBuf, out_dir: PathBuf) -> Self {
        Self {
            id,
            input,
            out_dir,
            submitted_at: Instant::now(),
        }
    }
}

/// FIFO scheduler bounding concurrent encoder jobs and admissions per
/// rolling window.
pub struct TranscodeScheduler {
    permits: Semaphore,
    window: Duration,
    max_per_window: usize,
    admissions: Mutex<VecDeque<Instant>>,
    queued: AtomicUsize,
}

impl TranscodeScheduler {
    /// A `max_per_window` of zero is clamped to one admission per window.
    pub fn new(concurrency: usize, max_per_window: usize, window: Duration) -> Self {
        Self {
            permits: Semaphore::new(concurrency),
            window,
            // wait_for_window_slot assumes at least one slot exists: it
            // indexes the oldest admission whenever the window is full.
            max_per_window: max_per_window.max(1),
            admissions: Mutex::new(VecDeque::new()),
            queued: AtomicUsize::new(0),
        }
    }

    /// Number of submissions waiting for admission.
    pub fn queue_depth(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Run `work` once the job is admitted.
    ///
    /// Admission order is submission order: the semaphore hands out permits
    /// fairly, and the rolling-window wait happens while the permit is held,
    /// so later submissions cannot overtake an earlier one. The returned
    /// future resolves with the work's own result; admission never fails a
    /// job on its own.
    pub async fn submit<T, F, Fut>(&self, job: TranscodeJob, work: F) -> Result<T, EncodeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EncodeError>>,
    {
        let queued = QueueGuard::enter(&self.queued);
        tracing::info!(
            job_id = %job.id,
            input = %job.input.display(),
            queue_depth = self.queue_depth(),
            state = ?JobState::Queued,
            "Transcode job queued"
        );

        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EncodeError::QueueClosed(e.to_string()))?;
        self.wait_for_window_slot().await;
        drop(queued);

        tracing::info!(
            job_id = %job.id,
            queued_ms = job.submitted_at.elapsed().as_secs_f64() * 1000.0,
            queue_depth = self.queue_depth(),
            state = ?JobState::Running,
            "Transcode job admitted"
        );

        let started = Instant::now();
        let result = work().await;
        drop(permit);

        match &result {
            Ok(_) => tracing::info!(
                job_id = %job.id,
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                state = ?JobState::Succeeded,
                "Transcode job finished"
            ),
            Err(e) => tracing::error!(
                job_id = %job.id,
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                state = ?JobState::Failed,
                error = %e,
                "Transcode job failed"
            ),
        }

        result
    }

    /// Block until the rolling window has a free admission slot, then claim
    /// it. Slots free up as past admissions age beyond the window.
    async fn wait_for_window_slot(&self) {
        loop {
            let wait = {
                let mut admissions = self.admissions.lock().await;
                let now = Instant::now();

                while let Some(front) = admissions.front() {
                    if now.duration_since(*front) >= self.window {
                        admissions.pop_front();
                    } else {
                        break;
                    }
                }

                if admissions.len() < self.max_per_window {
                    admissions.push_back(now);
                    return;
                }

                // Sleep until the oldest admission ages out.
                self.window - now.duration_since(admissions[0])
            };

            tokio::time::sleep(wait).await;
        }
    }
}

/// Keeps the queued counter accurate even when a waiting submission is
/// dropped before admission.
struct QueueGuard<'a>(&'a AtomicUsize);

impl<'a> QueueGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
