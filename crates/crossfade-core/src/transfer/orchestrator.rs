//! Sequential transfer loop with concurrent progress polling.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use super::{
    JobOutcome, JobResult, JobStatus, RunEvent, RunProgress, RunReport, RunState, TransferPlan,
};
use crate::api::{Backend, TransferRequest};
use crate::catalog::Collection;
use crate::error::{Error, Result};
use crate::progress::{global_percent, LocalProgress};
use crate::service::ServiceId;

const EVENT_CAPACITY: usize = 256;

/// Runs transfer plans against a [`Backend`].
///
/// Only one run exists at a time. Jobs are submitted one after another;
/// while a submission is outstanding a poller task samples the backend's
/// progress endpoint. The poller belongs to its job and is cancelled and
/// joined as soon as the submission resolves, before the next job starts.
///
/// Dropping the future returned by [`run`](Self::run) cancels the active
/// poller and returns the orchestrator to idle.
pub struct TransferOrchestrator {
    backend: Arc<dyn Backend>,
    poll_interval: Duration,
    publisher: Arc<Publisher>,
}

impl TransferOrchestrator {
    /// Create an idle orchestrator polling progress every `poll_interval`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, poll_interval: Duration) -> Self {
        let (progress_tx, _) = watch::channel(RunProgress::default());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            poll_interval,
            publisher: Arc::new(Publisher {
                progress_tx,
                events_tx,
            }),
        }
    }

    /// Subscribe to the run snapshot.
    pub fn progress(&self) -> watch::Receiver<RunProgress> {
        self.publisher.progress_tx.subscribe()
    }

    /// Subscribe to run events.
    pub fn events(&self) -> broadcast::Receiver<RunEvent> {
        self.publisher.events_tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> RunProgress {
        self.publisher.progress_tx.borrow().clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.publisher.progress_tx.borrow().state
    }

    /// Process every job of `plan` and return the collected results.
    ///
    /// Fails without doing anything when the plan is empty or another run
    /// has not been reset yet. Job failures are recorded in the report and
    /// never end the run early.
    pub async fn run(&self, plan: TransferPlan) -> Result<RunReport> {
        if plan.collections.is_empty() {
            return Err(Error::EmptySelection);
        }

        let run_id = Uuid::new_v4();
        if !self.publisher.claim(run_id, &plan) {
            return Err(Error::RunInProgress);
        }
        let claim = RunClaim {
            publisher: Arc::clone(&self.publisher),
            run_id,
        };

        let started_at = Utc::now();
        tracing::info!(
            "Transfer run {} started: {} playlists to {}",
            run_id,
            plan.collections.len(),
            plan.destination
        );

        let sizes: Vec<u64> = plan.collections.iter().map(|c| c.item_count).collect();
        let mut results = Vec::with_capacity(plan.collections.len());

        for (index, collection) in plan.collections.iter().enumerate() {
            let outcome = self
                .run_job(index, collection, &plan.destination, &sizes)
                .await;

            let result = JobResult {
                index,
                collection_id: collection.id.clone(),
                name: collection.name.clone(),
                outcome,
            };
            self.publisher.finish_job(&result);
            self.publisher
                .raise_percent(global_percent(&sizes, index + 1, 0.0));
            results.push(result);
        }

        claim.complete();

        let report = RunReport {
            run_id,
            destination: plan.destination,
            started_at,
            finished_at: Utc::now(),
            results,
        };
        tracing::info!(
            "Transfer run {} completed: {} succeeded, {} failed",
            run_id,
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Return a completed run to idle, clearing its results and progress.
    ///
    /// Returns false if there was no completed run.
    pub fn reset(&self) -> bool {
        let reset = self.publisher.progress_tx.send_if_modified(|p| {
            if p.state == RunState::Completed {
                *p = RunProgress::default();
                true
            } else {
                false
            }
        });
        if reset {
            tracing::debug!("Transfer run cleared");
            self.publisher.emit(RunEvent::Reset);
        }
        reset
    }

    async fn run_job(
        &self,
        index: usize,
        collection: &Collection,
        destination: &ServiceId,
        sizes: &[u64],
    ) -> JobOutcome {
        let request = TransferRequest::new(collection, destination);
        let empty = collection.item_count == 0;
        self.publisher.start_job(index, &collection.name, empty);
        tracing::info!(
            "[{}/{}] Transferring '{}' ({} tracks)",
            index + 1,
            sizes.len(),
            collection.name,
            collection.item_count
        );

        let poller = (!empty).then(|| self.spawn_poller(index, sizes));
        let submitted = self.backend.submit_transfer(&request).await;
        if let Some(poller) = poller {
            poller.stop().await;
        }

        match submitted {
            Ok(summary) => {
                tracing::info!(
                    "'{}': {}/{} tracks added, {} not found",
                    collection.name,
                    summary.items_transferred,
                    summary.items_total,
                    summary.unmatched.count
                );
                JobOutcome::from(summary)
            }
            Err(e) => {
                tracing::warn!("'{}' failed: {}", collection.name, e);
                JobOutcome::Failed {
                    error_message: e.user_message(),
                }
            }
        }
    }

    fn spawn_poller(&self, index: usize, sizes: &[u64]) -> ProgressPoller {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let backend = Arc::clone(&self.backend);
        let publisher = Arc::clone(&self.publisher);
        let sizes = sizes.to_vec();
        let period = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut local = LocalProgress::new();

            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let sample = tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    sample = backend.transfer_progress() => sample,
                };

                match sample {
                    Ok(value) => {
                        if let Some(accepted) = local.accept(value) {
                            publisher.job_progress(
                                index,
                                accepted,
                                global_percent(&sizes, index, accepted),
                            );
                        }
                    }
                    Err(e) => tracing::debug!("Progress poll failed: {}", e),
                }
            }
        });

        ProgressPoller {
            guard: token.drop_guard(),
            handle,
        }
    }
}

/// Poll loop owned by one job.
///
/// The loop is cancelled when the poller is dropped, so it never outlives
/// the job even if `stop` is never reached.
struct ProgressPoller {
    guard: DropGuard,
    handle: JoinHandle<()>,
}

impl ProgressPoller {
    /// Cancel the loop and wait until it is gone.
    async fn stop(self) {
        self.guard.disarm().cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("Progress poller ended abnormally: {}", e);
        }
    }
}

/// Holds the claim of a running run.
///
/// A claim dropped while its run is still `Running` abandons the run.
struct RunClaim {
    publisher: Arc<Publisher>,
    run_id: Uuid,
}

impl RunClaim {
    fn complete(self) {
        self.publisher.complete(self.run_id);
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.publisher.abandon(self.run_id);
    }
}

/// Shared write side of the run snapshot and event stream.
struct Publisher {
    progress_tx: watch::Sender<RunProgress>,
    events_tx: broadcast::Sender<RunEvent>,
}

impl Publisher {
    fn emit(&self, event: RunEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn claim(&self, run_id: Uuid, plan: &TransferPlan) -> bool {
        let claimed = self.progress_tx.send_if_modified(|p| {
            if p.state == RunState::Idle {
                *p = RunProgress::running(run_id, plan);
                true
            } else {
                false
            }
        });
        if claimed {
            self.emit(RunEvent::Started {
                run_id,
                jobs: plan.collections.len(),
            });
        }
        claimed
    }

    fn start_job(&self, index: usize, name: &str, empty: bool) {
        self.progress_tx.send_modify(|p| {
            p.active = Some(index);
            if let Some(job) = p.jobs.get_mut(index) {
                job.status = JobStatus::InProgress;
                job.local_progress = if empty { 100.0 } else { 0.0 };
            }
        });
        self.emit(RunEvent::JobStarted {
            index,
            name: name.to_string(),
        });
    }

    fn job_progress(&self, index: usize, local: f64, global: f64) {
        let mut raised = false;
        self.progress_tx.send_modify(|p| {
            if let Some(job) = p.jobs.get_mut(index) {
                job.local_progress = local;
            }
            if global > p.global_percent {
                p.global_percent = global;
                raised = true;
            }
        });
        if raised {
            self.emit(RunEvent::Progress { percent: global });
        }
    }

    fn raise_percent(&self, percent: f64) {
        let raised = self.progress_tx.send_if_modified(|p| {
            if percent > p.global_percent {
                p.global_percent = percent;
                true
            } else {
                false
            }
        });
        if raised {
            self.emit(RunEvent::Progress { percent });
        }
    }

    fn finish_job(&self, result: &JobResult) {
        self.progress_tx.send_modify(|p| {
            if let Some(job) = p.jobs.get_mut(result.index) {
                job.status = result.outcome.status();
                job.result = Some(result.outcome.clone());
                if result.outcome.is_success() {
                    job.local_progress = 100.0;
                }
            }
            p.active = None;
            p.results.push(result.clone());
        });
        self.emit(RunEvent::JobFinished(result.clone()));
    }

    fn abandon(&self, run_id: Uuid) {
        let abandoned = self.progress_tx.send_if_modified(|p| {
            if p.run_id == Some(run_id) && p.state == RunState::Running {
                *p = RunProgress::default();
                true
            } else {
                false
            }
        });
        if abandoned {
            tracing::warn!("Transfer run {} abandoned before completion", run_id);
            self.emit(RunEvent::Reset);
        }
    }

    fn complete(&self, run_id: Uuid) {
        self.progress_tx.send_modify(|p| {
            p.global_percent = 100.0;
            p.active = None;
            p.state = RunState::Completed;
        });
        self.emit(RunEvent::Completed { run_id });
    }
}
