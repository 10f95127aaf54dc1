//! Transfer runs.
//!
//! A run moves a fixed list of playlists to one destination service, one
//! playlist at a time:
//!
//! - Each playlist becomes a [`TransferJob`], processed in the order fixed
//!   when the run starts
//! - While a job's submission is outstanding the backend's progress figure
//!   is polled and folded into [`RunProgress::global_percent`]
//! - Every job ends with exactly one [`JobResult`]; a failed job never stops
//!   the run
//!
//! ## Lifecycle
//!
//! `Idle -> Running -> Completed -> Idle`. The last step happens through
//! [`TransferOrchestrator::reset`] once a finished run has been on display
//! long enough.

mod orchestrator;

pub use orchestrator::TransferOrchestrator;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::TransferSummary;
use crate::catalog::{Collection, CollectionId};
use crate::service::ServiceId;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run
    #[default]
    Idle,
    /// Jobs are being processed
    Running,
    /// All jobs processed, results on display
    Completed,
}

/// State of a single job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its turn
    #[default]
    Pending,
    /// Submitted, waiting for the backend
    InProgress,
    /// Backend reported success
    Succeeded,
    /// Submission failed
    Failed,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Playlist was created on the destination
    Succeeded {
        /// Tracks added on the destination
        items_transferred: u64,
        /// Tracks in the source playlist
        items_total: u64,
        /// Tracks without a match
        items_unmatched: u64,
        /// Names of unmatched tracks, when the backend lists them
        #[serde(skip_serializing_if = "Vec::is_empty")]
        unmatched_names: Vec<String>,
    },
    /// Playlist could not be transferred
    Failed {
        /// Server message, or a description of the local failure
        error_message: String,
    },
}

impl JobOutcome {
    /// Whether the job succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Job status corresponding to this outcome.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        match self {
            Self::Succeeded { .. } => JobStatus::Succeeded,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }
}

impl From<TransferSummary> for JobOutcome {
    fn from(summary: TransferSummary) -> Self {
        Self::Succeeded {
            items_transferred: summary.items_transferred,
            items_total: summary.items_total,
            items_unmatched: summary.unmatched.count,
            unmatched_names: summary.unmatched.names,
        }
    }
}

/// Result of one job, in run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    /// Position in the run
    pub index: usize,
    /// Playlist id
    pub collection_id: CollectionId,
    /// Playlist name
    pub name: String,
    /// Outcome
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

/// One playlist inside a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferJob {
    /// Playlist being transferred
    pub collection: Collection,
    /// Position in the run
    pub index: usize,
    /// Current status
    pub status: JobStatus,
    /// Backend progress of this job, 0-100
    pub local_progress: f64,
    /// Outcome once finished
    pub result: Option<JobOutcome>,
}

impl TransferJob {
    fn pending(index: usize, collection: Collection) -> Self {
        Self {
            collection,
            index,
            status: JobStatus::Pending,
            local_progress: 0.0,
            result: None,
        }
    }
}

/// Input of a run: the playlists and where they go.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// Destination service
    pub destination: ServiceId,
    /// Playlists in processing order
    pub collections: Vec<Collection>,
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunProgress {
    /// Current run, if any
    pub run_id: Option<Uuid>,
    /// Lifecycle state
    pub state: RunState,
    /// Destination of the current run
    pub destination: Option<ServiceId>,
    /// Jobs of the current run
    pub jobs: Vec<TransferJob>,
    /// Index of the job being processed
    pub active: Option<usize>,
    /// Size-weighted completion of the run, 0-100
    pub global_percent: f64,
    /// Results so far, in run order
    pub results: Vec<JobResult>,
}

impl RunProgress {
    fn running(run_id: Uuid, plan: &TransferPlan) -> Self {
        Self {
            run_id: Some(run_id),
            state: RunState::Running,
            destination: Some(plan.destination.clone()),
            jobs: plan
                .collections
                .iter()
                .cloned()
                .enumerate()
                .map(|(index, collection)| TransferJob::pending(index, collection))
                .collect(),
            active: None,
            global_percent: 0.0,
            results: Vec::new(),
        }
    }
}

/// Notifications emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run started
    Started {
        /// Run id
        run_id: Uuid,
        /// Number of jobs
        jobs: usize,
    },
    /// A job was submitted
    JobStarted {
        /// Position in the run
        index: usize,
        /// Playlist name
        name: String,
    },
    /// Global progress increased
    Progress {
        /// New global percentage
        percent: f64,
    },
    /// A job finished
    JobFinished(JobResult),
    /// All jobs processed
    Completed {
        /// Run id
        run_id: Uuid,
    },
    /// The finished run was cleared
    Reset,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run id
    pub run_id: Uuid,
    /// Destination service
    pub destination: ServiceId,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last job finished
    pub finished_at: DateTime<Utc>,
    /// One result per job, in run order
    pub results: Vec<JobResult>,
}

impl RunReport {
    /// Number of successful jobs.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Number of failed jobs.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
