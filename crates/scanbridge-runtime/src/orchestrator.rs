//! [`ScanTriggerOrchestrator`] – pose delivery and scan triggering.
//!
//! Drives one pose at a time through a fixed cycle:
//!
//! 1. **Publish** – send the pose on the motion topic `publish_repeats`
//!    times, `publish_interval` apart, to ride out best-effort delivery.
//! 2. **Poll** – wait `settle_delay`, then run a poll window: `poll_cycles`
//!    transport polls, `poll_interval` apart, each overwriting the
//!    [`StatusCache`] with whatever status arrived.
//! 3. **Resolve** – on `ABORTED`, wait `aborted_wait` and poll again (up to
//!    `aborted_retries` times).  While the goal is `ACTIVE`/`PENDING`, wait
//!    `active_wait` and poll again (up to `max_active_windows` windows).
//! 4. **Act** – on `SUCCEEDED`, run the capture to completion.  Every other
//!    outcome is logged and the pose is skipped.
//! 5. **Reset** – clear the cache before the next pose.
//!
//! The loop is strictly sequential: a pose, including its capture, is fully
//! resolved before the next pose is published.  Nothing is spawned, and the
//! only timeouts are the bounded retry and poll counts.
//!
//! # Example
//!
//! ```rust,no_run
//! use scanbridge_middleware::{RosbridgeClient, Topics};
//! use scanbridge_runtime::{OrchestratorConfig, PoseQueue, ProcessCapture, ScanTriggerOrchestrator};
//!
//! # async fn demo() -> Result<(), scanbridge_types::ScanError> {
//! let transport = RosbridgeClient::connect("ws://localhost:9090", Topics::default()).await?;
//! let capture = ProcessCapture::new("simple-capture-sample");
//! let mut orchestrator =
//!     ScanTriggerOrchestrator::new(OrchestratorConfig::default(), transport, capture);
//! let summary = orchestrator.run(PoseQueue::load("pose.txt")?).await?;
//! println!("{} captures", summary.captured);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use scanbridge_middleware::PoseTransport;
use scanbridge_types::{GoalStatus, ScanError};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::capture::{CaptureOutcome, CaptureRunner};
use crate::pose_queue::{PoseQueue, PoseRecord};
use crate::status_cache::StatusCache;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Retry counts and delays for [`ScanTriggerOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// How many times each pose is published.
    pub publish_repeats: u32,
    /// Delay after each publish.
    pub publish_interval: Duration,
    /// Delay between the last publish and the first poll window.
    pub settle_delay: Duration,
    /// Number of transport polls in one poll window.
    pub poll_cycles: u32,
    /// Delay after each poll.
    pub poll_interval: Duration,
    /// Delay before re-polling a goal reported as `ABORTED`.
    pub aborted_wait: Duration,
    /// Extra poll windows granted to an `ABORTED` goal.
    pub aborted_retries: u32,
    /// Delay before re-polling a goal that is still `ACTIVE`/`PENDING`.
    pub active_wait: Duration,
    /// Extra poll windows granted to a goal that is still in progress.
    pub max_active_windows: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            publish_repeats: 30,
            publish_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(2000),
            poll_cycles: 10,
            poll_interval: Duration::from_millis(200),
            aborted_wait: Duration::from_millis(4000),
            aborted_retries: 1,
            active_wait: Duration::from_millis(1000),
            max_active_windows: 120,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to a single pose.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoseOutcome {
    /// The arm reached the pose and the capture exited cleanly.
    Captured {
        #[serde(with = "duration_ms")]
        elapsed: Duration,
    },
    /// The arm reached the pose but the capture failed or could not start.
    CaptureFailed {
        exit_code: Option<i32>,
        reason: String,
    },
    /// The goal ended in a terminal status other than `SUCCEEDED`.
    GoalFailed { status: GoalStatus },
    /// The goal had not finished when the poll budget ran out.
    Unresolved { status: GoalStatus },
    /// No goal status arrived at all.
    NoStatus,
}

/// Per-pose entry in a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseReport {
    pub line: usize,
    pub outcome: PoseOutcome,
}

/// Result of one [`ScanTriggerOrchestrator::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub captured: usize,
    pub capture_failed: usize,
    pub skipped: usize,
    /// `true` when a shutdown request left poses unprocessed.
    pub interrupted: bool,
    pub poses: Vec<PoseReport>,
}

impl RunSummary {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            captured: 0,
            capture_failed: 0,
            skipped: 0,
            interrupted: false,
            poses: Vec::new(),
        }
    }

    fn record(&mut self, line: usize, outcome: PoseOutcome) {
        match outcome {
            PoseOutcome::Captured { .. } => self.captured += 1,
            PoseOutcome::CaptureFailed { .. } => self.capture_failed += 1,
            _ => self.skipped += 1,
        }
        self.poses.push(PoseReport { line, outcome });
    }

    /// Pretty-printed JSON report of the run.
    pub fn to_json(&self) -> Result<String, ScanError> {
        serde_json::to_string_pretty(self).map_err(|e| ScanError::Serialization(e.to_string()))
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScanTriggerOrchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Sequences pose delivery and capture triggering.
pub struct ScanTriggerOrchestrator<T, C> {
    config: OrchestratorConfig,
    transport: T,
    capture: C,
    shutdown: Arc<AtomicBool>,
}

impl<T: PoseTransport, C: CaptureRunner> ScanTriggerOrchestrator<T, C> {
    pub fn new(config: OrchestratorConfig, transport: T, capture: C) -> Self {
        Self {
            config,
            transport,
            capture,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a shutdown flag with the caller.
    ///
    /// The flag is checked before each pose; a pose already in progress
    /// always runs to completion.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Give back the transport and capture runner.
    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.capture)
    }

    /// Visit every pose in `poses`, front to back.
    ///
    /// # Errors
    ///
    /// Transport failures are fatal and returned as-is.  Capture failures and
    /// unsuccessful goals are not errors; they are recorded in the returned
    /// [`RunSummary`].
    pub async fn run(&mut self, mut poses: PoseQueue) -> Result<RunSummary, ScanError> {
        let mut summary = RunSummary::new();
        let mut cache = StatusCache::new();
        let total = poses.len();
        info!(run_id = %summary.run_id, poses = total, "scan run started");

        let mut index = 0;
        while let Some(record) = poses.pop_front() {
            if self.shutdown.load(Ordering::SeqCst) {
                warn!(remaining = poses.len() + 1, "shutdown requested; stopping before next pose");
                summary.interrupted = true;
                break;
            }
            index += 1;

            let span = info_span!("pose", index, of = total, line = record.line);
            let outcome = self
                .process_pose(&record, &mut cache)
                .instrument(span)
                .await?;
            summary.record(record.line, outcome);
        }

        summary.finished_at = Utc::now();
        info!(
            run_id = %summary.run_id,
            captured = summary.captured,
            capture_failed = summary.capture_failed,
            skipped = summary.skipped,
            "scan run finished"
        );
        Ok(summary)
    }

    async fn process_pose(
        &mut self,
        record: &PoseRecord,
        cache: &mut StatusCache,
    ) -> Result<PoseOutcome, ScanError> {
        self.publish(record).await?;
        let status = self.resolve_goal(cache).await?;

        let outcome = match status {
            Some(GoalStatus::Succeeded) => {
                info!("arm reached pose; starting capture");
                self.run_capture().await
            }
            Some(GoalStatus::Aborted) => {
                error!(record = %record.raw, "motion plan ABORTED; skipping capture");
                PoseOutcome::GoalFailed {
                    status: GoalStatus::Aborted,
                }
            }
            Some(status) if status.is_in_progress() => {
                warn!(%status, "goal unresolved after poll budget; skipping capture");
                PoseOutcome::Unresolved { status }
            }
            Some(status) if status.is_terminal() => {
                warn!(%status, "motion plan ended without success; skipping capture");
                PoseOutcome::GoalFailed { status }
            }
            Some(status) => {
                warn!(%status, "goal is being cancelled; skipping capture");
                PoseOutcome::Unresolved { status }
            }
            None => {
                warn!("no goal status received; skipping capture");
                PoseOutcome::NoStatus
            }
        };

        cache.reset();
        Ok(outcome)
    }

    async fn publish(&mut self, record: &PoseRecord) -> Result<(), ScanError> {
        debug!(pose = %record.pose, repeats = self.config.publish_repeats, "publishing pose");
        for _ in 0..self.config.publish_repeats {
            self.transport.publish_pose(&record.pose).await?;
            sleep(self.config.publish_interval).await;
        }
        info!("pose published");
        Ok(())
    }

    /// Settle, poll, and keep polling while the goal is aborted (within the
    /// retry budget) or still in progress (within the window budget).
    async fn resolve_goal(
        &mut self,
        cache: &mut StatusCache,
    ) -> Result<Option<GoalStatus>, ScanError> {
        sleep(self.config.settle_delay).await;
        self.poll_window(cache).await?;

        let mut retries = 0;
        while cache.current() == Some(GoalStatus::Aborted) && retries < self.config.aborted_retries
        {
            retries += 1;
            info!(retry = retries, "goal reported ABORTED; re-polling after extended wait");
            sleep(self.config.aborted_wait).await;
            self.poll_window(cache).await?;
        }

        let mut windows = 0;
        while cache.current().is_some_and(GoalStatus::is_in_progress) {
            if windows == self.config.max_active_windows {
                warn!(windows, "goal still in progress after poll budget");
                break;
            }
            windows += 1;
            debug!(window = windows, "waiting for goal to finish executing");
            sleep(self.config.active_wait).await;
            self.poll_window(cache).await?;
        }

        Ok(cache.current())
    }

    async fn poll_window(&mut self, cache: &mut StatusCache) -> Result<(), ScanError> {
        for cycle in 0..self.config.poll_cycles {
            if let Some(status) = self.transport.poll_status().await? {
                debug!(cycle, %status, "goal status received");
                cache.observe(status);
            }
            sleep(self.config.poll_interval).await;
        }
        Ok(())
    }

    async fn run_capture(&mut self) -> PoseOutcome {
        match self.capture.capture().await {
            Ok(CaptureOutcome {
                exit_code: Some(0),
                elapsed,
            }) => {
                info!(elapsed_ms = elapsed.as_millis() as u64, "capture done");
                PoseOutcome::Captured { elapsed }
            }
            Ok(outcome) => {
                warn!(exit_code = ?outcome.exit_code, "capture process exited with failure");
                PoseOutcome::CaptureFailed {
                    exit_code: outcome.exit_code,
                    reason: match outcome.exit_code {
                        Some(code) => format!("exited with code {code}"),
                        None => "terminated by signal".to_string(),
                    },
                }
            }
            Err(e) => {
                error!(error = %e, "capture process could not be started");
                PoseOutcome::CaptureFailed {
                    exit_code: None,
                    reason: e.to_string(),
                }
            }
        }
    }
}
