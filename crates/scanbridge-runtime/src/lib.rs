//! `scanbridge-runtime` – the scan-trigger loop
//!
//! # Modules
//!
//! - [`pose_queue`] – [`PoseQueue`]: loads and validates the pose file.
//! - [`status_cache`] – [`StatusCache`]: single-slot latest goal status.
//! - [`capture`] – [`CaptureRunner`] and [`ProcessCapture`], which runs the
//!   scanner's capture executable as a child process.
//! - [`orchestrator`] – [`ScanTriggerOrchestrator`]: publishes each pose,
//!   polls for the goal outcome and triggers the capture on success.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber setup with optional OTLP export.

pub mod capture;
pub mod orchestrator;
pub mod pose_queue;
pub mod status_cache;
pub mod telemetry;

pub use capture::{CaptureOutcome, CaptureRunner, ProcessCapture};
pub use orchestrator::{
    OrchestratorConfig, PoseOutcome, PoseReport, RunSummary, ScanTriggerOrchestrator,
};
pub use pose_queue::{PoseQueue, PoseRecord};
pub use status_cache::StatusCache;
pub use telemetry::{TracerProviderGuard, init_tracing};
