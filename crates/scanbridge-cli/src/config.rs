//! Bridge configuration – reads/writes `~/.scanbridge/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scanbridge_middleware::Topics;
use scanbridge_middleware::client::{DEFAULT_MOTION_TOPIC, DEFAULT_STATUS_TOPIC};
use scanbridge_runtime::OrchestratorConfig;
use scanbridge_types::ScanError;
use serde::{Deserialize, Serialize};

/// Persisted bridge configuration.  Every field has a default, so an empty
/// or partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the `rosbridge_server`.
    #[serde(default = "default_rosbridge_url")]
    pub rosbridge_url: String,

    /// Pose list, one `x y z qx qy qz qw` record per line.
    #[serde(default = "default_pose_file")]
    pub pose_file: PathBuf,

    /// Scanner capture executable run after each reached pose.
    #[serde(default = "default_capture_program")]
    pub capture_program: PathBuf,

    /// Arguments passed to the capture executable.
    #[serde(default)]
    pub capture_args: Vec<String>,

    #[serde(default = "default_motion_topic")]
    pub motion_topic: String,

    #[serde(default = "default_status_topic")]
    pub status_topic: String,

    #[serde(default)]
    pub timing: Timing,
}

/// Retry counts and delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub publish_repeats: u32,
    pub publish_interval_ms: u64,
    pub settle_ms: u64,
    pub poll_cycles: u32,
    pub poll_interval_ms: u64,
    pub aborted_wait_ms: u64,
    pub aborted_retries: u32,
    pub active_wait_ms: u64,
    pub max_active_windows: u32,
}

impl Default for Timing {
    fn default() -> Self {
        let d = OrchestratorConfig::default();
        Self {
            publish_repeats: d.publish_repeats,
            publish_interval_ms: millis(d.publish_interval),
            settle_ms: millis(d.settle_delay),
            poll_cycles: d.poll_cycles,
            poll_interval_ms: millis(d.poll_interval),
            aborted_wait_ms: millis(d.aborted_wait),
            aborted_retries: d.aborted_retries,
            active_wait_ms: millis(d.active_wait),
            max_active_windows: d.max_active_windows,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn default_rosbridge_url() -> String {
    "ws://localhost:9090".to_string()
}
fn default_pose_file() -> PathBuf {
    PathBuf::from("pose.txt")
}
fn default_capture_program() -> PathBuf {
    PathBuf::from("simple-capture-sample")
}
fn default_motion_topic() -> String {
    DEFAULT_MOTION_TOPIC.to_string()
}
fn default_status_topic() -> String {
    DEFAULT_STATUS_TOPIC.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rosbridge_url: default_rosbridge_url(),
            pose_file: default_pose_file(),
            capture_program: default_capture_program(),
            capture_args: Vec::new(),
            motion_topic: default_motion_topic(),
            status_topic: default_status_topic(),
            timing: Timing::default(),
        }
    }
}

impl Config {
    pub fn topics(&self) -> Topics {
        Topics {
            motion: self.motion_topic.clone(),
            status: self.status_topic.clone(),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let t = &self.timing;
        OrchestratorConfig {
            publish_repeats: t.publish_repeats,
            publish_interval: Duration::from_millis(t.publish_interval_ms),
            settle_delay: Duration::from_millis(t.settle_ms),
            poll_cycles: t.poll_cycles,
            poll_interval: Duration::from_millis(t.poll_interval_ms),
            aborted_wait: Duration::from_millis(t.aborted_wait_ms),
            aborted_retries: t.aborted_retries,
            active_wait: Duration::from_millis(t.active_wait_ms),
            max_active_windows: t.max_active_windows,
        }
    }
}

/// Return the path to `~/.scanbridge/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".scanbridge").join("config.toml")
}

/// Load the config at `path`.  Returns `None` if the file does not exist.
/// Environment overrides are applied to a loaded file.
pub fn load_from(path: &Path) -> Result<Option<Config>, ScanError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| ScanError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| ScanError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SCANBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SCANBRIDGE_ROSBRIDGE_URL` | `rosbridge_url` |
/// | `SCANBRIDGE_POSE_FILE` | `pose_file` |
/// | `SCANBRIDGE_CAPTURE_PROGRAM` | `capture_program` |
///
/// Empty values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SCANBRIDGE_ROSBRIDGE_URL")
        && !v.is_empty()
    {
        cfg.rosbridge_url = v;
    }
    if let Ok(v) = std::env::var("SCANBRIDGE_POSE_FILE")
        && !v.is_empty()
    {
        cfg.pose_file = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("SCANBRIDGE_CAPTURE_PROGRAM")
        && !v.is_empty()
    {
        cfg.capture_program = PathBuf::from(v);
    }
}

/// Write `cfg` to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ScanError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            ScanError::Config(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| ScanError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| ScanError::Config(format!("failed to write {}: {e}", path.display())))
}
