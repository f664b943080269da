use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of whitespace-separated fields in one pose record.
pub const POSE_FIELD_COUNT: usize = 7;

/// Cartesian position in the planner's base frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// End-effector target pose.
///
/// Serialises to the `geometry_msgs/Pose` JSON shape so it can be dropped
/// straight into a rosbridge `publish` frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Point, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Renders `x y z qx qy qz qw`, the same layout [`Pose::from_str`] accepts.
impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Point { x, y, z } = self.position;
        let Quaternion {
            x: qx,
            y: qy,
            z: qz,
            w: qw,
        } = self.orientation;
        write!(f, "{x} {y} {z} {qx} {qy} {qz} {qw}")
    }
}

/// Parse a single pose record.
///
/// The record must hold exactly [`POSE_FIELD_COUNT`] finite decimals
/// separated by any amount of whitespace. The error is the bare reason; the
/// caller attaches the line number.
impl FromStr for Pose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != POSE_FIELD_COUNT {
            return Err(format!(
                "expected {POSE_FIELD_COUNT} fields, found {}",
                fields.len()
            ));
        }

        let mut values = [0.0_f64; POSE_FIELD_COUNT];
        for (slot, field) in values.iter_mut().zip(&fields) {
            let value: f64 = field
                .parse()
                .map_err(|_| format!("field {field:?} is not a decimal number"))?;
            if !value.is_finite() {
                return Err(format!("field {field:?} is not finite"));
            }
            *slot = value;
        }

        let [x, y, z, qx, qy, qz, qw] = values;
        Ok(Pose::new(
            Point { x, y, z },
            Quaternion {
                x: qx,
                y: qy,
                z: qz,
                w: qw,
            },
        ))
    }
}

/// Outcome code of a motion-planning action goal, numbered as in
/// `actionlib_msgs/GoalStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum GoalStatus {
    /// Accepted, not yet processed by the action server.
    Pending = 0,
    /// Currently being executed.
    Active = 1,
    /// Cancelled after it started executing.
    Preempted = 2,
    /// Reached the target.
    Succeeded = 3,
    /// Execution failed (planning failure, collision, ...).
    Aborted = 4,
    /// Rejected without being processed.
    Rejected = 5,
    /// Cancel requested while executing.
    Preempting = 6,
    /// Cancel requested before execution started.
    Recalling = 7,
    /// Cancelled before execution started.
    Recalled = 8,
    /// The action client lost track of the goal.
    Lost = 9,
}

impl GoalStatus {
    /// `true` while the planner is still working on the goal and a later
    /// poll may report a terminal outcome.
    pub fn is_in_progress(self) -> bool {
        matches!(self, GoalStatus::Pending | GoalStatus::Active)
    }

    /// `true` when the planner will not report anything further for the goal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalStatus::Preempted
                | GoalStatus::Succeeded
                | GoalStatus::Aborted
                | GoalStatus::Rejected
                | GoalStatus::Recalled
                | GoalStatus::Lost
        )
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for GoalStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => GoalStatus::Pending,
            1 => GoalStatus::Active,
            2 => GoalStatus::Preempted,
            3 => GoalStatus::Succeeded,
            4 => GoalStatus::Aborted,
            5 => GoalStatus::Rejected,
            6 => GoalStatus::Preempting,
            7 => GoalStatus::Recalling,
            8 => GoalStatus::Recalled,
            9 => GoalStatus::Lost,
            other => return Err(format!("unknown goal status code {other}")),
        })
    }
}

impl From<GoalStatus> for u8 {
    fn from(status: GoalStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GoalStatus::Pending => "PENDING",
            GoalStatus::Active => "ACTIVE",
            GoalStatus::Preempted => "PREEMPTED",
            GoalStatus::Succeeded => "SUCCEEDED",
            GoalStatus::Aborted => "ABORTED",
            GoalStatus::Rejected => "REJECTED",
            GoalStatus::Preempting => "PREEMPTING",
            GoalStatus::Recalling => "RECALLING",
            GoalStatus::Recalled => "RECALLED",
            GoalStatus::Lost => "LOST",
        };
        write!(f, "{name}={}", self.code())
    }
}

/// Error type shared by every ScanBridge crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanError {
    #[error("Failed to open pose file {path}: {reason}")]
    PoseFileOpen { path: String, reason: String },

    #[error("Malformed pose record on line {line}: {reason}")]
    MalformedPose { line: usize, reason: String },

    #[error("Transport connect failed: {0}")]
    TransportConnect(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
