//! The transport seam.
//!
//! The orchestrator never speaks rosbridge directly.  It drives a
//! [`PoseTransport`], which the real deployment backs with
//! [`RosbridgeClient`][crate::client::RosbridgeClient] and tests back with a
//! scripted stub.

use async_trait::async_trait;
use scanbridge_types::{GoalStatus, Pose, ScanError};

/// Publish/subscribe link to the motion-planning node.
///
/// # Contract
///
/// * `publish_pose` – sends one pose on the motion topic.  Any goal status
///   that arrives while publishing predates the pose and is discarded.
///
/// * `poll_status` – pumps the transport once without blocking and returns
///   the newest goal status received since the previous call, or `None` when
///   nothing arrived.
#[async_trait]
pub trait PoseTransport: Send {
    /// Send `pose` on the motion topic.
    async fn publish_pose(&mut self, pose: &Pose) -> Result<(), ScanError>;

    /// Pump inbound traffic once and return the newest goal status, if any.
    async fn poll_status(&mut self) -> Result<Option<GoalStatus>, ScanError>;

    /// Tear down subscriptions and close the link.
    async fn close(&mut self) -> Result<(), ScanError> {
        Ok(())
    }
}
