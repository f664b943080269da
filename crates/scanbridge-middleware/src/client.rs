//! WebSocket client for a `rosbridge_server`.
//!
//! [`RosbridgeClient`] is the production [`PoseTransport`]:
//!
//! 1. **Outbound** – poses are published on the motion topic as
//!    `geometry_msgs/Pose` JSON.
//!
//! 2. **Inbound** – `actionlib_msgs/GoalStatusArray` messages on the status
//!    topic are decoded into [`GoalStatus`] values.
//!
//! The client never spawns a reader task.  Inbound frames sit in the socket
//! until [`PoseTransport::poll_status`] (or a publish) drains them, so the
//! caller decides exactly when new status becomes visible.

use async_trait::async_trait;
use futures_util::{FutureExt, SinkExt, StreamExt};
use scanbridge_types::{GoalStatus, Pose, ScanError};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::rosbridge::{self, GOAL_STATUS_ARRAY_MSG_TYPE, POSE_MSG_TYPE, RosbridgeFrame};
use crate::transport::PoseTransport;

/// Topic on which target poses are published.
pub const DEFAULT_MOTION_TOPIC: &str = "/goal";

/// Topic carrying the planner's goal status array.
pub const DEFAULT_STATUS_TOPIC: &str = "/execute_pose";

/// Topic names used by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub motion: String,
    pub status: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            motion: DEFAULT_MOTION_TOPIC.to_string(),
            status: DEFAULT_STATUS_TOPIC.to_string(),
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// rosbridge-backed [`PoseTransport`].
pub struct RosbridgeClient {
    ws: WsStream,
    topics: Topics,
}

impl RosbridgeClient {
    /// Connect to the `rosbridge_server` at `url`, advertise the motion topic
    /// and subscribe to the status topic.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::TransportConnect`] if the handshake or either
    /// setup frame fails.
    pub async fn connect(url: &str, topics: Topics) -> Result<Self, ScanError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| ScanError::TransportConnect(format!("{url}: {e}")))?;
        let mut client = Self { ws, topics };

        let advertise = RosbridgeFrame::Advertise {
            topic: client.topics.motion.clone(),
            msg_type: POSE_MSG_TYPE.to_string(),
        };
        let subscribe = RosbridgeFrame::Subscribe {
            topic: client.topics.status.clone(),
            msg_type: GOAL_STATUS_ARRAY_MSG_TYPE.to_string(),
        };
        for frame in [advertise, subscribe] {
            client
                .send_frame(&frame)
                .await
                .map_err(|e| ScanError::TransportConnect(format!("{url}: {e}")))?;
        }

        info!(
            url = %url,
            motion_topic = %client.topics.motion,
            status_topic = %client.topics.status,
            "connected to rosbridge"
        );
        Ok(client)
    }

    async fn send_frame(&mut self, frame: &RosbridgeFrame) -> Result<(), ScanError> {
        let json = frame.to_json()?;
        self.ws
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ScanError::Transport(format!("rosbridge send: {e}")))
    }

    /// Read every frame that is already buffered without waiting for more,
    /// returning the newest goal status among them.
    fn drain_pending(&mut self) -> Result<Option<GoalStatus>, ScanError> {
        let mut latest = None;
        while let Some(next) = self.ws.next().now_or_never() {
            match next {
                Some(Ok(Message::Text(text))) => {
                    match rosbridge::decode_status(text.as_str(), &self.topics.status) {
                        Ok(Some(status)) => latest = Some(status),
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "ignoring undecodable rosbridge frame"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ScanError::Transport(
                        "rosbridge closed the connection".to_string(),
                    ));
                }
                Some(Err(e)) => {
                    return Err(ScanError::Transport(format!("rosbridge receive: {e}")));
                }
                Some(Ok(_)) => {}
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl PoseTransport for RosbridgeClient {
    async fn publish_pose(&mut self, pose: &Pose) -> Result<(), ScanError> {
        let frame = RosbridgeFrame::publish_pose(&self.topics.motion, pose)?;
        self.send_frame(&frame).await?;
        if let Some(stale) = self.drain_pending()? {
            debug!(status = %stale, "discarding goal status received while publishing");
        }
        Ok(())
    }

    async fn poll_status(&mut self) -> Result<Option<GoalStatus>, ScanError> {
        self.drain_pending()
    }

    async fn close(&mut self) -> Result<(), ScanError> {
        let unsubscribe = RosbridgeFrame::Unsubscribe {
            topic: self.topics.status.clone(),
        };
        let unadvertise = RosbridgeFrame::Unadvertise {
            topic: self.topics.motion.clone(),
        };
        for frame in [unsubscribe, unadvertise] {
            self.send_frame(&frame).await?;
        }
        self.ws
            .close(None)
            .await
            .map_err(|e| ScanError::Transport(format!("rosbridge close: {e}")))
    }
}
