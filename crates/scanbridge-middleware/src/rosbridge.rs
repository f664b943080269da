//! rosbridge v2 JSON frames.
//!
//! Only the handful of operations the scan bridge needs are modelled:
//! `advertise` / `unadvertise` for the motion topic, `subscribe` /
//! `unsubscribe` for the status topic, and `publish` in both directions.
//! Every other inbound op decodes to [`RosbridgeFrame::Other`] and is ignored.

use scanbridge_types::{GoalStatus, Pose, ScanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// ROS message type carried on the motion topic.
pub const POSE_MSG_TYPE: &str = "geometry_msgs/Pose";

/// ROS message type carried on the status topic.
pub const GOAL_STATUS_ARRAY_MSG_TYPE: &str = "actionlib_msgs/GoalStatusArray";

/// A single rosbridge protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RosbridgeFrame {
    Advertise {
        topic: String,
        #[serde(rename = "type")]
        msg_type: String,
    },
    Unadvertise {
        topic: String,
    },
    Subscribe {
        topic: String,
        #[serde(rename = "type")]
        msg_type: String,
    },
    Unsubscribe {
        topic: String,
    },
    Publish {
        topic: String,
        msg: Value,
    },
    /// Any op this bridge does not handle (`status`, `service_response`, …).
    #[serde(other)]
    Other,
}

impl RosbridgeFrame {
    /// Serialise the frame to the JSON text sent over the socket.
    pub fn to_json(&self) -> Result<String, ScanError> {
        serde_json::to_string(self).map_err(|e| ScanError::Serialization(e.to_string()))
    }

    /// Build the `publish` frame carrying `pose` on `topic`.
    pub fn publish_pose(topic: &str, pose: &Pose) -> Result<Self, ScanError> {
        let msg = serde_json::to_value(pose).map_err(|e| ScanError::Serialization(e.to_string()))?;
        Ok(RosbridgeFrame::Publish {
            topic: topic.to_string(),
            msg,
        })
    }
}

/// One entry of an `actionlib_msgs/GoalStatusArray`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalStatusEntry {
    pub status: GoalStatus,
    #[serde(default)]
    pub text: String,
}

/// The subset of `actionlib_msgs/GoalStatusArray` the bridge reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GoalStatusArray {
    #[serde(default)]
    pub status_list: Vec<GoalStatusEntry>,
}

/// Decode an inbound text frame and extract the goal status it carries.
///
/// Returns `Ok(None)` for frames on other topics, non-`publish` ops, and
/// status arrays with an empty `status_list`.  Only the first entry of the
/// list is consulted.
///
/// # Errors
///
/// Returns [`ScanError::Serialization`] if the frame is not valid rosbridge
/// JSON or the status array cannot be decoded (including unknown status
/// codes).
pub fn decode_status(text: &str, status_topic: &str) -> Result<Option<GoalStatus>, ScanError> {
    let frame: RosbridgeFrame =
        serde_json::from_str(text).map_err(|e| ScanError::Serialization(e.to_string()))?;

    let RosbridgeFrame::Publish { topic, msg } = frame else {
        return Ok(None);
    };
    if topic != status_topic {
        return Ok(None);
    }

    let array: GoalStatusArray =
        serde_json::from_value(msg).map_err(|e| ScanError::Serialization(e.to_string()))?;
    match array.status_list.first() {
        Some(entry) => Ok(Some(entry.status)),
        None => {
            debug!(topic = %topic, "goal status array carried no entries");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn advertise_frame_has_rosbridge_shape() {
        let frame = RosbridgeFrame::Advertise {
            topic: "/goal".to_string(),
            msg_type: POSE_MSG_TYPE.to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "op": "advertise", "topic": "/goal", "type": "geometry_msgs/Pose" })
        );
    }

    #[test]
    fn subscribe_frame_has_rosbridge_shape() {
        let frame = RosbridgeFrame::Subscribe {
            topic: "/execute_pose".to_string(),
            msg_type: GOAL_STATUS_ARRAY_MSG_TYPE.to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["op"], "subscribe");
        assert_eq!(value["type"], "actionlib_msgs/GoalStatusArray");
    }

    #[test]
    fn publish_pose_frame_contains_pose_fields() {
        let pose: Pose = "1 2 3 0 0 0.7071 0.7071".parse().unwrap();
        let frame = RosbridgeFrame::publish_pose("/goal", &pose).unwrap();
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["op"], "publish");
        assert_eq!(value["topic"], "/goal");
        assert_eq!(value["msg"]["position"]["y"], 2.0);
        assert_eq!(value["msg"]["orientation"]["z"], 0.7071);
    }

    #[test]
    fn decode_status_reads_first_entry() {
        let text = r#"{"op":"publish","topic":"/execute_pose","msg":{
            "header":{"seq":7,"frame_id":""},
            "status_list":[
                {"goal_id":{"id":"g1"},"status":3,"text":"done"},
                {"goal_id":{"id":"g0"},"status":4,"text":"old"}
            ]}}"#;
        assert_eq!(
            decode_status(text, "/execute_pose").unwrap(),
            Some(GoalStatus::Succeeded)
        );
    }

    #[test]
    fn decode_status_ignores_other_topics_and_ops() {
        let other_topic = r#"{"op":"publish","topic":"/joint_states","msg":{"status_list":[{"status":3}]}}"#;
        assert_eq!(decode_status(other_topic, "/execute_pose").unwrap(), None);

        let status_op = r#"{"op":"status","level":"error","msg":"unknown topic"}"#;
        assert_eq!(decode_status(status_op, "/execute_pose").unwrap(), None);
    }

    #[test]
    fn decode_status_empty_list_is_none() {
        let text = r#"{"op":"publish","topic":"/execute_pose","msg":{"status_list":[]}}"#;
        assert_eq!(decode_status(text, "/execute_pose").unwrap(), None);
    }

    #[test]
    fn decode_status_rejects_garbage_and_unknown_codes() {
        assert!(decode_status("not json", "/execute_pose").is_err());

        let bad_code = r#"{"op":"publish","topic":"/execute_pose","msg":{"status_list":[{"status":42}]}}"#;
        assert!(matches!(
            decode_status(bad_code, "/execute_pose"),
            Err(ScanError::Serialization(_))
        ));
    }
}
