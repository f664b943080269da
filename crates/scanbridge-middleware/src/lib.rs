//! `scanbridge-middleware` – the link to the motion planner
//!
//! Moves poses out to ROS and goal status back in, without caring what the
//! orchestrator does with either.
//!
//! # Modules
//!
//! - [`transport`] – the [`PoseTransport`] trait every transport implements.
//! - [`rosbridge`] – rosbridge v2 JSON frames and goal-status decoding.
//! - [`client`] – [`RosbridgeClient`], a WebSocket client for
//!   `rosbridge_server` that implements [`PoseTransport`].

pub mod client;
pub mod rosbridge;
pub mod transport;

pub use client::{RosbridgeClient, Topics};
pub use rosbridge::RosbridgeFrame;
pub use transport::PoseTransport;
