use chrono::{DateTime, Utc};
use error_stack::{IntoReport, ResultExt};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

/// Carried from a worker's watcher outbox to the heartbeat sender, then on to
/// the remote gateway (or direct broker, in-cluster) under the `"heartbeat"`
/// exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub robot_name: String,
    pub process_name: String,
    pub process_class: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl HeartbeatMessage {
    pub fn now(
        robot_name: impl Into<String>,
        process_name: impl Into<String>,
        process_class: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            robot_name: robot_name.into(),
            process_name: process_name.into(),
            process_class: process_class.into(),
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn to_bson(&self) -> Result<Vec<u8>> {
        bson::to_vec(self)
            .into_report()
            .attach_printable("could not encode HeartbeatMessage as BSON")
            .change_context(ErrorKind::Encode)
    }

    pub fn from_bson(bytes: &[u8]) -> Result<Self> {
        bson::from_slice(bytes)
            .into_report()
            .attach_printable("could not decode HeartbeatMessage from BSON")
            .change_context(ErrorKind::Decode)
    }
}
