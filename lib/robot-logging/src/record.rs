use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};
use error_stack::{IntoReport, ResultExt};

/// The topology's `description:` block, forwarded into every log record so
/// a remote sink can tag which project/subsystem/robot a line came from
/// without the receiving end having to know the topology itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Description {
    pub project: String,
    pub subsystem: String,
    pub robot: String,
}

/// One formatted log line: `level` is always the upper-cased severity name,
/// `logger` is the tracing event's target, and the description fields are
/// stamped onto every record by the installing worker's layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: String,
    pub logger: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub description: Description,
}

impl LogRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .into_report()
            .attach_printable("could not encode log record")
            .change_context(ErrorKind::Codec)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .into_report()
            .attach_printable("could not decode log record")
            .change_context(ErrorKind::Codec)
    }

    /// JSON encoding used for remote sinks; the internal log queue itself
    /// (worker -> aggregator) always uses [`Self::encode`]/[`Self::decode`].
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .into_report()
            .attach_printable("could not JSON-encode log record")
            .change_context(ErrorKind::Codec)
    }
}
