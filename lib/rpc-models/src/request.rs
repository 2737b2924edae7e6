use error_stack::{IntoReport, ResultExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, Result};

/// An RPC envelope correlated by `uid`. Created by a caller's `send_request`,
/// carried through a queue (and possibly the WebSocket bridge) to a
/// responder, mutated in place and handed back via `respond_to`, then routed
/// into the caller's system inbox by `client_process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub uid: Uuid,
    pub client_process: String,
    #[serde(default)]
    pub service_name: String,
    pub data: serde_json::Value,
}

impl Request {
    /// `client_process` must be non-empty, matching `Field(min_length=1)`.
    pub fn new(
        client_process: impl Into<String>,
        service_name: impl Into<String>,
        data: serde_json::Value,
    ) -> Result<Self> {
        let client_process = client_process.into();
        if client_process.is_empty() {
            return Err(error_stack::report!(ErrorKind::InvalidField))
                .attach_printable("client_process must not be empty");
        }
        Ok(Self {
            uid: Uuid::new_v4(),
            client_process,
            service_name: service_name.into(),
            data,
        })
    }

    pub fn to_bson(&self) -> Result<Vec<u8>> {
        bson::to_vec(self)
            .into_report()
            .attach_printable("could not encode Request as BSON")
            .change_context(ErrorKind::Encode)
    }

    pub fn from_bson(bytes: &[u8]) -> Result<Self> {
        bson::from_slice(bytes)
            .into_report()
            .attach_printable("could not decode Request from BSON")
            .change_context(ErrorKind::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_client_process() {
        let result = Request::new("", "", serde_json::Value::Null);
        assert!(result.is_err());
    }

    #[test]
    fn round_trips_through_bson() {
        let request = Request::new("p1", "", serde_json::json!("REQUEST_TEST_MESSAGE")).unwrap();
        let bytes = request.to_bson().unwrap();
        let decoded = Request::from_bson(&bytes).unwrap();
        assert_eq!(decoded.uid, request.uid);
        assert_eq!(decoded.client_process, request.client_process);
        assert_eq!(decoded.data, request.data);
    }
}
