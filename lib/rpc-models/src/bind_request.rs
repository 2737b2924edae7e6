use bson::{Binary, Bson};
use error_stack::{IntoReport, ResultExt};

use crate::{
    error::{ErrorKind, Result},
    request::Request,
};

/// What the caller hands `BindRequest::new` to build the `request` field:
/// either a `Request` directly, or BSON bytes a previous `Request::to_bson`
/// call already produced. Both normalize to a concrete `Request` at
/// construction, so nothing downstream ever sees raw bytes either.
pub enum RequestSource {
    Value(Request),
    PreEncoded(Vec<u8>),
}

/// A queue-bind envelope: a routing key plus a nested `Request`, used when
/// the remote exchange is a topic exchange and routing requires an
/// explicit key.
pub struct BindRequest {
    pub bind_key: String,
    pub request: Request,
}

impl BindRequest {
    pub fn new(bind_key: impl Into<String>, request: RequestSource) -> Result<Self> {
        let request = match request {
            RequestSource::Value(request) => request,
            RequestSource::PreEncoded(bytes) => Request::from_bson(&bytes)?,
        };
        Ok(Self {
            bind_key: bind_key.into(),
            request,
        })
    }

    pub fn to_bson(&self) -> Result<Vec<u8>> {
        let request_bson = bson::to_bson(&self.request)
            .into_report()
            .attach_printable("could not encode nested Request as BSON")
            .change_context(ErrorKind::Encode)?;

        let mut doc = bson::Document::new();
        doc.insert("bind_key", Bson::String(self.bind_key.clone()));
        doc.insert("request", request_bson);

        bson::to_vec(&doc)
            .into_report()
            .attach_printable("could not encode BindRequest as BSON")
            .change_context(ErrorKind::Encode)
    }

    pub fn from_bson(bytes: &[u8]) -> Result<Self> {
        let doc: bson::Document = bson::from_slice(bytes)
            .into_report()
            .attach_printable("could not decode BindRequest from BSON")
            .change_context(ErrorKind::Decode)?;

        let bind_key = doc
            .get_str("bind_key")
            .into_report()
            .attach_printable("BindRequest document missing bind_key")
            .change_context(ErrorKind::Decode)?
            .to_owned();

        let request_value = doc
            .get("request")
            .ok_or_else(|| error_stack::report!(ErrorKind::Decode))
            .attach_printable("BindRequest document missing request")?;

        let request = match request_value {
            Bson::Binary(Binary { bytes, .. }) => Request::from_bson(bytes)?,
            other => bson::from_bson(other.clone())
                .into_report()
                .attach_printable("could not decode nested Request document")
                .change_context(ErrorKind::Decode)?,
        };

        Ok(Self { bind_key, request })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_fresh_request() {
        let request = Request::new("p1", "", serde_json::json!({"k": "v"})).unwrap();
        let uid = request.uid;
        let bind = BindRequest::new("messages.*", RequestSource::Value(request)).unwrap();
        let bytes = bind.to_bson().unwrap();
        let decoded = BindRequest::from_bson(&bytes).unwrap();
        assert_eq!(decoded.bind_key, "messages.*");
        assert_eq!(decoded.request.uid, uid);
    }

    #[test]
    fn round_trips_a_pre_encoded_request() {
        let request = Request::new("p1", "", serde_json::json!(1)).unwrap();
        let pre_encoded = request.to_bson().unwrap();
        let bind = BindRequest::new("messages.*", RequestSource::PreEncoded(pre_encoded)).unwrap();
        assert_eq!(bind.request.uid, request.uid);
    }
}
