use serde::{Deserialize, Serialize};

/// One observed HTTP transaction.
///
/// Identity is structural equality over every field; two `Request`s loaded
/// from different logs are "the same request" only if all of them match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub timestamp_millis: i64,
    pub method: String,
    pub target: String,
    pub status: u16,
    pub request_bytes: u64,
    pub response_bytes: u64,
    pub client: String,
}

impl Request {
    pub fn new(
        timestamp_millis: i64,
        method: impl Into<String>,
        target: impl Into<String>,
        status: u16,
        request_bytes: u64,
        response_bytes: u64,
        client: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_millis,
            method: method.into(),
            target: target.into(),
            status,
            request_bytes,
            response_bytes,
            client: client.into(),
        }
    }
}
