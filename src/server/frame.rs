use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::PoolError;
use crate::service::{
    ConnectionRelease, ConnectionRequest, ConnectionResponse, Rejected, ReleaseResponse,
    StatsRequest, StatsResponse,
};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const BAD_REQUEST: &str = "bad_request";

// -----------------------------------------------------------------------------
// ----- Request ---------------------------------------------------------------

/// One inbound line, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    GetConnection(ConnectionRequest),
    ReleaseConnection(ConnectionRelease),
    GetPoolStats(StatsRequest),
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn op(&self) -> &'static str {
        match self {
            Request::GetConnection(_) => "get_connection",
            Request::ReleaseConnection(_) => "release_connection",
            Request::GetPoolStats(_) => "get_pool_stats",
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Reply -----------------------------------------------------------------

/// One outbound line. On failure `error` is the transport channel and
/// `body.error` the payload channel; both hold the same message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ReplyBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    Connection(ConnectionResponse),
    Release(ReleaseResponse),
    Stats(StatsResponse),
}

// -----------------------------------------------------------------------------
// ----- Reply: Static ---------------------------------------------------------

impl Reply {
    pub fn from_result<T: Into<ReplyBody>>(result: Result<T, Rejected<T>>) -> Self {
        match result {
            Ok(response) => Self {
                ok: true,
                error: None,
                body: Some(response.into()),
            },
            Err(Rejected { response, error }) => Self {
                ok: false,
                error: Some(WireError::from(&error)),
                body: Some(response.into()),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(WireError {
                code: BAD_REQUEST,
                message: message.into(),
            }),
            body: None,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Reply: Public ---------------------------------------------------------

impl Reply {
    /// Serialized JSON plus the terminating newline.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(Bytes::from(buf))
    }
}

// -----------------------------------------------------------------------------
// ----- Conversions -----------------------------------------------------------

impl From<&PoolError> for WireError {
    fn from(error: &PoolError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<ConnectionResponse> for ReplyBody {
    fn from(v: ConnectionResponse) -> Self {
        ReplyBody::Connection(v)
    }
}

impl From<ReleaseResponse> for ReplyBody {
    fn from(v: ReleaseResponse) -> Self {
        ReplyBody::Release(v)
    }
}

impl From<StatsResponse> for ReplyBody {
    fn from(v: StatsResponse) -> Self {
        ReplyBody::Stats(v)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn parses_each_op() {
        let req = Request::parse(r#"{"op":"get_connection","tenant_id":"t1","dsn":"host=a"}"#)
            .unwrap();
        assert_eq!(
            req,
            Request::GetConnection(ConnectionRequest {
                tenant_id: "t1".into(),
                dsn: "host=a".into(),
            })
        );

        let req = Request::parse(r#"{"op":"release_connection","connection_id":"conn-t1-1"}"#)
            .unwrap();
        assert_eq!(req.op(), "release_connection");

        let req = Request::parse(r#"{"op":"get_pool_stats","tenant_id":"t1"}"#).unwrap();
        assert_eq!(req.op(), "get_pool_stats");
    }

    #[test]
    fn rejects_unknown_op_and_missing_fields() {
        assert!(Request::parse(r#"{"op":"drop_everything"}"#).is_err());
        assert!(Request::parse(r#"{"op":"get_connection","tenant_id":"t1"}"#).is_err());
        assert!(Request::parse("not json").is_err());
    }

    #[test]
    fn failure_reply_fills_both_channels() {
        let reply = Reply::from_result::<StatsResponse>(Err(Rejected::new(
            PoolError::pool_not_found("t1"),
        )));

        let bytes = reply.to_bytes().unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));

        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["ok"], json!(false));
        assert_eq!(v["error"]["code"], json!("pool_not_found"));
        assert_eq!(v["error"]["message"], v["body"]["error"]);
        assert_eq!(v["body"]["total_connections"], json!(0));
    }

    #[test]
    fn success_reply_has_no_error() {
        let reply = Reply::from_result(Ok::<_, Rejected<_>>(ReleaseResponse::released()));
        let v: Value = serde_json::from_slice(&reply.to_bytes().unwrap()).unwrap();
        assert_eq!(v["ok"], json!(true));
        assert!(v.get("error").is_none());
        assert_eq!(v["body"]["success"], json!(true));
        assert_eq!(v["body"]["error"], json!(""));
    }

    #[test]
    fn bad_request_has_no_body() {
        let v: Value =
            serde_json::from_slice(&Reply::bad_request("nope").to_bytes().unwrap()).unwrap();
        assert_eq!(v["error"]["code"], json!(BAD_REQUEST));
        assert!(v.get("body").is_none());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
