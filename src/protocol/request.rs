use std::path::PathBuf;

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use super::transport::TransportError;

/// Direction git-lfs announces for the whole session.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Upload,
    Download,
}

/// Handshake fields. git-lfs always sends them, none of them are required here;
/// a field that is absent or does not decode is left as `None`.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct InitRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub operation: Option<Operation>,
    #[serde(default, deserialize_with = "lenient")]
    pub remote: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub concurrent: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub concurrenttransfers: Option<u64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct DownloadRequest {
    pub oid: String,
    pub size: u64,
    #[serde(default)]
    pub action: Value,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct UploadRequest {
    pub oid: String,
    pub path: PathBuf,
    pub size: u64,
    #[serde(default)]
    pub action: Value,
}

/// One decoded line from git-lfs.
#[derive(Debug, PartialEq)]
pub enum Request {
    Init(InitRequest),
    Download(DownloadRequest),
    Upload(UploadRequest),
    Terminate,
    /// An event name this agent does not serve.
    Unknown { event: String, oid: String },
    /// A known transfer event whose fields could not be decoded.
    Malformed { oid: String, reason: String },
}

impl TryFrom<Value> for Request {
    type Error = TransportError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = value else {
            return Err(TransportError::Protocol(
                "request is not a JSON object".to_string(),
            ));
        };

        let event = match fields.remove("event") {
            Some(Value::String(event)) => event,
            Some(other) => {
                return Err(TransportError::Protocol(format!(
                    "'event' must be a string, got {other}"
                )));
            }
            None => {
                return Err(TransportError::Protocol(
                    "request has no 'event' field".to_string(),
                ));
            }
        };

        match event.as_str() {
            "init" => Ok(Request::Init(serde_json::from_value(Value::Object(fields))?)),
            "terminate" => Ok(Request::Terminate),
            _ => {
                let oid = match fields.get("oid") {
                    Some(Value::String(oid)) => oid.clone(),
                    _ => {
                        return Err(TransportError::Protocol(format!(
                            "'{event}' request has no 'oid'"
                        )));
                    }
                };

                let decoded = match event.as_str() {
                    "download" => {
                        serde_json::from_value(Value::Object(fields)).map(Request::Download)
                    }
                    "upload" => serde_json::from_value(Value::Object(fields)).map(Request::Upload),
                    _ => return Ok(Request::Unknown { event, oid }),
                };

                Ok(decoded.unwrap_or_else(|e| Request::Malformed {
                    oid,
                    reason: format!("invalid '{event}' request: {e}"),
                }))
            }
        }
    }
}

impl TryFrom<&str> for Request {
    type Error = TransportError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let value: Value = serde_json::from_str(line)?;
        value.try_into()
    }
}
