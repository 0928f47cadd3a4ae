//! JSON-RPC 2.0 over HTTP

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Transport and protocol errors
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Node answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Minimal JSON-RPC client bound to one endpoint
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Every request is bounded by `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and deserialize its `result`.
    ///
    /// A missing or `null` result deserializes as JSON `null`, so callers
    /// polling for optional data can ask for an `Option<T>`.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        tracing::trace!(method = %method, id = id, "RPC request");

        let response = self.http.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| RpcError::Malformed(format!("{}: {}", method, e)))
    }
}

/// Parse a hex quantity such as `0x1b4`
pub fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Hex-decode `0x`-prefixed data
pub fn decode_data(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

/// Hex-encode bytes with a `0x` prefix
pub fn encode_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0"), Some(0));
        assert_eq!(parse_quantity("0x1b4"), Some(436));
        assert_eq!(parse_quantity("0x"), None);
        assert_eq!(parse_quantity("12"), None);
    }

    #[test]
    fn test_data_helpers() {
        assert_eq!(encode_data(&[0xde, 0xad]), "0xdead");
        assert_eq!(decode_data("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_data("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_data("0xzz").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        // port 9 (discard) on localhost is almost never listening
        let client = RpcClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result: Result<String, _> = client.request("web3_clientVersion", serde_json::json!([])).await;
        assert!(matches!(result, Err(RpcError::Transport(_))));
    }
}
