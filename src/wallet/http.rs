//! JSON-RPC over HTTP wallet provider.
//!
//! Talks to a node that holds unlocked accounts (a local anvil or hardhat
//! node, for example). Such a node has no approval prompt and a single fixed
//! chain, so the wallet-only methods are answered locally:
//!
//! - `eth_requestAccounts` falls back to `eth_accounts`
//! - `wallet_switchEthereumChain` is a no-op; the session's `eth_chainId`
//!   check reports a node on another chain as the wrong network
//! - `wallet_addEthereumChain` is unsupported

use super::{ProviderError, WalletProvider, INTERNAL_ERROR, METHOD_NOT_FOUND, UNSUPPORTED_METHOD};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Configuration for [`HttpProvider`].
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// A [`WalletProvider`] backed by a JSON-RPC node.
pub struct HttpProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
    next_id: AtomicU64,
}

impl HttpProvider {
    /// Create a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: HttpProviderConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| crate::Error::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// The endpoint this provider talks to.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.config.rpc_url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("RPC {} -> {}", method, self.config.rpc_url);

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::new(INTERNAL_ERROR, format!("RPC transport: {e}")))?;
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(INTERNAL_ERROR, format!("RPC response: {e}")))?;

        if let Some(error) = body.error {
            return Err(ProviderError::new(error.code, error.message));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_requestAccounts" => match self.call(method, params).await {
                Err(e) if e.code == METHOD_NOT_FOUND => self.call("eth_accounts", json!([])).await,
                other => other,
            },
            "wallet_switchEthereumChain" => {
                debug!("Node chain is fixed; leaving the chain check to eth_chainId");
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => Err(ProviderError::new(
                UNSUPPORTED_METHOD,
                "a JSON-RPC node cannot add chains",
            )),
            _ => self.call(method, params).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;
    use crate::wallet::WalletSession;
    use crate::Error;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Maps a method name to the `result` or `error` member of its reply.
    type Answer = fn(&str) -> Value;

    /// A JSON-RPC node on a local port that answers from an [`Answer`] and
    /// records every method it receives.
    struct CannedNode {
        url: String,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl CannedNode {
        async fn start(answer: Answer) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let seen = Arc::new(Mutex::new(Vec::new()));
            let log = seen.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, answer, log.clone()));
                }
            });
            Self { url, seen }
        }

        fn provider(&self) -> HttpProvider {
            HttpProvider::new(HttpProviderConfig {
                rpc_url: self.url.clone(),
                request_timeout: Duration::from_secs(5),
            })
            .unwrap()
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    async fn serve(mut stream: TcpStream, answer: Answer, seen: Arc<Mutex<Vec<String>>>) {
        while let Some(request) = read_request(&mut stream).await {
            let method = request["method"].as_str().unwrap_or_default().to_string();
            seen.lock().push(method.clone());

            let mut reply = answer(&method);
            reply["jsonrpc"] = json!("2.0");
            reply["id"] = request["id"].clone();
            let body = reply.to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            if stream.write_all(response.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    /// Read one HTTP request and decode its JSON body.
    async fn read_request(stream: &mut TcpStream) -> Option<Value> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let body = &buf[end + 4..];
                if body.len() >= length {
                    return serde_json::from_slice(&body[..length]).ok();
                }
            }
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn method_not_found() -> Value {
        json!({"error": {"code": METHOD_NOT_FOUND, "message": "Method not found"}})
    }

    /// A dev node on chain 31337 that does not know `eth_requestAccounts`.
    fn local_node(method: &str) -> Value {
        match method {
            "eth_accounts" => json!({"result": ["0xABC"]}),
            "eth_chainId" => json!({"result": "0x7a69"}),
            _ => method_not_found(),
        }
    }

    /// A node already on Base Sepolia.
    fn sepolia_node(method: &str) -> Value {
        match method {
            "eth_requestAccounts" => json!({"result": ["0xDEF"]}),
            "eth_chainId" => json!({"result": "0x14a34"}),
            _ => method_not_found(),
        }
    }

    #[test]
    fn test_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_chainId",
            params: json!([]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_chainId", "params": []})
        );
    }

    #[test]
    fn test_response_shapes() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x14a34"}"#).unwrap();
        assert_eq!(ok.result, Some(json!("0x14a34")));
        assert!(ok.error.is_none());

        let err: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let error = err.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found");
    }

    #[tokio::test]
    async fn test_add_chain_is_unsupported() {
        let provider = HttpProvider::new(HttpProviderConfig::default()).unwrap();
        let err = provider
            .request("wallet_addEthereumChain", json!([]))
            .await
            .unwrap_err();
        assert_eq!(err.code, UNSUPPORTED_METHOD);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_internal_error() {
        let provider = HttpProvider::new(HttpProviderConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = provider.request("eth_chainId", json!([])).await.unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn test_request_accounts_falls_back_to_eth_accounts() {
        let node = CannedNode::start(local_node).await;
        let accounts = node
            .provider()
            .request("eth_requestAccounts", json!([]))
            .await
            .unwrap();
        assert_eq!(accounts, json!(["0xABC"]));
        assert_eq!(node.seen(), ["eth_requestAccounts", "eth_accounts"]);
    }

    #[tokio::test]
    async fn test_request_accounts_used_when_supported() {
        let node = CannedNode::start(sepolia_node).await;
        let accounts = node
            .provider()
            .request("eth_requestAccounts", json!([]))
            .await
            .unwrap();
        assert_eq!(accounts, json!(["0xDEF"]));
        assert_eq!(node.seen(), ["eth_requestAccounts"]);
    }

    #[tokio::test]
    async fn test_node_errors_pass_through() {
        let node = CannedNode::start(local_node).await;
        let err = node
            .provider()
            .request("eth_sendTransaction", json!([{}]))
            .await
            .unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert_eq!(err.message, "Method not found");
    }

    #[tokio::test]
    async fn test_switch_chain_does_not_reach_node() {
        let node = CannedNode::start(local_node).await;
        let result = node
            .provider()
            .request("wallet_switchEthereumChain", json!([{"chainId": "0x14a34"}]))
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
        assert!(node.seen().is_empty());
    }

    #[tokio::test]
    async fn test_connect_to_node_on_other_chain_is_wrong_network() {
        let node = CannedNode::start(local_node).await;
        let err = WalletSession::connect(Arc::new(node.provider()), ChainConfig::base_sepolia())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::WrongNetwork {
                expected: 84532,
                actual: Some(31337),
                ..
            }
        ));
        assert!(!node.seen().iter().any(|m| m.starts_with("wallet_")));
    }

    #[tokio::test]
    async fn test_connect_to_node_on_expected_chain() {
        let node = CannedNode::start(sepolia_node).await;
        let session =
            WalletSession::connect(Arc::new(node.provider()), ChainConfig::base_sepolia())
                .await
                .unwrap();
        assert_eq!(session.address(), "0xDEF");
        assert!(session.is_correct_network());
        assert_eq!(node.seen(), ["eth_requestAccounts", "eth_chainId"]);
    }
}
