//! 最小 JSON-RPC over HTTP 客户端：带超时，不做内部重试（重试策略由调用方决定）

use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};

use crate::{error::RpcError, infrastructure::rpc_validator};

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    fn new(method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct JsonRpcClient {
    http_client: reqwest::Client,
    url: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client: client,
            url: url.into(),
        }
    }

    /// 发起一次 JSON-RPC 调用，`null` 结果反序列化为 `Option::None`
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let start = Instant::now();
        let request = JsonRpcRequest::new(method, params);

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(RpcError::Transport(format!(
                "RPC request failed with status {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse JSON: {}", e)))?;

        let result = rpc_validator::validate_rpc_response(&json)?;

        tracing::trace!(
            method = method,
            endpoint = %self.url,
            latency_ms = start.elapsed().as_millis() as u64,
            "json-rpc call completed"
        );

        serde_json::from_value(result.clone()).map_err(|e| {
            RpcError::InvalidResponse(format!("Unexpected result shape for {}: {}", method, e))
        })
    }
}
