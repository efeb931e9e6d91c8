//! Extrinsic 链（Substrate）客户端
//!
//! 只使用节点的标准 JSON-RPC 方法；ws/wss 端点按约定映射到同端口的 http/https。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::RpcError,
    infrastructure::{
        jsonrpc::JsonRpcClient,
        rpc_validator::{decode_hex_bytes, parse_hex_u64},
    },
};

/// 运行时版本（签名负载需要 spec/transaction 版本）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

#[async_trait]
pub trait ExtrinsicChainRpc: Send + Sync {
    async fn chain_name(&self) -> Result<String, RpcError>;

    async fn genesis_hash(&self) -> Result<[u8; 32], RpcError>;

    async fn runtime_version(&self) -> Result<RuntimeVersion, RpcError>;

    async fn head_number(&self) -> Result<u64, RpcError>;

    /// 指定高度区块中的全部 extrinsic（SCALE 编码，含长度前缀）；区块不存在时返回 None
    async fn block_extrinsics(&self, number: u64) -> Result<Option<Vec<Vec<u8>>>, RpcError>;

    async fn account_next_index(&self, address: &str) -> Result<u32, RpcError>;

    /// 提交已签名 extrinsic，返回节点给出的哈希（0x hex）
    async fn submit_extrinsic(&self, encoded: &[u8]) -> Result<String, RpcError>;

    /// 原始存储值；键不存在时返回 None
    async fn storage(&self, key: &str) -> Result<Option<Vec<u8>>, RpcError>;
}

/// ws:// → http://，wss:// → https://，其余原样返回
pub fn http_endpoint(endpoint: &str) -> String {
    if let Some(rest) = endpoint.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else {
        endpoint.to_string()
    }
}

fn hash32(value: &str) -> Result<[u8; 32], RpcError> {
    decode_hex_bytes(value)?
        .try_into()
        .map_err(|_| RpcError::InvalidResponse(format!("expected 32-byte hash, got {}", value)))
}

#[derive(Deserialize)]
struct Header {
    number: String,
}

#[derive(Deserialize)]
struct SignedBlock {
    block: BlockBody,
}

#[derive(Deserialize)]
struct BlockBody {
    extrinsics: Vec<String>,
}

/// 基于 HTTP JSON-RPC 的实现
pub struct SubstrateRpcClient {
    rpc: JsonRpcClient,
}

impl SubstrateRpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            rpc: JsonRpcClient::new(http_endpoint(endpoint), timeout),
        }
    }

    async fn block_hash(&self, number: u64) -> Result<Option<String>, RpcError> {
        self.rpc.call("chain_getBlockHash", json!([number])).await
    }
}

#[async_trait]
impl ExtrinsicChainRpc for SubstrateRpcClient {
    async fn chain_name(&self) -> Result<String, RpcError> {
        self.rpc.call("system_chain", json!([])).await
    }

    async fn genesis_hash(&self) -> Result<[u8; 32], RpcError> {
        let hash = self
            .block_hash(0)
            .await?
            .ok_or_else(|| RpcError::InvalidResponse("genesis block hash missing".into()))?;
        hash32(&hash)
    }

    async fn runtime_version(&self) -> Result<RuntimeVersion, RpcError> {
        self.rpc.call("state_getRuntimeVersion", json!([])).await
    }

    async fn head_number(&self) -> Result<u64, RpcError> {
        let header: Header = self.rpc.call("chain_getHeader", json!([])).await?;
        parse_hex_u64(&header.number)
    }

    async fn block_extrinsics(&self, number: u64) -> Result<Option<Vec<Vec<u8>>>, RpcError> {
        let Some(hash) = self.block_hash(number).await? else {
            return Ok(None);
        };

        let block: Option<SignedBlock> = self.rpc.call("chain_getBlock", json!([hash])).await?;
        block
            .map(|b| {
                b.block
                    .extrinsics
                    .iter()
                    .map(|x| decode_hex_bytes(x))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
    }

    async fn account_next_index(&self, address: &str) -> Result<u32, RpcError> {
        self.rpc
            .call("system_accountNextIndex", json!([address]))
            .await
    }

    async fn submit_extrinsic(&self, encoded: &[u8]) -> Result<String, RpcError> {
        let hex_xt = format!("0x{}", hex::encode(encoded));
        self.rpc
            .call("author_submitExtrinsic", json!([hex_xt]))
            .await
    }

    async fn storage(&self, key: &str) -> Result<Option<Vec<u8>>, RpcError> {
        let value: Option<String> = self.rpc.call("state_getStorage", json!([key])).await?;
        value.map(|v| decode_hex_bytes(&v)).transpose()
    }
}
