//! 统一错误类型
//! 每个失败族一个枚举，code() 提供稳定的 snake_case 错误码供上层 UI/API 使用

use serde::Serialize;

use crate::domain::ChainId;

/// 错误大类（与调用方约定的分类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 端点不可达、握手/密码学初始化失败
    Connection,
    /// 写操作缺少签名身份
    Authorization,
    /// 交易已上链但被链标记为失败
    ChainRejected,
    /// 回执/负载不满足解码约定
    Malformed,
    /// 超时
    Timeout,
    /// 调用参数错误
    InvalidArgument,
}

/// 底层 JSON-RPC 错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
    #[error("no signing identity configured")]
    NoSigner,
}

/// 连接错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid endpoint for {chain}: {endpoint} ({reason})")]
    InvalidEndpoint {
        chain: ChainId,
        endpoint: String,
        reason: String,
    },
    #[error("handshake with {chain} at {endpoint} timed out after {timeout_secs}s")]
    HandshakeTimeout {
        chain: ChainId,
        endpoint: String,
        timeout_secs: u64,
    },
    #[error("{chain} at {endpoint} unreachable: {reason}")]
    Unreachable {
        chain: ChainId,
        endpoint: String,
        reason: String,
    },
    #[error("signature scheme bootstrap failed: {0}")]
    CryptoInitFailed(String),
}

impl ConnectError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::HandshakeTimeout { .. } => "handshake_timeout",
            Self::Unreachable { .. } => "endpoint_unreachable",
            Self::CryptoInitFailed(_) => "crypto_init_failed",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HandshakeTimeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Connection,
        }
    }
}

/// 回执/事件解码错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("event {event} not found in receipt")]
    MissingEvent { event: String },
    #[error("event {event} is missing field {field}")]
    MissingField { event: String, field: String },
    #[error("field {field} of event {event} is not a {expected}")]
    FieldType {
        event: String,
        field: String,
        expected: &'static str,
    },
    #[error("log could not be decoded as {event}: {reason}")]
    InvalidLog { event: String, reason: String },
    #[error("malformed annotation payload: {0}")]
    Payload(String),
}

/// 提交/确认错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("{chain} unavailable: {reason}")]
    ConnectionUnavailable { chain: ChainId, reason: String },
    #[error("no signing identity configured for {chain}")]
    NoSigningIdentity { chain: ChainId },
    #[error("transaction {tx_hash} rejected by chain (block {block_number:?})")]
    ChainRejected {
        tx_hash: String,
        block_number: Option<u64>,
    },
    #[error("malformed receipt for {tx_hash}: {source}")]
    MalformedReceipt {
        tx_hash: String,
        #[source]
        source: DecodeError,
    },
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("{chain} {stage} timed out")]
    Timeout {
        chain: ChainId,
        stage: &'static str,
        tx_hash: Option<String>,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{chain} rpc failure: {source}")]
    Rpc {
        chain: ChainId,
        tx_hash: Option<String>,
        #[source]
        source: RpcError,
    },
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionUnavailable { .. } => "connection_unavailable",
            Self::NoSigningIdentity { .. } => "no_signing_identity",
            Self::ChainRejected { .. } => "chain_rejected",
            Self::MalformedReceipt { .. } => "malformed_receipt",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Timeout { .. } => "timeout",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Rpc { .. } => "rpc_error",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionUnavailable { .. } | Self::Rpc { .. } => ErrorKind::Connection,
            Self::NoSigningIdentity { .. } => ErrorKind::Authorization,
            Self::ChainRejected { .. } => ErrorKind::ChainRejected,
            Self::MalformedReceipt { .. } | Self::MalformedPayload(_) => ErrorKind::Malformed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// 已广播交易的哈希（若错误发生在广播之后）
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Self::ChainRejected { tx_hash, .. } | Self::MalformedReceipt { tx_hash, .. } => {
                Some(tx_hash)
            }
            Self::Timeout { tx_hash, .. } | Self::Rpc { tx_hash, .. } => tx_hash.as_deref(),
            _ => None,
        }
    }

    /// 为广播之后发生的错误附上交易哈希
    pub fn with_tx_hash(self, hash: &str) -> Self {
        match self {
            Self::Timeout { chain, stage, .. } => Self::Timeout {
                chain,
                stage,
                tx_hash: Some(hash.to_string()),
            },
            Self::Rpc { chain, source, .. } => Self::Rpc {
                chain,
                tx_hash: Some(hash.to_string()),
                source,
            },
            other => other,
        }
    }
}

/// 历史扫描错误：任何单个区块/回执获取失败都会终止整次扫描
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("{chain} unavailable: {reason}")]
    ConnectionUnavailable { chain: ChainId, reason: String },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("block {block_number} unavailable")]
    BlockUnavailable { block_number: u64 },
    #[error("receipt for {tx_hash} unavailable")]
    ReceiptUnavailable { tx_hash: String },
    #[error("query timed out")]
    Timeout,
    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcError),
}

impl ScanError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionUnavailable { .. } => "connection_unavailable",
            Self::InvalidAddress(_) => "invalid_address",
            Self::BlockUnavailable { .. } => "block_unavailable",
            Self::ReceiptUnavailable { .. } => "receipt_unavailable",
            Self::Timeout => "timeout",
            Self::Rpc(_) => "rpc_error",
        }
    }
}

/// 统计聚合错误：仅在响应解码违反约定时出现，单链不可用不会报错
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("malformed {chain} stats response: {reason}")]
    MalformedResponse { chain: ChainId, reason: String },
}

/// 裁军验证两步流程的错误，区分失败发生在哪一步
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisarmamentError {
    #[error("disarmament annotation failed: {0}")]
    AnnotationFailed(#[source] SubmitError),
    /// 注解已广播并确认，但奖励记录失败；链上状态已部分改变
    #[error("disarmament annotation {annotation_tx_hash} recorded but reward submission failed: {source}")]
    RewardFailed {
        annotation_tx_hash: String,
        #[source]
        source: SubmitError,
    },
}

impl DisarmamentError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AnnotationFailed(_) => "disarmament_annotation_failed",
            Self::RewardFailed { .. } => "disarmament_reward_failed",
        }
    }

    /// 链上状态是否可能已被改变
    pub fn chain_state_changed(&self) -> bool {
        match self {
            Self::AnnotationFailed(e) => e.tx_hash().is_some(),
            Self::RewardFailed { .. } => true,
        }
    }
}
