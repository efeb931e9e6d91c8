//! 链连接模型
//! 每个链族一个 ChainConnection，由 ConnectionManager 独占持有

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// 链族标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainId {
    /// 账户模型智能合约链（EVM）
    AccountChain,
    /// 基于 extrinsic 的通用链（Substrate）
    ExtrinsicChain,
}

impl ChainId {
    pub const ALL: [ChainId; 2] = [ChainId::AccountChain, ChainId::ExtrinsicChain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountChain => "account_chain",
            Self::ExtrinsicChain => "extrinsic_chain",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Ready,
    Degraded,
}

impl ConnectionStatus {
    /// 读操作在 Ready 或 Degraded 下均允许
    pub fn can_read(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

/// 签名身份（只保留公开地址，私钥留在链客户端内部）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    pub address: String,
}

/// 单个链族的连接状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConnection {
    pub chain_id: ChainId,
    pub endpoint: String,
    pub status: ConnectionStatus,
    pub signing_identity: Option<SigningIdentity>,
    pub last_error: Option<String>,
}

impl ChainConnection {
    pub fn disconnected(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            endpoint: String::new(),
            status: ConnectionStatus::Disconnected,
            signing_identity: None,
            last_error: None,
        }
    }

    pub fn ensure_readable(&self) -> Result<(), SubmitError> {
        if self.status.can_read() {
            Ok(())
        } else {
            Err(SubmitError::ConnectionUnavailable {
                chain: self.chain_id,
                reason: format!("connection is {:?}", self.status),
            })
        }
    }

    /// 写操作前置检查：先查签名身份（无需网络即可快速失败），再查状态
    pub fn ensure_writable(&self) -> Result<&SigningIdentity, SubmitError> {
        let identity = self
            .signing_identity
            .as_ref()
            .ok_or(SubmitError::NoSigningIdentity {
                chain: self.chain_id,
            })?;

        if self.status != ConnectionStatus::Ready {
            return Err(SubmitError::ConnectionUnavailable {
                chain: self.chain_id,
                reason: self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| format!("connection is {:?}", self.status)),
            });
        }

        Ok(identity)
    }
}
