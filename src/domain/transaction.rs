//! 派生交易视图
//! 仅由历史扫描与分类层产生，只读，不作为事实来源

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TxStatus;

/// 交易领域分类（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    PeaceAction,
    Violation,
    ResourceTransfer,
    Governance,
    Staking,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PeaceAction => "peace_action",
            Self::Violation => "violation",
            Self::ResourceTransfer => "resource_transfer",
            Self::Governance => "governance",
            Self::Staking => "staking",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 链上交易的统一视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainTransaction {
    pub hash: String,
    pub from: String,
    /// 合约创建交易没有接收方
    pub to: Option<String>,
    /// 十进制字符串（wei）
    pub value: String,
    pub gas_used: Option<u64>,
    pub block_number: u64,
    /// 区块内序号
    pub tx_index: u64,
    pub timestamp: DateTime<Utc>,
    pub status: TxStatus,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
}

impl BlockchainTransaction {
    /// 链规范顺序键
    pub fn order_key(&self) -> (u64, u64) {
        (self.block_number, self.tx_index)
    }
}
