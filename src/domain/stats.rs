//! 跨链统计快照

use serde::{Deserialize, Serialize};

use super::ChainId;

/// 账户链统计，不可用时各字段保持零值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChainStats {
    pub block_number: u64,
    /// 十进制字符串（wei）
    pub gas_price: String,
    pub chain_id: u64,
    pub network_name: String,
}

/// Extrinsic 链统计，不可用时各字段保持零值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrinsicChainStats {
    pub block_number: u64,
    /// 十进制字符串（planck）
    pub total_issuance: String,
    pub validator_count: u32,
    pub chain_name: String,
}

// 十进制字符串字段的零值是 "0" 而不是空串
impl Default for AccountChainStats {
    fn default() -> Self {
        Self {
            block_number: 0,
            gas_price: "0".to_string(),
            chain_id: 0,
            network_name: String::new(),
        }
    }
}

impl Default for ExtrinsicChainStats {
    fn default() -> Self {
        Self {
            block_number: 0,
            total_issuance: "0".to_string(),
            validator_count: 0,
            chain_name: String::new(),
        }
    }
}

/// 合并后的网络统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub account_chain: AccountChainStats,
    pub extrinsic_chain: ExtrinsicChainStats,
    /// 本次查询中不可用（以零值呈现）的链
    pub unavailable: Vec<ChainId>,
}

impl NetworkStats {
    pub fn is_partial(&self) -> bool {
        !self.unavailable.is_empty()
    }
}
