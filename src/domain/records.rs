//! 领域记录
//! 均为调用方拥有的值类型；记录代表已确认的链上事实，返回后不可变

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 和平行动记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeaceActionRecord {
    pub action_id: String,
    pub actor: String,
    pub action_type: String,
    pub description: String,
    /// 十进制字符串，链原生单位
    pub reward: String,
    pub verifier: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: String,
    pub block_number: u64,
}

/// 违规记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub violation_id: String,
    pub violator: String,
    pub violation_type: String,
    pub description: String,
    pub penalty: String,
    pub reporter: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: String,
    pub block_number: u64,
}

/// 资源转移记录
///
/// extrinsic 链上没有独立标识，transfer_id 即确认交易的哈希
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTransfer {
    pub transfer_id: String,
    pub from: String,
    pub to: String,
    pub resource_type: String,
    /// 原样保存的十进制字符串，避免数值转换丢精度
    pub amount: String,
    pub region: String,
    pub purpose: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: String,
    pub block_number: Option<u64>,
}

/// 资源分配更新记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub resource_type: String,
    pub region: String,
    pub allocation: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_hash: String,
    pub block_number: Option<u64>,
}

/// 提案元数据，编码进治理合约 propose 的 description 字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub region: String,
    /// 紧急程度 1-5
    pub urgency_level: u8,
}

/// 治理提案（只提交；状态流转在链上）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceProposal {
    pub proposal_id: String,
    pub proposer: String,
    pub metadata: ProposalMetadata,
    pub targets: Vec<String>,
    /// 十进制字符串
    pub values: Vec<String>,
    /// 0x前缀hex
    pub calldata: Vec<String>,
    pub transaction_hash: String,
    pub block_number: u64,
}

/// 投票方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSupport {
    No,
    Yes,
}

impl VoteSupport {
    /// 治理合约的 support 编码：0 = 反对，1 = 赞成
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::No),
            1 => Some(Self::Yes),
            _ => None,
        }
    }
}

impl From<bool> for VoteSupport {
    fn from(support: bool) -> Self {
        if support {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// 投票记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: String,
    pub voter: String,
    pub support: VoteSupport,
    pub weight: String,
    pub transaction_hash: String,
    pub block_number: u64,
}

/// 裁军验证两步流程的成功结果：注解交易 + 奖励和平行动交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisarmamentVerification {
    pub country: String,
    pub weapon_type: String,
    pub quantity: u64,
    pub annotation_tx_hash: String,
    pub annotation_block: Option<u64>,
    pub reward_action: PeaceActionRecord,
}

impl DisarmamentVerification {
    /// 对外的 tx_id 即注解交易哈希
    pub fn tx_id(&self) -> &str {
        &self.annotation_tx_hash
    }

    pub fn transaction_hashes(&self) -> [&str; 2] {
        [&self.annotation_tx_hash, &self.reward_action.transaction_hash]
    }
}
