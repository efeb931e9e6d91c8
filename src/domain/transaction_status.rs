//! 交易状态定义
//! 派生交易视图使用的三态状态：success | failed | pending

use std::fmt;

use serde::{Deserialize, Serialize};

/// 交易执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// 已上链且执行成功
    Success,
    /// 已上链但执行失败（revert）
    Failed,
    /// 尚无回执
    Pending,
}

impl TxStatus {
    /// 从回执的 status 字段推导：1 = 成功，0 = 失败，无回执 = 待定
    ///
    /// 拜占庭之前的回执没有 status 字段，已上链即视为成功
    pub fn from_receipt(has_receipt: bool, status: Option<u64>) -> Self {
        match (has_receipt, status) {
            (false, _) => Self::Pending,
            (true, Some(0)) => Self::Failed,
            (true, _) => Self::Success,
        }
    }

    /// 是否为最终状态
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
