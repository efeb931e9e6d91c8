//! Extrinsic 链注解负载
//!
//! 链上没有这些领域事件的原生逻辑，事件以带 `type` 判别字段的 JSON 编码，
//! 放进通用的 remark 调用中，由链下索引再行解释。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::DecodeError, utils::time_utils};

/// 注解负载（JSON，`type` 字段区分事件种类，其余字段 camelCase）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AnnotationPayload {
    ResourceTransfer {
        from: String,
        to: String,
        resource_type: String,
        amount: String,
        region: String,
        purpose: String,
        timestamp: String,
    },
    ResourceAllocation {
        resource_type: String,
        region: String,
        allocation: String,
        timestamp: String,
    },
    DisarmamentVerification {
        country: String,
        weapon_type: String,
        quantity: u64,
        evidence: String,
        verifier: String,
        timestamp: String,
    },
    PeaceAction {
        actor: String,
        action_type: String,
        description: String,
        reward: String,
        verifier: String,
        timestamp: String,
    },
}

impl AnnotationPayload {
    /// 负载种类（即 JSON 中的 `type` 值）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceTransfer { .. } => "resource_transfer",
            Self::ResourceAllocation { .. } => "resource_allocation",
            Self::DisarmamentVerification { .. } => "disarmament_verification",
            Self::PeaceAction { .. } => "peace_action",
        }
    }

    /// 负载自带的 ISO-8601 时间戳
    pub fn timestamp(&self) -> Result<DateTime<Utc>, DecodeError> {
        let raw = match self {
            Self::ResourceTransfer { timestamp, .. }
            | Self::ResourceAllocation { timestamp, .. }
            | Self::DisarmamentVerification { timestamp, .. }
            | Self::PeaceAction { timestamp, .. } => timestamp,
        };

        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DecodeError::Payload(format!("invalid timestamp {}: {}", raw, e)))
    }

    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        serde_json::to_vec(self).map_err(|e| DecodeError::Payload(e.to_string()))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Payload(e.to_string()))
    }
}

/// 当前时间的负载时间戳
pub fn now_timestamp() -> String {
    time_utils::iso8601(&Utc::now())
}
