//! 交易分类
//!
//! 按固定优先级对负载字节做子串匹配，首个命中即返回：
//! `peace` → `violation` → `resource` → `vote` → `stake`，均未命中时归为和平行动。
//! 优先级与默认值是对外约定的一部分，UI 依赖它做分类展示。

use crate::domain::TransactionType;

/// 标记子串及其类型，按优先级排列
pub const MARKERS: [(&str, TransactionType); 5] = [
    ("peace", TransactionType::PeaceAction),
    ("violation", TransactionType::Violation),
    ("resource", TransactionType::ResourceTransfer),
    ("vote", TransactionType::Governance),
    ("stake", TransactionType::Staking),
];

/// 未命中任何标记时的类型
pub const DEFAULT_TRANSACTION_TYPE: TransactionType = TransactionType::PeaceAction;

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// 对不透明负载分类（纯函数）
///
/// 字节级匹配，对合法 UTF-8 与其解码结果等价
pub fn classify(payload: &[u8]) -> TransactionType {
    MARKERS
        .iter()
        .find(|(marker, _)| contains(payload, marker.as_bytes()))
        .map(|(_, tx_type)| *tx_type)
        .unwrap_or(DEFAULT_TRANSACTION_TYPE)
}

/// 账户链调用数据分类：已知合约函数按选择器识别，否则回退到标记匹配
pub fn classify_call(input: &[u8]) -> TransactionType {
    crate::service::contracts::selector_type(input).unwrap_or_else(|| classify(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_marker() {
        assert_eq!(classify(b"record peace"), TransactionType::PeaceAction);
        assert_eq!(classify(b"violation:ceasefire"), TransactionType::Violation);
        assert_eq!(classify(b"{\"type\":\"resource_transfer\"}"), TransactionType::ResourceTransfer);
        assert_eq!(classify(b"cast vote 1"), TransactionType::Governance);
        assert_eq!(classify(b"stake 100"), TransactionType::Staking);
    }

    #[test]
    fn test_priority_order_beats_position() {
        // "violation" 出现在 "peace" 之前，仍按优先级判为和平行动
        assert_eq!(classify(b"violation then peace"), TransactionType::PeaceAction);
        assert_eq!(classify(b"vote on resource"), TransactionType::ResourceTransfer);
        assert_eq!(classify(b"stake and vote"), TransactionType::Governance);
    }

    #[test]
    fn test_default_is_peace_action() {
        assert_eq!(classify(b""), TransactionType::PeaceAction);
        assert_eq!(classify(&[0xff, 0x00, 0x13]), TransactionType::PeaceAction);
        assert_eq!(
            classify(b"{\"type\":\"disarmament_verification\"}"),
            TransactionType::PeaceAction
        );
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        assert_eq!(classify(b"VIOLATION"), TransactionType::PeaceAction);
    }

    #[test]
    fn test_non_utf8_payload_still_matched() {
        let mut payload = vec![0xff, 0xfe];
        payload.extend_from_slice(b"stake");
        assert_eq!(classify(&payload), TransactionType::Staking);
    }
}
