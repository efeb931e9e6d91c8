//! 账户链网络标识
//!
//! chain_id → 网络名称，供统计快照展示

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// 网络标识配置
#[derive(Debug, Clone)]
pub struct NetworkIdentifier {
    /// 规范名称（小写）
    pub canonical_name: &'static str,
    /// 链ID
    pub chain_id: u64,
    /// 原生代币符号
    pub symbol: &'static str,
}

/// 网络注册表（静态初始化）
static NETWORK_REGISTRY: Lazy<HashMap<u64, NetworkIdentifier>> = Lazy::new(|| {
    let networks = [
        ("mainnet", 1, "ETH"),
        ("sepolia", 11_155_111, "ETH"),
        ("holesky", 17_000, "ETH"),
        ("optimism", 10, "ETH"),
        ("bsc", 56, "BNB"),
        ("polygon", 137, "MATIC"),
        ("amoy", 80_002, "MATIC"),
        ("arbitrum", 42_161, "ETH"),
        ("avalanche", 43_114, "AVAX"),
        ("base", 8_453, "ETH"),
        ("ganache", 1_337, "ETH"),
        ("hardhat", 31_337, "ETH"),
    ];

    networks
        .into_iter()
        .map(|(canonical_name, chain_id, symbol)| {
            (
                chain_id,
                NetworkIdentifier {
                    canonical_name,
                    chain_id,
                    symbol,
                },
            )
        })
        .collect()
});

/// 根据链ID获取网络名称，未知网络返回 "unknown"
pub fn network_name(chain_id: u64) -> &'static str {
    NETWORK_REGISTRY
        .get(&chain_id)
        .map(|n| n.canonical_name)
        .unwrap_or("unknown")
}

/// 获取网络配置
pub fn get_network(chain_id: u64) -> Option<&'static NetworkIdentifier> {
    NETWORK_REGISTRY.get(&chain_id)
}
