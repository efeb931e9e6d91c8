//! 跨链网络统计聚合
//!
//! 两个链族的查询并发执行；单链不可用只会让该链以零值呈现并记入 `unavailable`，
//! 只有响应内容违反编码约定时才返回错误。

use std::{sync::Arc, time::Duration};

use parity_scale_codec::{Compact, Decode};
use tracing::warn;

use crate::{
    domain::{AccountChainStats, ChainId, ExtrinsicChainStats, NetworkStats},
    error::{RpcError, StatsError},
    service::connection_manager::ConnectionManager,
    utils::chain_normalizer,
};

/// `Balances.TotalIssuance` 存储键（twox128("Balances") ++ twox128("TotalIssuance")）
pub const TOTAL_ISSUANCE_KEY: &str =
    "0xc2261276cc9d1f8598ea4b6a74b15c2f57c875e4cff74148e4628f264b974c80";
/// `Session.Validators` 存储键
pub const SESSION_VALIDATORS_KEY: &str =
    "0xcec5070d609dd3497f72bde07fc96ba088dcde934c658227ee1dfafcd6e16903";

/// 单链查询结果：None 表示该链本次不可用
type ChainResult<T> = Result<Option<T>, StatsError>;

pub struct StatsAggregator {
    connections: Arc<ConnectionManager>,
}

fn unavailable<T>(chain: ChainId, reason: impl std::fmt::Display) -> ChainResult<T> {
    warn!(chain = %chain, reason = %reason, "Chain unavailable for stats");
    Ok(None)
}

/// 传输层失败视为不可用；响应格式错误上报
fn classify_rpc<T>(chain: ChainId, error: RpcError) -> ChainResult<T> {
    match error {
        RpcError::InvalidResponse(reason) => Err(StatsError::MalformedResponse { chain, reason }),
        other => unavailable(chain, other),
    }
}

async fn within<T, F>(limit: Duration, fut: F) -> Option<Result<T, RpcError>>
where
    F: std::future::Future<Output = Result<T, RpcError>>,
{
    tokio::time::timeout(limit, fut).await.ok()
}

/// SCALE 解码 u128 余额
pub fn decode_total_issuance(raw: Option<Vec<u8>>) -> Result<u128, String> {
    match raw {
        None => Ok(0),
        Some(bytes) => u128::decode(&mut bytes.as_slice()).map_err(|e| e.to_string()),
    }
}

/// 验证人列表只需要 Vec 的 Compact 长度前缀
pub fn decode_validator_count(raw: Option<Vec<u8>>) -> Result<u32, String> {
    match raw {
        None => Ok(0),
        Some(bytes) => Compact::<u32>::decode(&mut bytes.as_slice())
            .map(|c| c.0)
            .map_err(|e| e.to_string()),
    }
}

impl StatsAggregator {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    pub async fn get_network_stats(&self) -> Result<NetworkStats, StatsError> {
        let (account, extrinsic) = tokio::join!(self.account_stats(), self.extrinsic_stats());

        let mut stats = NetworkStats::default();
        match account? {
            Some(s) => stats.account_chain = s,
            None => stats.unavailable.push(ChainId::AccountChain),
        }
        match extrinsic? {
            Some(s) => stats.extrinsic_chain = s,
            None => stats.unavailable.push(ChainId::ExtrinsicChain),
        }
        Ok(stats)
    }

    async fn account_stats(&self) -> ChainResult<AccountChainStats> {
        let chain = ChainId::AccountChain;
        let (conn, session) = self.connections.account_session().await;
        let session = match session {
            Some(s) if conn.status.can_read() => s,
            _ => return unavailable(chain, format!("connection is {:?}", conn.status)),
        };

        let rpc = session.rpc.as_ref();
        let query = async {
            tokio::try_join!(rpc.block_number(), rpc.gas_price(), rpc.chain_id())
        };

        let (block_number, gas_price, chain_id) =
            match within(self.connections.timeouts().query(), query).await {
                Some(Ok(values)) => values,
                Some(Err(e)) => return classify_rpc(chain, e),
                None => return unavailable(chain, "query timed out"),
            };

        Ok(Some(AccountChainStats {
            block_number,
            gas_price: gas_price.to_string(),
            chain_id,
            network_name: chain_normalizer::network_name(chain_id).to_string(),
        }))
    }

    async fn extrinsic_stats(&self) -> ChainResult<ExtrinsicChainStats> {
        let chain = ChainId::ExtrinsicChain;
        let (conn, session) = self.connections.extrinsic_session().await;
        let session = match session {
            Some(s) if conn.status.can_read() => s,
            _ => return unavailable(chain, format!("connection is {:?}", conn.status)),
        };

        let rpc = session.rpc.as_ref();
        let query = async {
            tokio::try_join!(
                rpc.head_number(),
                rpc.storage(TOTAL_ISSUANCE_KEY),
                rpc.storage(SESSION_VALIDATORS_KEY),
                rpc.chain_name()
            )
        };

        let (block_number, issuance, validators, chain_name) =
            match within(self.connections.timeouts().query(), query).await {
                Some(Ok(values)) => values,
                Some(Err(e)) => return classify_rpc(chain, e),
                None => return unavailable(chain, "query timed out"),
            };

        let malformed = |reason: String| StatsError::MalformedResponse { chain, reason };
        Ok(Some(ExtrinsicChainStats {
            block_number,
            total_issuance: decode_total_issuance(issuance).map_err(malformed)?.to_string(),
            validator_count: decode_validator_count(validators).map_err(malformed)?,
            chain_name,
        }))
    }
}
