//! 账户链交易历史扫描
//!
//! 扫描链头往前 N 个区块，保留发送方或接收方为目标地址的交易。
//! 区块按高度并发拉取（`buffered` 保持输出顺序），回执按交易顺序逐个获取，
//! 结果天然按 (block_number, tx_index) 升序。任一区块或回执获取失败即终止整次扫描。

use std::{future::ready, sync::Arc, time::Duration};

use ethers::{
    types::{Address, Block, Transaction},
    utils::to_checksum,
};
use futures::{
    stream::{self, BoxStream},
    StreamExt, TryStreamExt,
};
use tracing::{debug, info};

use crate::{
    domain::{BlockchainTransaction, ChainId, TxStatus},
    error::ScanError,
    service::{account_chain::AccountChainRpc, classifier::classify_call, connection_manager::ConnectionManager},
    utils::time_utils,
};

pub struct HistoryScanner {
    connections: Arc<ConnectionManager>,
    concurrency: usize,
}

/// 区块内的一笔候选交易
struct Candidate {
    tx: Transaction,
    block_number: u64,
    tx_index: u64,
    timestamp: u64,
}

async fn with_query_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ScanError>
where
    F: std::future::Future<Output = Result<T, ScanError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ScanError::Timeout)?
}

async fn fetch_block(
    rpc: Arc<dyn AccountChainRpc>,
    number: u64,
    limit: Duration,
) -> Result<Block<Transaction>, ScanError> {
    with_query_timeout(limit, async {
        rpc.block_with_txs(number)
            .await?
            .ok_or(ScanError::BlockUnavailable {
                block_number: number,
            })
    })
    .await
}

fn involves(tx: &Transaction, address: Address) -> bool {
    tx.from == address || tx.to == Some(address)
}

fn candidates(block: Block<Transaction>, address: Address) -> Vec<Candidate> {
    let block_number = block.number.map(|n| n.as_u64()).unwrap_or_default();
    let timestamp = block.timestamp.low_u64();

    block
        .transactions
        .into_iter()
        .enumerate()
        .filter(|(_, tx)| involves(tx, address))
        .map(|(index, tx)| Candidate {
            tx_index: tx
                .transaction_index
                .map(|i| i.as_u64())
                .unwrap_or(index as u64),
            tx,
            block_number,
            timestamp,
        })
        .collect()
}

async fn resolve(
    rpc: Arc<dyn AccountChainRpc>,
    candidate: Candidate,
    limit: Duration,
) -> Result<BlockchainTransaction, ScanError> {
    let Candidate {
        tx,
        block_number,
        tx_index,
        timestamp,
    } = candidate;

    let receipt = with_query_timeout(limit, async { Ok(rpc.receipt(tx.hash).await?) }).await?;

    // 已打包交易的回执暂未被节点索引时按 Pending 处理
    let (gas_used, status) = match receipt {
        Some(r) => (
            r.gas_used.map(|g| g.low_u64()),
            TxStatus::from_receipt(true, r.status.map(|s| s.as_u64())),
        ),
        None => (None, TxStatus::Pending),
    };

    Ok(BlockchainTransaction {
        hash: format!("{:?}", tx.hash),
        from: to_checksum(&tx.from, None),
        to: tx.to.map(|to| to_checksum(&to, None)),
        value: tx.value.to_string(),
        gas_used,
        block_number,
        tx_index,
        timestamp: time_utils::from_unix_secs(timestamp),
        status,
        tx_type: classify_call(&tx.input),
    })
}

impl HistoryScanner {
    pub fn new(connections: Arc<ConnectionManager>, concurrency: usize) -> Self {
        Self {
            connections,
            concurrency: concurrency.max(1),
        }
    }

    /// 惰性扫描 `[head - window, head]` 内与地址相关的交易
    ///
    /// 地址校验和链头查询在返回前完成；流在首个错误之后结束。
    pub async fn scan_history(
        &self,
        address: &str,
        window: u64,
    ) -> Result<BoxStream<'static, Result<BlockchainTransaction, ScanError>>, ScanError> {
        let target: Address = address
            .parse()
            .map_err(|_| ScanError::InvalidAddress(address.to_string()))?;

        let (conn, session) = self.connections.account_session().await;
        let rpc = match session {
            Some(session) if conn.status.can_read() => session.rpc,
            _ => {
                return Err(ScanError::ConnectionUnavailable {
                    chain: ChainId::AccountChain,
                    reason: format!("connection is {:?}", conn.status),
                })
            }
        };

        let limit = self.connections.timeouts().query();
        let head = with_query_timeout(limit, async { Ok(rpc.block_number().await?) }).await?;
        let start = head.saturating_sub(window);

        info!(
            address = %address,
            from_block = start,
            to_block = head,
            concurrency = self.concurrency,
            "Scanning transaction history"
        );

        let block_rpc = rpc.clone();
        let blocks = stream::iter(start..=head)
            .map(move |number| fetch_block(block_rpc.clone(), number, limit))
            .buffered(self.concurrency);

        let transactions = blocks
            .map_ok(move |block| {
                let found = candidates(block, target);
                if !found.is_empty() {
                    debug!(count = found.len(), "Matching transactions in block");
                }
                stream::iter(found.into_iter().map(Ok::<_, ScanError>))
            })
            .try_flatten()
            .and_then(move |candidate| resolve(rpc.clone(), candidate, limit));

        // 首个错误之后不再产出任何条目
        let fused = transactions.scan(false, |failed, item| {
            if *failed {
                return ready(None);
            }
            *failed = item.is_err();
            ready(Some(item))
        });

        Ok(fused.boxed())
    }

    /// 收集扫描结果；任何错误都会使整次调用失败
    pub async fn get_transaction_history(
        &self,
        address: &str,
        window: u64,
    ) -> Result<Vec<BlockchainTransaction>, ScanError> {
        let transactions: Vec<_> = self.scan_history(address, window).await?.try_collect().await?;

        info!(address = %address, count = transactions.len(), "Transaction history collected");
        Ok(transactions)
    }
}
