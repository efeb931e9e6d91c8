//! 交易提交管线
//!
//! 写操作统一流程：前置检查（签名身份、连接状态，均不触网）→ 广播 → 等待确认 → 解码。
//! 广播与确认是两个独立步骤，任一步失败都不会自动重试；
//! 广播之后的失败会在错误中携带交易哈希，调用方据此判断链上状态是否已改变。

use std::sync::Arc;

use ethers::{
    abi::Abi,
    types::{Address, Bytes, TransactionReceipt, H256},
};
use tracing::{debug, error, info, warn};

use crate::{
    domain::ChainId,
    error::{RpcError, SubmitError},
    infrastructure::rpc_validator::validate_hash,
    service::{
        account_chain::AccountChainRpc,
        annotation::AnnotationPayload,
        connection_manager::{AccountSession, ConnectionManager, ExtrinsicSession},
        contracts,
        decoder::{decode_receipt, DecodedEvent, EventSchema, FromEvent, ReceiptContext},
        extrinsic_builder::{build_signed_extrinsic, extrinsic_hash, remark_call},
    },
};

/// 账户链上的目标合约
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractTarget {
    Recorder,
    Governance,
}

impl ContractTarget {
    pub fn abi(&self) -> &'static Abi {
        match self {
            Self::Recorder => contracts::recorder_abi(),
            Self::Governance => contracts::governance_abi(),
        }
    }

    fn address(&self, session: &AccountSession) -> Result<Address, SubmitError> {
        let (address, name) = match self {
            Self::Recorder => (session.recorder_contract, "recorder"),
            Self::Governance => (session.governance_contract, "governance"),
        };
        address.ok_or_else(|| SubmitError::ConnectionUnavailable {
            chain: ChainId::AccountChain,
            reason: format!("{} contract address not configured", name),
        })
    }
}

/// 已广播、尚未确认的 extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastAnnotation {
    pub tx_hash: String,
    pub signer: String,
    /// 广播前的链头，确认时从其下一块开始查找
    pub from_block: u64,
    hash_bytes: [u8; 32],
}

/// 已确认的注解
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedAnnotation {
    pub tx_hash: String,
    pub block_number: u64,
    pub signer: String,
}

fn hash_hex(hash: &[u8]) -> String {
    format!("0x{}", hex::encode(hash))
}

fn rpc_error(chain: ChainId) -> impl Fn(RpcError) -> SubmitError {
    move |source| match source {
        RpcError::NoSigner => SubmitError::NoSigningIdentity { chain },
        source => SubmitError::Rpc {
            chain,
            tx_hash: None,
            source,
        },
    }
}

pub struct SubmissionPipeline {
    connections: Arc<ConnectionManager>,
}

impl SubmissionPipeline {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    async fn writable_account(&self) -> Result<(String, AccountSession), SubmitError> {
        let (conn, session) = self.connections.account_session().await;
        let identity = conn.ensure_writable()?.address.clone();
        let session = session.ok_or_else(|| SubmitError::ConnectionUnavailable {
            chain: ChainId::AccountChain,
            reason: "no active session".into(),
        })?;
        Ok((identity, session))
    }

    /// 广播合约调用，返回交易哈希（此时交易尚未确认）
    pub async fn broadcast_contract_call(
        &self,
        target: ContractTarget,
        call: Bytes,
    ) -> Result<H256, SubmitError> {
        let (signer, session) = self.writable_account().await?;
        let contract = target.address(&session)?;

        let timeouts = self.connections.timeouts();
        let tx_hash = tokio::time::timeout(
            timeouts.submit(),
            session.rpc.send_transaction(contract, call),
        )
        .await
        .map_err(|_| SubmitError::Timeout {
            chain: ChainId::AccountChain,
            stage: "broadcast",
            tx_hash: None,
        })?
        .map_err(rpc_error(ChainId::AccountChain))?;

        info!(
            chain = %ChainId::AccountChain,
            tx_hash = ?tx_hash,
            contract = ?contract,
            signer = %signer,
            "Contract call broadcast"
        );
        Ok(tx_hash)
    }

    /// 轮询回执直到交易被打包；不检查执行状态
    pub async fn await_receipt(&self, tx_hash: H256) -> Result<TransactionReceipt, SubmitError> {
        let hash_str = format!("{:?}", tx_hash);
        self.poll_until_mined(tx_hash)
            .await
            .map_err(|e| e.with_tx_hash(&hash_str))
    }

    async fn poll_until_mined(&self, tx_hash: H256) -> Result<TransactionReceipt, SubmitError> {
        let (conn, session) = self.connections.account_session().await;
        conn.ensure_readable()?;
        let session = session.ok_or_else(|| SubmitError::ConnectionUnavailable {
            chain: ChainId::AccountChain,
            reason: "no active session".into(),
        })?;

        let timeouts = self.connections.timeouts();
        tokio::time::timeout(
            timeouts.submit(),
            poll_receipt(session.rpc.as_ref(), tx_hash, timeouts.poll_interval()),
        )
        .await
        .map_err(|_| SubmitError::Timeout {
            chain: ChainId::AccountChain,
            stage: "receipt",
            tx_hash: None,
        })?
    }

    /// 广播、确认并按事件名解码回执
    pub async fn submit_and_decode(
        &self,
        target: ContractTarget,
        event_name: &str,
        call: Bytes,
    ) -> Result<(DecodedEvent, ReceiptContext), SubmitError> {
        let (_, session) = self.writable_account().await?;
        let schema = EventSchema::new(target.abi(), event_name, Some(target.address(&session)?))
            .map_err(|e| SubmitError::MalformedPayload(e.to_string()))?;

        let tx_hash = self.broadcast_contract_call(target, call).await?;
        let receipt = self.await_receipt(tx_hash).await?;

        let ctx = ReceiptContext {
            tx_hash: format!("{:?}", tx_hash),
            block_number: receipt.block_number.map(|n| n.as_u64()).unwrap_or_default(),
        };

        if receipt.status.map(|s| s.as_u64()) == Some(0) {
            error!(
                chain = %ChainId::AccountChain,
                tx_hash = %ctx.tx_hash,
                block_number = ctx.block_number,
                "Transaction reverted"
            );
            return Err(SubmitError::ChainRejected {
                tx_hash: ctx.tx_hash,
                block_number: Some(ctx.block_number),
            });
        }

        let event = decode_receipt(&receipt, &schema).map_err(|source| {
            warn!(tx_hash = %ctx.tx_hash, error = %source, "Receipt does not match event schema");
            SubmitError::MalformedReceipt {
                tx_hash: ctx.tx_hash.clone(),
                source,
            }
        })?;

        info!(
            chain = %ChainId::AccountChain,
            tx_hash = %ctx.tx_hash,
            block_number = ctx.block_number,
            event = %event.name,
            "Transaction confirmed"
        );
        Ok((event, ctx))
    }

    /// 提交合约调用并解码为领域记录
    pub async fn submit_contract_call<T: FromEvent>(
        &self,
        target: ContractTarget,
        call: Bytes,
    ) -> Result<T, SubmitError> {
        let (event, ctx) = self.submit_and_decode(target, T::EVENT, call).await?;
        T::from_event(&event, &ctx).map_err(|source| SubmitError::MalformedReceipt {
            tx_hash: ctx.tx_hash.clone(),
            source,
        })
    }

    async fn writable_extrinsic(&self) -> Result<ExtrinsicSession, SubmitError> {
        let (conn, session) = self.connections.extrinsic_session().await;
        conn.ensure_writable()?;
        session.ok_or_else(|| SubmitError::ConnectionUnavailable {
            chain: ChainId::ExtrinsicChain,
            reason: "no active session".into(),
        })
    }

    /// 签名并广播注解 extrinsic
    pub async fn broadcast_annotation(
        &self,
        payload: &AnnotationPayload,
    ) -> Result<BroadcastAnnotation, SubmitError> {
        let session = self.writable_extrinsic().await?;
        let signer = session.signer.clone().ok_or(SubmitError::NoSigningIdentity {
            chain: ChainId::ExtrinsicChain,
        })?;
        let params = session.params.clone().ok_or_else(|| SubmitError::ConnectionUnavailable {
            chain: ChainId::ExtrinsicChain,
            reason: "runtime parameters unavailable".into(),
        })?;

        let bytes = payload
            .encode()
            .map_err(|e| SubmitError::MalformedPayload(e.to_string()))?;

        let to_submit_error = rpc_error(ChainId::ExtrinsicChain);
        let timed_out = |stage: &'static str, tx_hash: Option<&str>| SubmitError::Timeout {
            chain: ChainId::ExtrinsicChain,
            stage,
            tx_hash: tx_hash.map(str::to_string),
        };
        // 签名准备与广播共享同一个截止时间
        let deadline = tokio::time::Instant::now() + self.connections.timeouts().submit();

        let prepare = async {
            let from_block = session.rpc.head_number().await.map_err(&to_submit_error)?;
            let nonce = session
                .rpc
                .account_next_index(signer.address())
                .await
                .map_err(&to_submit_error)?;
            Ok::<_, SubmitError>((from_block, nonce))
        };
        let (from_block, nonce) = tokio::time::timeout_at(deadline, prepare)
            .await
            .map_err(|_| timed_out("broadcast", None))??;

        let call = remark_call(&params, &bytes);
        let encoded = build_signed_extrinsic(&signer, &params, nonce, &call);
        let hash_bytes = extrinsic_hash(&encoded);
        let tx_hash = hash_hex(&hash_bytes);
        debug!(nonce, payload_len = bytes.len(), tx_hash = %tx_hash, "Extrinsic signed");

        // 提交请求发出后节点可能已接收，之后的任何失败都带上本地哈希
        let node_hash = tokio::time::timeout_at(deadline, session.rpc.submit_extrinsic(&encoded))
            .await
            .map_err(|_| timed_out("broadcast", Some(&tx_hash)))?
            .map_err(|e| to_submit_error(e).with_tx_hash(&tx_hash))?;

        match validate_hash(&node_hash) {
            Ok(normalized) if normalized == tx_hash => {}
            Ok(normalized) => {
                warn!(local = %tx_hash, node = %normalized, "Node reported a different extrinsic hash")
            }
            Err(e) => warn!(local = %tx_hash, error = %e, "Node reported a malformed extrinsic hash"),
        }

        let pending = BroadcastAnnotation {
            tx_hash,
            signer: signer.address().to_string(),
            from_block,
            hash_bytes,
        };

        info!(
            chain = %ChainId::ExtrinsicChain,
            tx_hash = %pending.tx_hash,
            kind = payload.kind(),
            signer = %pending.signer,
            "Annotation broadcast"
        );
        Ok(pending)
    }

    /// 逐块查找已广播的 extrinsic，返回其所在区块高度
    pub async fn await_inclusion(&self, pending: &BroadcastAnnotation) -> Result<u64, SubmitError> {
        let (conn, session) = self.connections.extrinsic_session().await;
        conn.ensure_readable()?;
        let session = session.ok_or_else(|| SubmitError::ConnectionUnavailable {
            chain: ChainId::ExtrinsicChain,
            reason: "no active session".into(),
        })?;

        let timeouts = self.connections.timeouts();
        let to_submit_error = rpc_error(ChainId::ExtrinsicChain);
        let search = async {
            let mut next = pending.from_block + 1;
            loop {
                let head = session.rpc.head_number().await.map_err(&to_submit_error)?;
                while next <= head {
                    let Some(extrinsics) = session
                        .rpc
                        .block_extrinsics(next)
                        .await
                        .map_err(&to_submit_error)?
                    else {
                        break;
                    };
                    if extrinsics
                        .iter()
                        .any(|xt| extrinsic_hash(xt) == pending.hash_bytes)
                    {
                        return Ok::<_, SubmitError>(next);
                    }
                    next += 1;
                }
                tokio::time::sleep(timeouts.poll_interval()).await;
            }
        };

        let block_number = tokio::time::timeout(timeouts.submit(), search)
            .await
            .map_err(|_| SubmitError::Timeout {
                chain: ChainId::ExtrinsicChain,
                stage: "inclusion",
                tx_hash: None,
            })?
            .map_err(|e| e.with_tx_hash(&pending.tx_hash))?;

        info!(
            chain = %ChainId::ExtrinsicChain,
            tx_hash = %pending.tx_hash,
            block_number,
            "Annotation included"
        );
        Ok(block_number)
    }

    /// 广播注解并等待其被打包
    pub async fn submit_annotation(
        &self,
        payload: &AnnotationPayload,
    ) -> Result<ConfirmedAnnotation, SubmitError> {
        let pending = self.broadcast_annotation(payload).await?;
        let block_number = self.await_inclusion(&pending).await?;

        Ok(ConfirmedAnnotation {
            tx_hash: pending.tx_hash,
            block_number,
            signer: pending.signer,
        })
    }
}

async fn poll_receipt(
    rpc: &dyn AccountChainRpc,
    tx_hash: H256,
    interval: std::time::Duration,
) -> Result<TransactionReceipt, SubmitError> {
    loop {
        match rpc.receipt(tx_hash).await {
            Ok(Some(receipt)) if receipt.block_number.is_some() => return Ok(receipt),
            Ok(_) => tokio::time::sleep(interval).await,
            Err(source) => {
                return Err(SubmitError::Rpc {
                    chain: ChainId::AccountChain,
                    tx_hash: None,
                    source,
                })
            }
        }
    }
}
