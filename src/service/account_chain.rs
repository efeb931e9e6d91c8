//! 账户链（EVM）客户端
//!
//! `AccountChainRpc` 是连接管理器与账户链之间的接缝；默认实现基于 ethers-rs，
//! 私钥存在时通过 `SignerMiddleware` 签名并广播合约调用。

use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{
        Address, Block, BlockNumber, Bytes, Transaction, TransactionReceipt, TransactionRequest,
        H256, U256, U64,
    },
};

use crate::error::RpcError;

/// 账户链只读查询 + 已签名写入
#[async_trait]
pub trait AccountChainRpc: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    async fn block_number(&self) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<U256, RpcError>;

    async fn block_with_txs(&self, number: u64) -> Result<Option<Block<Transaction>>, RpcError>;

    async fn receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, RpcError>;

    /// 签名并广播合约调用，返回交易哈希（不等待上链）
    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, RpcError>;

    /// 配置的签名账户地址
    fn signer_address(&self) -> Option<Address>;
}

fn transport<E: std::fmt::Display>(e: E) -> RpcError {
    RpcError::Transport(e.to_string())
}

/// ethers-rs 实现
#[derive(Clone)]
pub struct EthersAccountClient {
    provider: Provider<Http>,
    signer: Option<SignerMiddleware<Provider<Http>, LocalWallet>>,
}

impl EthersAccountClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, String> {
        let url = reqwest::Url::parse(endpoint).map_err(|e| e.to_string())?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            provider: Provider::new(Http::new_with_client(url, http_client)),
            signer: None,
        })
    }

    /// 挂载签名钱包（钱包的 chain_id 需与链一致）
    pub fn with_wallet(mut self, wallet: LocalWallet) -> Self {
        self.signer = Some(SignerMiddleware::new(self.provider.clone(), wallet));
        self
    }
}

#[async_trait]
impl AccountChainRpc for EthersAccountClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let id = self.provider.get_chainid().await.map_err(transport)?;
        Ok(id.low_u64())
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let number = self.provider.get_block_number().await.map_err(transport)?;
        Ok(number.as_u64())
    }

    async fn gas_price(&self) -> Result<U256, RpcError> {
        self.provider.get_gas_price().await.map_err(transport)
    }

    async fn block_with_txs(&self, number: u64) -> Result<Option<Block<Transaction>>, RpcError> {
        self.provider
            .get_block_with_txs(BlockNumber::Number(U64::from(number)))
            .await
            .map_err(transport)
    }

    async fn receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, RpcError> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(transport)
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, RpcError> {
        let signer = self.signer.as_ref().ok_or(RpcError::NoSigner)?;
        let request = TransactionRequest::new().to(to).data(data);

        let pending = signer
            .send_transaction(request, None)
            .await
            .map_err(transport)?;

        Ok(pending.tx_hash())
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.signer().address())
    }
}
