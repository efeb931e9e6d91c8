//! 链连接管理
//!
//! 每个链族一个槽位：连接状态快照 + 活跃会话（RPC 句柄、签名身份、合约地址）。
//! 槽位由 RwLock 保护，读取方拿到的是同一时刻一致的状态与会话副本；
//! 握手超时会将链标记为 Degraded 但保留会话，读操作仍可尝试。

use std::{future::Future, sync::Arc, time::Duration};

use ethers::{
    signers::{LocalWallet, Signer},
    types::Address,
    utils::to_checksum,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    config::{AccountChainConfig, Config, ExtrinsicChainConfig, TimeoutConfig},
    domain::{ChainConnection, ChainId, ConnectionStatus, SigningIdentity},
    error::{ConnectError, RpcError},
    service::{
        account_chain::{AccountChainRpc, EthersAccountClient},
        extrinsic_builder::{ExtrinsicParams, ExtrinsicSigner},
        extrinsic_chain::{ExtrinsicChainRpc, SubstrateRpcClient},
    },
};

/// 账户链会话
#[derive(Clone)]
pub struct AccountSession {
    pub rpc: Arc<dyn AccountChainRpc>,
    pub recorder_contract: Option<Address>,
    pub governance_contract: Option<Address>,
    pending_wallet: Option<PendingWallet>,
}

/// 钱包签名需要链的 chain_id，首次握手成功后才挂载
#[derive(Clone)]
struct PendingWallet {
    client: EthersAccountClient,
    wallet: LocalWallet,
}

impl AccountSession {
    /// 已挂载或待挂载的签名地址
    fn signer_address(&self) -> Option<Address> {
        self.rpc
            .signer_address()
            .or_else(|| self.pending_wallet.as_ref().map(|p| p.wallet.address()))
    }

    fn bind_wallet(mut self, chain_id: u64) -> Self {
        if let Some(PendingWallet { client, wallet }) = self.pending_wallet.take() {
            self.rpc = Arc::new(client.with_wallet(wallet.with_chain_id(chain_id)));
        }
        self
    }
}

/// Extrinsic 链会话
#[derive(Clone)]
pub struct ExtrinsicSession {
    pub rpc: Arc<dyn ExtrinsicChainRpc>,
    pub signer: Option<Arc<ExtrinsicSigner>>,
    /// 运行时参数获取成功后才可签名
    pub params: Option<ExtrinsicParams>,
    config: ExtrinsicChainConfig,
}

struct Slot<S> {
    connection: ChainConnection,
    session: Option<S>,
}

impl<S> Slot<S> {
    fn new(chain_id: ChainId) -> Self {
        Self {
            connection: ChainConnection::disconnected(chain_id),
            session: None,
        }
    }
}

/// connect 成功后返回给调用方的句柄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionHandle {
    pub chain_id: ChainId,
    pub endpoint: String,
    pub status: ConnectionStatus,
    pub signing_address: Option<String>,
}

impl From<&ChainConnection> for ConnectionHandle {
    fn from(conn: &ChainConnection) -> Self {
        Self {
            chain_id: conn.chain_id,
            endpoint: conn.endpoint.clone(),
            status: conn.status,
            signing_address: conn.signing_identity.as_ref().map(|s| s.address.clone()),
        }
    }
}

pub struct ConnectionManager {
    account: RwLock<Slot<AccountSession>>,
    extrinsic: RwLock<Slot<ExtrinsicSession>>,
    timeouts: TimeoutConfig,
}

fn validate_endpoint(chain: ChainId, endpoint: &str, schemes: &[&str]) -> Result<(), ConnectError> {
    let invalid = |reason: String| ConnectError::InvalidEndpoint {
        chain,
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!(
            "unsupported scheme {}, expected one of {:?}",
            url.scheme(),
            schemes
        )));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(())
}

fn parse_contract(name: &str, value: Option<&String>) -> Option<Address> {
    let raw = value?;
    match raw.parse::<Address>() {
        Ok(address) => Some(address),
        Err(e) => {
            warn!(contract = name, value = %raw, error = %e, "Ignoring invalid contract address");
            None
        }
    }
}

fn account_session_for(rpc: Arc<dyn AccountChainRpc>, config: &AccountChainConfig) -> AccountSession {
    AccountSession {
        rpc,
        recorder_contract: parse_contract("recorder", config.recorder_contract.as_ref()),
        governance_contract: parse_contract("governance", config.governance_contract.as_ref()),
        pending_wallet: None,
    }
}

impl ConnectionManager {
    pub fn new(timeouts: TimeoutConfig) -> Self {
        Self {
            account: RwLock::new(Slot::new(ChainId::AccountChain)),
            extrinsic: RwLock::new(Slot::new(ChainId::ExtrinsicChain)),
            timeouts,
        }
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// 连接单个链族
    pub async fn connect(
        &self,
        chain_id: ChainId,
        config: &Config,
    ) -> Result<ConnectionHandle, ConnectError> {
        match chain_id {
            ChainId::AccountChain => self.connect_account(&config.account_chain).await,
            ChainId::ExtrinsicChain => self.connect_extrinsic(&config.extrinsic_chain).await,
        }
    }

    /// 并发连接两个链族，互不影响
    pub async fn connect_all(
        &self,
        config: &Config,
    ) -> (
        Result<ConnectionHandle, ConnectError>,
        Result<ConnectionHandle, ConnectError>,
    ) {
        tokio::join!(
            self.connect_account(&config.account_chain),
            self.connect_extrinsic(&config.extrinsic_chain)
        )
    }

    pub async fn status(&self, chain_id: ChainId) -> ChainConnection {
        match chain_id {
            ChainId::AccountChain => self.account.read().await.connection.clone(),
            ChainId::ExtrinsicChain => self.extrinsic.read().await.connection.clone(),
        }
    }

    pub async fn disconnect(&self, chain_id: ChainId) {
        match chain_id {
            ChainId::AccountChain => *self.account.write().await = Slot::new(chain_id),
            ChainId::ExtrinsicChain => *self.extrinsic.write().await = Slot::new(chain_id),
        }
        info!(chain = %chain_id, "Disconnected");
    }

    /// 账户链状态与会话的一致快照
    pub async fn account_session(&self) -> (ChainConnection, Option<AccountSession>) {
        let slot = self.account.read().await;
        (slot.connection.clone(), slot.session.clone())
    }

    /// Extrinsic 链状态与会话的一致快照
    pub async fn extrinsic_session(&self) -> (ChainConnection, Option<ExtrinsicSession>) {
        let slot = self.extrinsic.read().await;
        (slot.connection.clone(), slot.session.clone())
    }

    /// 用已建立的会话重新握手，成功则恢复 Ready
    pub async fn health_check(&self, chain_id: ChainId) -> ConnectionStatus {
        match chain_id {
            ChainId::AccountChain => {
                let (conn, session) = self.account_session().await;
                if let Some(session) = session {
                    let _ = self.handshake_account(session, conn.endpoint).await;
                }
            }
            ChainId::ExtrinsicChain => {
                let (conn, session) = self.extrinsic_session().await;
                if let Some(session) = session {
                    let _ = self
                        .handshake_extrinsic(session.rpc, session.signer, &session.config, conn.endpoint)
                        .await;
                }
            }
        }
        self.status(chain_id).await.status
    }

    async fn connect_account(
        &self,
        config: &AccountChainConfig,
    ) -> Result<ConnectionHandle, ConnectError> {
        let endpoint = config.rpc_url.clone();
        if let Err(e) = validate_endpoint(ChainId::AccountChain, &endpoint, &["http", "https"]) {
            self.mark_failed(ChainId::AccountChain, &endpoint, &e).await;
            return Err(e);
        }

        let client = match EthersAccountClient::new(&endpoint, self.timeouts.query()) {
            Ok(client) => client,
            Err(reason) => {
                let e = ConnectError::InvalidEndpoint {
                    chain: ChainId::AccountChain,
                    endpoint: endpoint.clone(),
                    reason,
                };
                self.mark_failed(ChainId::AccountChain, &endpoint, &e).await;
                return Err(e);
            }
        };

        let wallet = match config.private_key.as_ref() {
            Some(key) => match key.expose().trim_start_matches("0x").parse::<LocalWallet>() {
                Ok(wallet) => Some(wallet),
                Err(e) => {
                    warn!(chain = %ChainId::AccountChain, error = %e, "Invalid private key, continuing read-only");
                    None
                }
            },
            None => None,
        };

        self.mark_connecting(ChainId::AccountChain, &endpoint).await;

        let session = AccountSession {
            pending_wallet: wallet.map(|wallet| PendingWallet {
                client: client.clone(),
                wallet,
            }),
            ..account_session_for(Arc::new(client), config)
        };
        self.handshake_account(session, endpoint).await
    }

    /// 接入外部提供的账户链后端（自定义传输或测试替身），执行握手后注册
    pub async fn attach_account(
        &self,
        rpc: Arc<dyn AccountChainRpc>,
        config: &AccountChainConfig,
    ) -> Result<ConnectionHandle, ConnectError> {
        let endpoint = config.rpc_url.clone();
        self.mark_connecting(ChainId::AccountChain, &endpoint).await;

        self.handshake_account(account_session_for(rpc, config), endpoint)
            .await
    }

    async fn handshake_account(
        &self,
        session: AccountSession,
        endpoint: String,
    ) -> Result<ConnectionHandle, ConnectError> {
        match self
            .with_handshake_timeout(ChainId::AccountChain, &endpoint, session.rpc.chain_id())
            .await
        {
            Ok(chain_id) => {
                info!(chain = %ChainId::AccountChain, endpoint = %endpoint, chain_id, "Handshake succeeded");
                Ok(self.store_account(session.bind_wallet(chain_id), endpoint).await)
            }
            Err(e) => {
                self.degrade_account(session, &endpoint, &e).await;
                Err(e)
            }
        }
    }

    async fn store_account(&self, session: AccountSession, endpoint: String) -> ConnectionHandle {
        let signing_identity = session.signer_address().map(|a| SigningIdentity {
            address: to_checksum(&a, None),
        });
        if signing_identity.is_none() {
            info!(chain = %ChainId::AccountChain, "No signing identity, write operations disabled");
        }

        let mut slot = self.account.write().await;
        slot.connection = ChainConnection {
            chain_id: ChainId::AccountChain,
            endpoint,
            status: ConnectionStatus::Ready,
            signing_identity,
            last_error: None,
        };
        slot.session = Some(session);
        ConnectionHandle::from(&slot.connection)
    }

    async fn degrade_account(
        &self,
        session: AccountSession,
        endpoint: &str,
        error: &ConnectError,
    ) {
        let mut slot = self.account.write().await;
        slot.connection.endpoint = endpoint.to_string();
        slot.connection.status = ConnectionStatus::Degraded;
        slot.connection.signing_identity = session.signer_address().map(|a| SigningIdentity {
            address: to_checksum(&a, None),
        });
        slot.connection.last_error = Some(error.to_string());
        slot.session = Some(session);
        warn!(chain = %ChainId::AccountChain, endpoint = %endpoint, error = %error, "Connection degraded");
    }

    async fn connect_extrinsic(
        &self,
        config: &ExtrinsicChainConfig,
    ) -> Result<ConnectionHandle, ConnectError> {
        let endpoint = config.rpc_url.clone();
        if let Err(e) = validate_endpoint(
            ChainId::ExtrinsicChain,
            &endpoint,
            &["ws", "wss", "http", "https"],
        ) {
            self.mark_failed(ChainId::ExtrinsicChain, &endpoint, &e).await;
            return Err(e);
        }

        let rpc = Arc::new(SubstrateRpcClient::new(&endpoint, self.timeouts.query()));
        self.attach_extrinsic(rpc, config).await
    }

    /// 接入外部提供的 extrinsic 链后端，执行握手与签名初始化后注册
    pub async fn attach_extrinsic(
        &self,
        rpc: Arc<dyn ExtrinsicChainRpc>,
        config: &ExtrinsicChainConfig,
    ) -> Result<ConnectionHandle, ConnectError> {
        let endpoint = config.rpc_url.clone();
        self.mark_connecting(ChainId::ExtrinsicChain, &endpoint).await;

        let signer = match config.seed.as_ref() {
            Some(seed) => match ExtrinsicSigner::from_seed_hex(seed.expose(), config.ss58_prefix) {
                Ok(signer) => Some(Arc::new(signer)),
                Err(e) => {
                    warn!(chain = %ChainId::ExtrinsicChain, error = %e, "Invalid signing seed, continuing read-only");
                    None
                }
            },
            None => None,
        };

        self.handshake_extrinsic(rpc, signer, config, endpoint).await
    }

    async fn handshake_extrinsic(
        &self,
        rpc: Arc<dyn ExtrinsicChainRpc>,
        signer: Option<Arc<ExtrinsicSigner>>,
        config: &ExtrinsicChainConfig,
        endpoint: String,
    ) -> Result<ConnectionHandle, ConnectError> {
        let mut session = ExtrinsicSession {
            rpc: rpc.clone(),
            signer,
            params: None,
            config: config.clone(),
        };

        let chain_name = match self
            .with_handshake_timeout(ChainId::ExtrinsicChain, &endpoint, rpc.chain_name())
            .await
        {
            Ok(name) => name,
            Err(e) => {
                self.degrade_extrinsic(session, &endpoint, &e).await;
                return Err(e);
            }
        };

        // 签名方案初始化：创世哈希 + 运行时版本
        let bootstrap = async { tokio::try_join!(rpc.genesis_hash(), rpc.runtime_version()) };
        let (genesis_hash, runtime) =
            match tokio::time::timeout(self.timeouts.connect(), bootstrap).await {
                Ok(Ok(values)) => values,
                Ok(Err(e)) => {
                    let err = ConnectError::CryptoInitFailed(e.to_string());
                    self.degrade_extrinsic(session, &endpoint, &err).await;
                    return Err(err);
                }
                Err(_) => {
                    let err = ConnectError::CryptoInitFailed(format!(
                        "runtime bootstrap timed out after {}s",
                        self.timeouts.connect_secs
                    ));
                    self.degrade_extrinsic(session, &endpoint, &err).await;
                    return Err(err);
                }
            };

        session.params = Some(ExtrinsicParams {
            pallet_index: config.remark_pallet_index,
            call_index: config.remark_call_index,
            spec_version: runtime.spec_version,
            transaction_version: runtime.transaction_version,
            genesis_hash,
            check_metadata_hash: config.check_metadata_hash,
        });

        info!(
            chain = %ChainId::ExtrinsicChain,
            endpoint = %endpoint,
            chain_name = %chain_name,
            spec_name = %runtime.spec_name,
            spec_version = runtime.spec_version,
            "Handshake succeeded"
        );

        let signing_identity = session.signer.as_ref().map(|s| SigningIdentity {
            address: s.address().to_string(),
        });
        if signing_identity.is_none() {
            info!(chain = %ChainId::ExtrinsicChain, "No signing identity, write operations disabled");
        }

        let mut slot = self.extrinsic.write().await;
        slot.connection = ChainConnection {
            chain_id: ChainId::ExtrinsicChain,
            endpoint,
            status: ConnectionStatus::Ready,
            signing_identity,
            last_error: None,
        };
        slot.session = Some(session);
        Ok(ConnectionHandle::from(&slot.connection))
    }

    async fn degrade_extrinsic(
        &self,
        session: ExtrinsicSession,
        endpoint: &str,
        error: &ConnectError,
    ) {
        let mut slot = self.extrinsic.write().await;
        slot.connection.endpoint = endpoint.to_string();
        slot.connection.status = ConnectionStatus::Degraded;
        slot.connection.signing_identity = session.signer.as_ref().map(|s| SigningIdentity {
            address: s.address().to_string(),
        });
        slot.connection.last_error = Some(error.to_string());
        slot.session = Some(session);
        warn!(chain = %ChainId::ExtrinsicChain, endpoint = %endpoint, error = %error, "Connection degraded");
    }

    async fn mark_connecting(&self, chain_id: ChainId, endpoint: &str) {
        let update = |conn: &mut ChainConnection| {
            // 已就绪的连接在重新握手期间保持原状态
            if conn.status == ConnectionStatus::Disconnected {
                conn.status = ConnectionStatus::Connecting;
            }
            conn.endpoint = endpoint.to_string();
        };
        match chain_id {
            ChainId::AccountChain => update(&mut self.account.write().await.connection),
            ChainId::ExtrinsicChain => update(&mut self.extrinsic.write().await.connection),
        }
    }

    async fn mark_failed(&self, chain_id: ChainId, endpoint: &str, error: &ConnectError) {
        let update = |conn: &mut ChainConnection| {
            conn.endpoint = endpoint.to_string();
            conn.status = ConnectionStatus::Disconnected;
            conn.last_error = Some(error.to_string());
        };
        match chain_id {
            ChainId::AccountChain => update(&mut self.account.write().await.connection),
            ChainId::ExtrinsicChain => update(&mut self.extrinsic.write().await.connection),
        }
        warn!(chain = %chain_id, endpoint = %endpoint, error = %error, "Connection failed");
    }

    async fn with_handshake_timeout<T, F>(
        &self,
        chain: ChainId,
        endpoint: &str,
        fut: F,
    ) -> Result<T, ConnectError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        let limit: Duration = self.timeouts.connect();
        match tokio::time::timeout(limit, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ConnectError::Unreachable {
                chain,
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ConnectError::HandshakeTimeout {
                chain,
                endpoint: endpoint.to_string(),
                timeout_secs: self.timeouts.connect_secs,
            }),
        }
    }
}
