//! 测试辅助模块
//! 内存链替身：账户链按调用的函数选择器生成对应合约事件，extrinsic 链每次提交出一个新块

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use ethers::{
    abi::{Event, Token},
    types::{
        Address, Block, Bytes, Log, Transaction, TransactionReceipt, H256, U256, U64,
    },
    utils::keccak256,
};
use parity_scale_codec::{Decode, Encode};
use peacechain::{
    config::{Config, Secret},
    error::RpcError,
    service::{
        annotation::AnnotationPayload,
        contracts,
        extrinsic_builder::extrinsic_hash,
        network_stats::{SESSION_VALIDATORS_KEY, TOTAL_ISSUANCE_KEY},
        AccountChainRpc, ExtrinsicChainRpc, PeaceChainClient, RuntimeVersion,
    },
};

pub const RECORDER: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const GOVERNANCE: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
pub const EXTRINSIC_SEED: &str =
    "0x0101010101010101010101010101010101010101010101010101010101010101";
pub const EVENT_TIMESTAMP: u64 = 1_700_000_000;
pub const VOTE_WEIGHT: u64 = 1_000;

pub fn signer_address() -> Address {
    Address::repeat_byte(0xaa)
}

/// 测试配置：短超时、合约地址与签名种子齐备
pub fn test_config() -> Config {
    let mut config = Config::from_env().unwrap();
    config.account_chain.rpc_url = "http://account.test".into();
    config.account_chain.private_key = None;
    config.account_chain.recorder_contract = Some(RECORDER.into());
    config.account_chain.governance_contract = Some(GOVERNANCE.into());

    config.extrinsic_chain.rpc_url = "ws://extrinsic.test".into();
    config.extrinsic_chain.seed = Some(Secret::new(EXTRINSIC_SEED));
    config.extrinsic_chain.ss58_prefix = 42;
    config.extrinsic_chain.remark_pallet_index = 0;
    config.extrinsic_chain.remark_call_index = 0;
    config.extrinsic_chain.check_metadata_hash = false;

    config.timeouts.connect_secs = 1;
    config.timeouts.submit_secs = 2;
    config.timeouts.query_secs = 2;
    config.timeouts.receipt_poll_interval_ms = 10;

    config.policy.disarmament_unit_reward = 5000;
    config.policy.default_urgency_level = 3;
    config.policy.history_window_blocks = 1000;
    config.policy.history_block_concurrency = 4;
    config
}

/// 接入两个替身链的客户端
pub async fn connected_client(
    account: Arc<MockAccountChain>,
    extrinsic: Arc<MockExtrinsicChain>,
) -> PeaceChainClient {
    connected_client_with(test_config(), account, extrinsic).await
}

pub async fn connected_client_with(
    config: Config,
    account: Arc<MockAccountChain>,
    extrinsic: Arc<MockExtrinsicChain>,
) -> PeaceChainClient {
    let client = PeaceChainClient::new(config.clone());
    let _ = client
        .connections()
        .attach_account(account, &config.account_chain)
        .await;
    let _ = client
        .connections()
        .attach_extrinsic(extrinsic, &config.extrinsic_chain)
        .await;
    client
}

fn uint_topic(value: U256) -> H256 {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    H256(buf)
}

fn address_topic(address: Address) -> H256 {
    let mut buf = [0u8; 32];
    buf[12..].copy_from_slice(address.as_bytes());
    H256(buf)
}

/// 按事件声明把参数拆成 topics（indexed）与 data（其余）
pub fn encode_event(event: &Event, values: Vec<Token>) -> (Vec<H256>, Bytes) {
    let mut topics = vec![event.signature()];
    let mut data = Vec::new();

    for (param, value) in event.inputs.iter().zip(values) {
        if param.indexed {
            topics.push(match value {
                Token::Address(a) => address_topic(a),
                Token::Uint(v) => uint_topic(v),
                other => panic!("unsupported indexed token {:?}", other),
            });
        } else {
            data.push(value);
        }
    }

    (topics, Bytes::from(ethers::abi::encode(&data)))
}

#[derive(Default)]
struct AccountState {
    blocks: Vec<Block<Transaction>>,
    receipts: HashMap<H256, TransactionReceipt>,
    sent: usize,
    revert_next: bool,
    drop_logs_next: bool,
    fail_block: Option<u64>,
}

/// 账户链替身
pub struct MockAccountChain {
    state: Mutex<AccountState>,
    signer: Option<Address>,
    chain_id: u64,
    handshake_delay: Mutex<Option<Duration>>,
    available: bool,
    calls: AtomicUsize,
}

impl MockAccountChain {
    pub fn new(signer: Option<Address>) -> Self {
        let genesis = Block {
            number: Some(U64::zero()),
            timestamp: U256::from(EVENT_TIMESTAMP),
            ..Default::default()
        };
        Self {
            state: Mutex::new(AccountState {
                blocks: vec![genesis],
                ..Default::default()
            }),
            signer,
            chain_id: 31_337,
            handshake_delay: Mutex::new(None),
            available: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// 所有调用均返回传输错误
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            ..Self::new(Some(signer_address()))
        })
    }

    fn track(&self) -> Result<(), RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok(())
        } else {
            Err(RpcError::Transport("connection refused".into()))
        }
    }

    pub fn with_signer() -> Arc<Self> {
        Arc::new(Self::new(Some(signer_address())))
    }

    pub fn read_only() -> Arc<Self> {
        Arc::new(Self::new(None))
    }

    /// 握手（chain_id 查询）延迟，用于模拟不可达节点
    pub fn set_handshake_delay(&self, delay: Option<Duration>) {
        *self.handshake_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn revert_next(&self) {
        self.state.lock().unwrap().revert_next = true;
    }

    /// 下一笔交易的回执不含任何事件
    pub fn drop_logs_next(&self) {
        self.state.lock().unwrap().drop_logs_next = true;
    }

    pub fn fail_block(&self, number: u64) {
        self.state.lock().unwrap().fail_block = Some(number);
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().blocks.len() as u64 - 1
    }

    /// 追加一个区块，每笔交易都生成成功回执
    pub fn push_block(&self, txs: Vec<(Address, Option<Address>, Bytes)>) -> u64 {
        let mut state = self.state.lock().unwrap();
        let number = state.blocks.len() as u64;

        let mut transactions = Vec::new();
        for (index, (from, to, input)) in txs.into_iter().enumerate() {
            let hash = H256(keccak256(format!("tx-{}-{}", number, index)));
            transactions.push(Transaction {
                hash,
                from,
                to,
                input,
                value: U256::from(index as u64 + 1),
                block_number: Some(U64::from(number)),
                transaction_index: Some(U64::from(index as u64)),
                ..Default::default()
            });
            state.receipts.insert(
                hash,
                TransactionReceipt {
                    transaction_hash: hash,
                    block_number: Some(U64::from(number)),
                    status: Some(U64::one()),
                    gas_used: Some(U256::from(21_000 + index as u64)),
                    ..Default::default()
                },
            );
        }

        state.blocks.push(Block {
            number: Some(U64::from(number)),
            timestamp: U256::from(EVENT_TIMESTAMP + number * 12),
            transactions,
            ..Default::default()
        });
        number
    }

    fn contract_event(&self, data: &[u8], id: u64) -> Option<(Vec<H256>, Bytes)> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let signer = self.signer?;
        let args = &data[4..];

        for abi in [contracts::recorder_abi(), contracts::governance_abi()] {
            let Some(function) = abi.functions().find(|f| f.short_signature() == selector) else {
                continue;
            };
            let inputs = function.decode_input(args).ok()?;

            let (event_name, values) = match function.name.as_str() {
                contracts::RECORD_PEACE_ACTION => (
                    contracts::PEACE_ACTION_RECORDED,
                    vec![
                        Token::Uint(U256::from(id)),
                        inputs[0].clone(),
                        inputs[1].clone(),
                        inputs[2].clone(),
                        inputs[3].clone(),
                        Token::Address(signer),
                        Token::Uint(U256::from(EVENT_TIMESTAMP)),
                    ],
                ),
                contracts::VERIFY_PEACE_ACTION => (
                    contracts::PEACE_ACTION_VERIFIED,
                    vec![inputs[0].clone(), Token::Address(signer)],
                ),
                contracts::RECORD_VIOLATION => (
                    contracts::VIOLATION_RECORDED,
                    vec![
                        Token::Uint(U256::from(id)),
                        inputs[0].clone(),
                        inputs[1].clone(),
                        inputs[2].clone(),
                        inputs[3].clone(),
                        Token::Address(signer),
                        Token::Uint(U256::from(EVENT_TIMESTAMP)),
                    ],
                ),
                contracts::PROPOSE => {
                    let count = match &inputs[0] {
                        Token::Array(items) => items.len(),
                        _ => 0,
                    };
                    (
                        contracts::PROPOSAL_CREATED,
                        vec![
                            Token::Uint(U256::from(id)),
                            Token::Address(signer),
                            inputs[0].clone(),
                            inputs[1].clone(),
                            Token::Array(vec![Token::String(String::new()); count]),
                            inputs[2].clone(),
                            Token::Uint(U256::from(100)),
                            Token::Uint(U256::from(200)),
                            inputs[3].clone(),
                        ],
                    )
                }
                contracts::CAST_VOTE => (
                    contracts::VOTE_CAST,
                    vec![
                        Token::Address(signer),
                        inputs[0].clone(),
                        inputs[1].clone(),
                        Token::Uint(U256::from(VOTE_WEIGHT)),
                        Token::String(String::new()),
                    ],
                ),
                _ => return None,
            };

            let event = abi.event(event_name).ok()?;
            return Some(encode_event(event, values));
        }
        None
    }
}

#[async_trait]
impl AccountChainRpc for MockAccountChain {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.track()?;
        let delay = *self.handshake_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.track()?;
        Ok(self.head())
    }

    async fn gas_price(&self) -> Result<U256, RpcError> {
        self.track()?;
        Ok(U256::from(2_000_000_000u64))
    }

    async fn block_with_txs(&self, number: u64) -> Result<Option<Block<Transaction>>, RpcError> {
        self.track()?;
        let state = self.state.lock().unwrap();
        if state.fail_block == Some(number) {
            return Err(RpcError::Transport(format!("block {} fetch failed", number)));
        }
        Ok(state.blocks.get(number as usize).cloned())
    }

    async fn receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, RpcError> {
        self.track()?;
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, RpcError> {
        self.track()?;
        let from = self.signer.ok_or(RpcError::NoSigner)?;

        let id = {
            let mut state = self.state.lock().unwrap();
            state.sent += 1;
            state.sent as u64
        };
        let event = self.contract_event(&data, id);

        let mut state = self.state.lock().unwrap();
        let number = state.blocks.len() as u64;
        let hash = H256(keccak256(format!("sent-{}", id)));

        let reverted = std::mem::take(&mut state.revert_next);
        let drop_logs = std::mem::take(&mut state.drop_logs_next);
        let logs = match (reverted || drop_logs, event) {
            (false, Some((topics, log_data))) => vec![Log {
                address: to,
                topics,
                data: log_data,
                ..Default::default()
            }],
            _ => Vec::new(),
        };

        state.receipts.insert(
            hash,
            TransactionReceipt {
                transaction_hash: hash,
                block_number: Some(U64::from(number)),
                status: Some(if reverted { U64::zero() } else { U64::one() }),
                gas_used: Some(U256::from(90_000)),
                logs,
                ..Default::default()
            },
        );
        state.blocks.push(Block {
            number: Some(U64::from(number)),
            timestamp: U256::from(EVENT_TIMESTAMP + number * 12),
            transactions: vec![Transaction {
                hash,
                from,
                to: Some(to),
                input: data,
                block_number: Some(U64::from(number)),
                transaction_index: Some(U64::zero()),
                ..Default::default()
            }],
            ..Default::default()
        });

        Ok(hash)
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

#[derive(Default)]
struct ExtrinsicState {
    /// 下标即区块高度；0 为创世块
    blocks: Vec<Vec<Vec<u8>>>,
    nonce: u32,
    submissions: usize,
    reject_submission: Option<usize>,
    reset_submission: Option<usize>,
    stall_submission: Option<usize>,
    malformed_issuance: bool,
}

/// Extrinsic 链替身
pub struct MockExtrinsicChain {
    state: Mutex<ExtrinsicState>,
    available: bool,
    calls: AtomicUsize,
}

impl MockExtrinsicChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ExtrinsicState {
                blocks: vec![Vec::new()],
                ..Default::default()
            }),
            available: true,
            calls: AtomicUsize::new(0),
        })
    }

    /// 所有调用均返回传输错误
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ExtrinsicState::default()),
            available: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 第 n 次（从 1 开始）提交被节点拒绝
    pub fn reject_submission(&self, nth: usize) {
        self.state.lock().unwrap().reject_submission = Some(nth);
    }

    /// 第 n 次提交被打包，但响应在返回前连接断开
    pub fn reset_submission(&self, nth: usize) {
        self.state.lock().unwrap().reset_submission = Some(nth);
    }

    /// 第 n 次提交被打包，但响应迟迟不返回
    pub fn stall_submission(&self, nth: usize) {
        self.state.lock().unwrap().stall_submission = Some(nth);
    }

    pub fn corrupt_total_issuance(&self) {
        self.state.lock().unwrap().malformed_issuance = true;
    }

    /// 已打包的全部注解负载（按提交顺序）
    pub fn payloads(&self) -> Vec<AnnotationPayload> {
        let state = self.state.lock().unwrap();
        state
            .blocks
            .iter()
            .flatten()
            .map(|xt| decode_remark_payload(xt))
            .collect()
    }

    fn track(&self) -> Result<(), RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok(())
        } else {
            Err(RpcError::Transport("connection refused".into()))
        }
    }
}

/// 从签名 extrinsic 中取出 remark 负载（单字节 Compact nonce）
pub fn decode_remark_payload(xt: &[u8]) -> AnnotationPayload {
    let body = Vec::<u8>::decode(&mut &xt[..]).unwrap();
    // version + address + signature + era/nonce/tip + pallet/call
    let call_args = &body[1 + 33 + 65 + 3 + 2..];
    let payload = Vec::<u8>::decode(&mut &call_args[..]).unwrap();
    AnnotationPayload::parse(&payload).unwrap()
}

#[async_trait]
impl ExtrinsicChainRpc for MockExtrinsicChain {
    async fn chain_name(&self) -> Result<String, RpcError> {
        self.track()?;
        Ok("Development".into())
    }

    async fn genesis_hash(&self) -> Result<[u8; 32], RpcError> {
        self.track()?;
        Ok([0x42; 32])
    }

    async fn runtime_version(&self) -> Result<RuntimeVersion, RpcError> {
        self.track()?;
        Ok(RuntimeVersion {
            spec_name: "node".into(),
            spec_version: 100,
            transaction_version: 1,
        })
    }

    async fn head_number(&self) -> Result<u64, RpcError> {
        self.track()?;
        Ok(self.state.lock().unwrap().blocks.len() as u64 - 1)
    }

    async fn block_extrinsics(&self, number: u64) -> Result<Option<Vec<Vec<u8>>>, RpcError> {
        self.track()?;
        Ok(self.state.lock().unwrap().blocks.get(number as usize).cloned())
    }

    async fn account_next_index(&self, _address: &str) -> Result<u32, RpcError> {
        self.track()?;
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn submit_extrinsic(&self, encoded: &[u8]) -> Result<String, RpcError> {
        self.track()?;
        let (reset, stall) = {
            let mut state = self.state.lock().unwrap();
            state.submissions += 1;
            let nth = Some(state.submissions);
            if state.reject_submission == nth {
                return Err(RpcError::Rpc {
                    code: 1010,
                    message: "Invalid Transaction".into(),
                });
            }

            state.nonce += 1;
            state.blocks.push(vec![encoded.to_vec()]);
            (state.reset_submission == nth, state.stall_submission == nth)
        };

        if reset {
            return Err(RpcError::Transport("connection reset".into()));
        }
        if stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(format!("0x{}", hex::encode(extrinsic_hash(encoded))))
    }

    async fn storage(&self, key: &str) -> Result<Option<Vec<u8>>, RpcError> {
        self.track()?;
        let state = self.state.lock().unwrap();
        match key {
            TOTAL_ISSUANCE_KEY if state.malformed_issuance => Ok(Some(vec![1, 2, 3])),
            TOTAL_ISSUANCE_KEY => Ok(Some(1_000_000_000_000_000_000u128.encode())),
            SESSION_VALIDATORS_KEY => Ok(Some(vec![[1u8; 32], [2u8; 32], [3u8; 32]].encode())),
            _ => Ok(None),
        }
    }
}
