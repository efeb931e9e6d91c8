//! 回执解码
//!
//! 由 schema 驱动：在回执中查找目标合约发出的、签名匹配的首个事件，
//! 按字段名取参数；事件或字段缺失一律报错，不做默认值填充。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ethers::{
    abi::{Abi, Event, RawLog, Token},
    types::{Address, TransactionReceipt, H256, U256},
    utils::to_checksum,
};

use crate::{
    domain::{GovernanceProposal, PeaceActionRecord, ProposalMetadata, ViolationRecord, Vote, VoteSupport},
    error::DecodeError,
    service::contracts,
    utils::time_utils,
};

/// 事件解码 schema
#[derive(Debug, Clone)]
pub struct EventSchema {
    event: Event,
    contract: Option<Address>,
}

impl EventSchema {
    pub fn new(abi: &Abi, event_name: &str, contract: Option<Address>) -> Result<Self, DecodeError> {
        let event = abi
            .event(event_name)
            .map_err(|_| DecodeError::MissingEvent {
                event: event_name.to_string(),
            })?
            .clone();
        Ok(Self { event, contract })
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    pub fn topic(&self) -> H256 {
        self.event.signature()
    }
}

/// 解码后的事件参数
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub params: HashMap<String, Token>,
}

impl DecodedEvent {
    fn field(&self, field: &str) -> Result<&Token, DecodeError> {
        self.params.get(field).ok_or_else(|| DecodeError::MissingField {
            event: self.name.clone(),
            field: field.to_string(),
        })
    }

    fn type_error(&self, field: &str, expected: &'static str) -> DecodeError {
        DecodeError::FieldType {
            event: self.name.clone(),
            field: field.to_string(),
            expected,
        }
    }

    pub fn uint(&self, field: &str) -> Result<U256, DecodeError> {
        match self.field(field)? {
            Token::Uint(v) => Ok(*v),
            _ => Err(self.type_error(field, "uint")),
        }
    }

    pub fn u64(&self, field: &str) -> Result<u64, DecodeError> {
        let value = self.uint(field)?;
        if value > U256::from(u64::MAX) {
            return Err(self.type_error(field, "uint64"));
        }
        Ok(value.as_u64())
    }

    /// 事件中的秒级时间戳，超出可表示范围即报类型错误
    pub fn timestamp(&self, field: &str) -> Result<DateTime<Utc>, DecodeError> {
        time_utils::try_from_unix_secs(self.u64(field)?)
            .ok_or_else(|| self.type_error(field, "unix timestamp"))
    }

    pub fn address(&self, field: &str) -> Result<String, DecodeError> {
        match self.field(field)? {
            Token::Address(a) => Ok(to_checksum(a, None)),
            _ => Err(self.type_error(field, "address")),
        }
    }

    pub fn string(&self, field: &str) -> Result<String, DecodeError> {
        match self.field(field)? {
            Token::String(s) => Ok(s.clone()),
            _ => Err(self.type_error(field, "string")),
        }
    }

    fn array(&self, field: &str) -> Result<&[Token], DecodeError> {
        match self.field(field)? {
            Token::Array(items) => Ok(items),
            _ => Err(self.type_error(field, "array")),
        }
    }

    pub fn address_array(&self, field: &str) -> Result<Vec<String>, DecodeError> {
        self.array(field)?
            .iter()
            .map(|t| match t {
                Token::Address(a) => Ok(to_checksum(a, None)),
                _ => Err(self.type_error(field, "address[]")),
            })
            .collect()
    }

    pub fn uint_array(&self, field: &str) -> Result<Vec<String>, DecodeError> {
        self.array(field)?
            .iter()
            .map(|t| match t {
                Token::Uint(v) => Ok(v.to_string()),
                _ => Err(self.type_error(field, "uint256[]")),
            })
            .collect()
    }

    pub fn bytes_array(&self, field: &str) -> Result<Vec<String>, DecodeError> {
        self.array(field)?
            .iter()
            .map(|t| match t {
                Token::Bytes(b) => Ok(format!("0x{}", hex::encode(b))),
                _ => Err(self.type_error(field, "bytes[]")),
            })
            .collect()
    }
}

/// 在回执中查找并解码首个匹配事件
pub fn decode_receipt(
    receipt: &TransactionReceipt,
    schema: &EventSchema,
) -> Result<DecodedEvent, DecodeError> {
    let topic = schema.topic();

    let log = receipt
        .logs
        .iter()
        .filter(|log| schema.contract.map_or(true, |c| log.address == c))
        .find(|log| log.topics.first() == Some(&topic))
        .ok_or_else(|| DecodeError::MissingEvent {
            event: schema.name().to_string(),
        })?;

    let parsed = schema
        .event
        .parse_log(RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        })
        .map_err(|e| DecodeError::InvalidLog {
            event: schema.name().to_string(),
            reason: e.to_string(),
        })?;

    Ok(DecodedEvent {
        name: schema.name().to_string(),
        params: parsed
            .params
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect(),
    })
}

/// 回执上下文：已确认交易的哈希与区块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptContext {
    pub tx_hash: String,
    pub block_number: u64,
}

/// 可由单个事件构造的领域记录
pub trait FromEvent: Sized {
    /// 对应的事件名
    const EVENT: &'static str;

    fn from_event(event: &DecodedEvent, ctx: &ReceiptContext) -> Result<Self, DecodeError>;
}

/// 按 schema 解码回执并构造领域记录
pub fn decode_record<T: FromEvent>(
    receipt: &TransactionReceipt,
    schema: &EventSchema,
    ctx: &ReceiptContext,
) -> Result<T, DecodeError> {
    let event = decode_receipt(receipt, schema)?;
    T::from_event(&event, ctx)
}

impl FromEvent for PeaceActionRecord {
    const EVENT: &'static str = contracts::PEACE_ACTION_RECORDED;

    fn from_event(event: &DecodedEvent, ctx: &ReceiptContext) -> Result<Self, DecodeError> {
        Ok(Self {
            action_id: event.uint("actionId")?.to_string(),
            actor: event.address("actor")?,
            action_type: event.string("actionType")?,
            description: event.string("description")?,
            reward: event.uint("reward")?.to_string(),
            verifier: event.address("verifier")?,
            timestamp: event.timestamp("timestamp")?,
            transaction_hash: ctx.tx_hash.clone(),
            block_number: ctx.block_number,
        })
    }
}

impl FromEvent for ViolationRecord {
    const EVENT: &'static str = contracts::VIOLATION_RECORDED;

    fn from_event(event: &DecodedEvent, ctx: &ReceiptContext) -> Result<Self, DecodeError> {
        Ok(Self {
            violation_id: event.uint("violationId")?.to_string(),
            violator: event.address("violator")?,
            violation_type: event.string("violationType")?,
            description: event.string("description")?,
            penalty: event.uint("penalty")?.to_string(),
            reporter: event.address("reporter")?,
            timestamp: event.timestamp("timestamp")?,
            transaction_hash: ctx.tx_hash.clone(),
            block_number: ctx.block_number,
        })
    }
}

impl FromEvent for GovernanceProposal {
    const EVENT: &'static str = contracts::PROPOSAL_CREATED;

    fn from_event(event: &DecodedEvent, ctx: &ReceiptContext) -> Result<Self, DecodeError> {
        let raw_description = event.string("description")?;
        let metadata: ProposalMetadata =
            serde_json::from_str(&raw_description).map_err(|_| DecodeError::FieldType {
                event: event.name.clone(),
                field: "description".into(),
                expected: "proposal metadata json",
            })?;

        Ok(Self {
            proposal_id: event.uint("proposalId")?.to_string(),
            proposer: event.address("proposer")?,
            metadata,
            targets: event.address_array("targets")?,
            values: event.uint_array("values")?,
            calldata: event.bytes_array("calldatas")?,
            transaction_hash: ctx.tx_hash.clone(),
            block_number: ctx.block_number,
        })
    }
}

impl FromEvent for Vote {
    const EVENT: &'static str = contracts::VOTE_CAST;

    fn from_event(event: &DecodedEvent, ctx: &ReceiptContext) -> Result<Self, DecodeError> {
        let raw_support = event.uint("support")?;
        let support = (raw_support <= U256::from(u8::MAX))
            .then(|| raw_support.low_u64() as u8)
            .and_then(VoteSupport::from_u8)
            .ok_or_else(|| event.type_error("support", "vote support (0|1)"))?;

        Ok(Self {
            proposal_id: event.uint("proposalId")?.to_string(),
            voter: event.address("voter")?,
            support,
            weight: event.uint("weight")?.to_string(),
            transaction_hash: ctx.tx_hash.clone(),
            block_number: ctx.block_number,
        })
    }
}
