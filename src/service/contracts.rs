//! 合约 ABI 注册表
//! 记录合约与治理合约以 human-readable ABI 声明，用于编码调用与构建事件解码 schema

use ethers::{
    abi::{Abi, Function, Token},
    types::Bytes,
};
use once_cell::sync::Lazy;

use crate::{domain::TransactionType, error::SubmitError};

pub const RECORD_PEACE_ACTION: &str = "recordPeaceAction";
pub const VERIFY_PEACE_ACTION: &str = "verifyPeaceAction";
pub const RECORD_VIOLATION: &str = "recordViolation";
pub const PROPOSE: &str = "propose";
pub const CAST_VOTE: &str = "castVote";

pub const PEACE_ACTION_RECORDED: &str = "PeaceActionRecorded";
pub const PEACE_ACTION_VERIFIED: &str = "PeaceActionVerified";
pub const VIOLATION_RECORDED: &str = "ViolationRecorded";
pub const PROPOSAL_CREATED: &str = "ProposalCreated";
pub const VOTE_CAST: &str = "VoteCast";

static RECORDER_ABI: Lazy<Abi> = Lazy::new(|| {
    ethers::abi::parse_abi(&[
        "function recordPeaceAction(address actor, string actionType, string description, uint256 reward) returns (uint256)",
        "function verifyPeaceAction(uint256 actionId)",
        "function recordViolation(address violator, string violationType, string description, uint256 penalty) returns (uint256)",
        "event PeaceActionRecorded(uint256 indexed actionId, address indexed actor, string actionType, string description, uint256 reward, address verifier, uint256 timestamp)",
        "event PeaceActionVerified(uint256 indexed actionId, address indexed verifier)",
        "event ViolationRecorded(uint256 indexed violationId, address indexed violator, string violationType, string description, uint256 penalty, address reporter, uint256 timestamp)",
    ])
    .expect("recorder ABI literal is valid")
});

static GOVERNANCE_ABI: Lazy<Abi> = Lazy::new(|| {
    ethers::abi::parse_abi(&[
        "function propose(address[] targets, uint256[] values, bytes[] calldatas, string description) returns (uint256)",
        "function castVote(uint256 proposalId, uint8 support) returns (uint256)",
        "event ProposalCreated(uint256 proposalId, address proposer, address[] targets, uint256[] values, string[] signatures, bytes[] calldatas, uint256 voteStart, uint256 voteEnd, string description)",
        "event VoteCast(address indexed voter, uint256 proposalId, uint8 support, uint256 weight, string reason)",
    ])
    .expect("governance ABI literal is valid")
});

pub fn recorder_abi() -> &'static Abi {
    &RECORDER_ABI
}

pub fn governance_abi() -> &'static Abi {
    &GOVERNANCE_ABI
}

fn function(abi: &'static Abi, name: &str) -> Result<&'static Function, SubmitError> {
    abi.function(name)
        .map_err(|e| SubmitError::InvalidArgument(format!("unknown contract function {}: {}", name, e)))
}

/// 按 ABI 编码合约调用数据
pub fn encode_call(abi: &'static Abi, name: &str, args: &[Token]) -> Result<Bytes, SubmitError> {
    let data = function(abi, name)?
        .encode_input(args)
        .map_err(|e| SubmitError::InvalidArgument(format!("cannot encode {}: {}", name, e)))?;
    Ok(Bytes::from(data))
}

/// 已知函数选择器对应的交易类型
static SELECTOR_TYPES: Lazy<Vec<([u8; 4], TransactionType)>> = Lazy::new(|| {
    let entries = [
        (recorder_abi(), RECORD_PEACE_ACTION, TransactionType::PeaceAction),
        (recorder_abi(), VERIFY_PEACE_ACTION, TransactionType::PeaceAction),
        (recorder_abi(), RECORD_VIOLATION, TransactionType::Violation),
        (governance_abi(), PROPOSE, TransactionType::Governance),
        (governance_abi(), CAST_VOTE, TransactionType::Governance),
    ];

    entries
        .into_iter()
        .filter_map(|(abi, name, tx_type)| {
            abi.function(name).ok().map(|f| (f.short_signature(), tx_type))
        })
        .collect()
});

/// 根据调用数据的函数选择器识别交易类型
pub fn selector_type(input: &[u8]) -> Option<TransactionType> {
    let selector: [u8; 4] = input.get(..4)?.try_into().ok()?;
    SELECTOR_TYPES
        .iter()
        .find(|(known, _)| *known == selector)
        .map(|(_, tx_type)| *tx_type)
}
