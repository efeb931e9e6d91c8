//! 领域模型

pub mod chain;
pub mod records;
pub mod stats;
pub mod transaction;
pub mod transaction_status;

pub use chain::{ChainConnection, ChainId, ConnectionStatus, SigningIdentity};
pub use records::{
    DisarmamentVerification, GovernanceProposal, PeaceActionRecord, ProposalMetadata,
    ResourceAllocation, ResourceTransfer, ViolationRecord, Vote, VoteSupport,
};
pub use stats::{AccountChainStats, ExtrinsicChainStats, NetworkStats};
pub use transaction::{BlockchainTransaction, TransactionType};
pub use transaction_status::TxStatus;
