pub mod account_chain;
pub mod annotation;
pub mod classifier;
pub mod client;
pub mod connection_manager;
pub mod contracts;
pub mod decoder;
pub mod extrinsic_builder;
pub mod extrinsic_chain;
pub mod history_scanner;
pub mod network_stats;
pub mod submission;

pub use account_chain::{AccountChainRpc, EthersAccountClient};
pub use client::{PeaceChainClient, ProposalRequest};
pub use connection_manager::{ConnectionHandle, ConnectionManager};
pub use extrinsic_chain::{ExtrinsicChainRpc, RuntimeVersion, SubstrateRpcClient};
