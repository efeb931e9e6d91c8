//! PeaceChain - 和平行动与资源流转的双链记录客户端
//!
//! 账户链（EVM 合约）记录和平行动、违规与治理；
//! extrinsic 链（Substrate）以注解负载记录资源流转与裁军验证。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

pub use config::Config;
pub use service::PeaceChainClient;

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            BlockchainTransaction, ChainId, ConnectionStatus, NetworkStats, TransactionType,
            VoteSupport,
        },
        error::{ConnectError, DisarmamentError, ErrorKind, ScanError, StatsError, SubmitError},
        service::{PeaceChainClient, ProposalRequest},
    };
}
