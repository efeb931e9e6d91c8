//! 网络统计聚合：完整、部分可用、响应格式错误

mod common;

use common::*;
use peacechain::{domain::ChainId, error::StatsError};

#[tokio::test]
async fn test_stats_from_both_chains() {
    let account = MockAccountChain::with_signer();
    account.push_block(vec![]);
    let client = connected_client(account, MockExtrinsicChain::new()).await;

    let stats = client.get_network_stats().await.unwrap();
    assert!(!stats.is_partial());

    assert_eq!(stats.account_chain.block_number, 1);
    assert_eq!(stats.account_chain.chain_id, 31_337);
    assert_eq!(stats.account_chain.network_name, "hardhat");
    assert_eq!(stats.account_chain.gas_price, "2000000000");

    assert_eq!(stats.extrinsic_chain.block_number, 0);
    assert_eq!(stats.extrinsic_chain.total_issuance, "1000000000000000000");
    assert_eq!(stats.extrinsic_chain.validator_count, 3);
    assert_eq!(stats.extrinsic_chain.chain_name, "Development");
}

#[tokio::test]
async fn test_unavailable_chain_yields_partial_stats() {
    let client =
        connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::unreachable()).await;

    let stats = client.get_network_stats().await.unwrap();
    assert!(stats.is_partial());
    assert_eq!(stats.unavailable, vec![ChainId::ExtrinsicChain]);
    assert_eq!(stats.extrinsic_chain.block_number, 0);
    assert_eq!(stats.extrinsic_chain.total_issuance, "0");
    assert_eq!(stats.extrinsic_chain.validator_count, 0);
    assert_eq!(stats.extrinsic_chain.chain_name, "");
    assert_eq!(stats.account_chain.chain_id, 31_337);
}

#[tokio::test]
async fn test_unavailable_account_chain_yields_partial_stats() {
    let client =
        connected_client(MockAccountChain::unreachable(), MockExtrinsicChain::new()).await;

    let stats = client.get_network_stats().await.unwrap();
    assert_eq!(stats.unavailable, vec![ChainId::AccountChain]);
    assert_eq!(stats.account_chain.block_number, 0);
    assert_eq!(stats.account_chain.gas_price, "0");
    assert_eq!(stats.account_chain.chain_id, 0);

    assert_eq!(stats.extrinsic_chain.total_issuance, "1000000000000000000");
    assert_eq!(stats.extrinsic_chain.validator_count, 3);
    assert_eq!(stats.extrinsic_chain.chain_name, "Development");
}

#[tokio::test]
async fn test_repeated_stats_reads_are_identical() {
    let client =
        connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::unreachable()).await;

    let first = client.get_network_stats().await.unwrap();
    let second = client.get_network_stats().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_malformed_storage_is_an_error() {
    let extrinsic = MockExtrinsicChain::new();
    extrinsic.corrupt_total_issuance();
    let client = connected_client(MockAccountChain::with_signer(), extrinsic).await;

    let err = client.get_network_stats().await.unwrap_err();
    assert!(matches!(
        err,
        StatsError::MalformedResponse {
            chain: ChainId::ExtrinsicChain,
            ..
        }
    ));
}
