//! 账户链写操作：和平行动、违规、治理提案与投票

mod common;

use common::*;
use ethers::utils::to_checksum;
use peacechain::{
    domain::{ChainId, VoteSupport},
    error::{DecodeError, ErrorKind, SubmitError},
    service::ProposalRequest,
};

#[tokio::test]
async fn test_submit_peace_action_returns_decoded_record() {
    let account = MockAccountChain::with_signer();
    let client = connected_client(account.clone(), MockExtrinsicChain::new()).await;

    let actor = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    let record = client
        .submit_peace_action(actor, "ceasefire", "Ceasefire along the northern border", "2500")
        .await
        .unwrap();

    assert_eq!(record.action_id, "1");
    assert_eq!(record.actor, actor);
    assert_eq!(record.action_type, "ceasefire");
    assert_eq!(record.description, "Ceasefire along the northern border");
    assert_eq!(record.reward, "2500");
    assert_eq!(record.verifier, to_checksum(&signer_address(), None));
    assert_eq!(record.timestamp.timestamp(), EVENT_TIMESTAMP as i64);
    assert_eq!(record.block_number, account.head());
    assert!(record.transaction_hash.starts_with("0x"));
    assert_eq!(record.transaction_hash.len(), 66);
}

#[tokio::test]
async fn test_submit_violation_returns_decoded_record() {
    let client = connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::new()).await;

    let record = client
        .submit_violation(RECORDER, "airspace", "Unauthorised overflight", "750")
        .await
        .unwrap();

    assert_eq!(record.violation_id, "1");
    assert_eq!(record.violator, RECORDER);
    assert_eq!(record.violation_type, "airspace");
    assert_eq!(record.penalty, "750");
    assert_eq!(record.reporter, to_checksum(&signer_address(), None));
}

#[tokio::test]
async fn test_reverted_transaction_is_chain_rejected() {
    let account = MockAccountChain::with_signer();
    let client = connected_client(account.clone(), MockExtrinsicChain::new()).await;

    account.revert_next();
    let err = client
        .submit_peace_action(RECORDER, "ceasefire", "reverted", "1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ChainRejected);
    match err {
        SubmitError::ChainRejected {
            tx_hash,
            block_number,
        } => {
            assert!(tx_hash.starts_with("0x"));
            assert_eq!(block_number, Some(account.head()));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_receipt_without_event_is_malformed() {
    let account = MockAccountChain::with_signer();
    let client = connected_client(account.clone(), MockExtrinsicChain::new()).await;

    account.drop_logs_next();
    let err = client
        .submit_violation(RECORDER, "airspace", "no event", "1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(err.tx_hash().is_some());
    match err {
        SubmitError::MalformedReceipt { source, .. } => assert_eq!(
            source,
            DecodeError::MissingEvent {
                event: "ViolationRecorded".into()
            }
        ),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_contract_address_is_connection_unavailable() {
    let mut config = test_config();
    config.account_chain.governance_contract = None;
    let account = MockAccountChain::with_signer();
    let client = connected_client_with(config, account.clone(), MockExtrinsicChain::new()).await;

    let calls_before = account.calls();
    let err = client.vote("1", VoteSupport::Yes).await.unwrap_err();
    assert!(matches!(
        err,
        SubmitError::ConnectionUnavailable {
            chain: ChainId::AccountChain,
            ..
        }
    ));
    assert_eq!(account.calls(), calls_before);
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected() {
    let client = connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::new()).await;

    let err = client
        .submit_peace_action("not-an-address", "ceasefire", "", "1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = client
        .submit_peace_action(RECORDER, "ceasefire", "", "-3")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_verify_peace_action() {
    let client = connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::new()).await;

    let record = client
        .submit_peace_action(RECORDER, "aid", "Humanitarian corridor", "10")
        .await
        .unwrap();
    assert!(client.verify_peace_action(&record.action_id).await.unwrap());
}

fn proposal_request() -> ProposalRequest {
    ProposalRequest {
        title: "Demilitarised zone".into(),
        description: "Establish a 10km demilitarised zone".into(),
        category: "security".into(),
        region: "north".into(),
        urgency_level: None,
        targets: vec![RECORDER.into()],
        values: vec!["0".into()],
        calldata: vec!["0x".into()],
    }
}

#[tokio::test]
async fn test_create_proposal_round_trips_metadata() {
    let client = connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::new()).await;

    let proposal = client.create_proposal(proposal_request()).await.unwrap();

    assert_eq!(proposal.proposal_id, "1");
    assert_eq!(proposal.proposer, to_checksum(&signer_address(), None));
    assert_eq!(proposal.metadata.title, "Demilitarised zone");
    assert_eq!(proposal.metadata.category, "security");
    assert_eq!(proposal.metadata.region, "north");
    // 缺省紧急程度取策略默认值
    assert_eq!(proposal.metadata.urgency_level, 3);
    assert_eq!(proposal.targets, vec![RECORDER.to_string()]);
    assert_eq!(proposal.values, vec!["0".to_string()]);
    assert_eq!(proposal.calldata, vec!["0x".to_string()]);
}

#[tokio::test]
async fn test_create_proposal_validates_shape() {
    let client = connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::new()).await;

    let mut request = proposal_request();
    request.values.push("1".into());
    let err = client.create_proposal(request).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    let mut request = proposal_request();
    request.urgency_level = Some(7);
    let err = client.create_proposal(request).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}

#[tokio::test]
async fn test_vote_returns_weight_and_support() {
    let client = connected_client(MockAccountChain::with_signer(), MockExtrinsicChain::new()).await;

    let proposal = client.create_proposal(proposal_request()).await.unwrap();
    let vote = client
        .vote(&proposal.proposal_id, VoteSupport::No)
        .await
        .unwrap();

    assert_eq!(vote.proposal_id, proposal.proposal_id);
    assert_eq!(vote.support, VoteSupport::No);
    assert_eq!(vote.weight, VOTE_WEIGHT.to_string());
    assert_eq!(vote.voter, to_checksum(&signer_address(), None));
    assert_ne!(vote.transaction_hash, proposal.transaction_hash);
}
