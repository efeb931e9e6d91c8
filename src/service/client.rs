//! PeaceChain 客户端门面
//!
//! 组合连接管理、提交管线、历史扫描与统计聚合，对外提供全部领域操作。
//! 账户链承载和平行动、违规与治理（合约事件即记录）；
//! extrinsic 链承载资源流转与裁军验证（注解负载，无链上业务逻辑）。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers::{
    abi::Token,
    types::{Address, Bytes, U256},
};
use futures::stream::BoxStream;
use tracing::{info, warn};

use crate::{
    config::{Config, PolicyConfig},
    domain::{
        BlockchainTransaction, ChainConnection, ChainId, ConnectionStatus, DisarmamentVerification,
        GovernanceProposal, NetworkStats, PeaceActionRecord, ProposalMetadata, ResourceAllocation,
        ResourceTransfer, ViolationRecord, Vote, VoteSupport,
    },
    error::{ConnectError, DisarmamentError, ScanError, StatsError, SubmitError},
    service::{
        annotation::{now_timestamp, AnnotationPayload},
        connection_manager::{ConnectionHandle, ConnectionManager},
        contracts,
        history_scanner::HistoryScanner,
        network_stats::StatsAggregator,
        submission::{ConfirmedAnnotation, ContractTarget, SubmissionPipeline},
    },
};

/// 裁军奖励记录的行动类型
pub const DISARMAMENT_ACTION_TYPE: &str = "disarmament";

/// 新提案请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub region: String,
    /// 缺省时使用策略配置的默认紧急程度
    pub urgency_level: Option<u8>,
    pub targets: Vec<String>,
    /// 十进制字符串
    pub values: Vec<String>,
    /// 0x前缀hex
    pub calldata: Vec<String>,
}

fn invalid(message: impl Into<String>) -> SubmitError {
    SubmitError::InvalidArgument(message.into())
}

fn parse_address(field: &str, value: &str) -> Result<Address, SubmitError> {
    value
        .parse()
        .map_err(|_| invalid(format!("{} is not a valid address: {}", field, value)))
}

fn parse_uint(field: &str, value: &str) -> Result<U256, SubmitError> {
    U256::from_dec_str(value.trim())
        .map_err(|_| invalid(format!("{} is not a valid unsigned integer: {}", field, value)))
}

/// 十进制数量：整数或单个小数点的小数，不做数值转换
fn validate_decimal(field: &str, value: &str) -> Result<(), SubmitError> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (value, None),
    };

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if digits(int_part) && frac_part.map_or(true, digits) {
        Ok(())
    } else {
        Err(invalid(format!("{} is not a decimal amount: {}", field, value)))
    }
}

fn parse_calldata(value: &str) -> Result<Bytes, SubmitError> {
    hex::decode(value.trim_start_matches("0x"))
        .map(Bytes::from)
        .map_err(|e| invalid(format!("calldata is not valid hex: {}", e)))
}

fn payload_time(payload: &AnnotationPayload) -> Result<DateTime<Utc>, SubmitError> {
    payload
        .timestamp()
        .map_err(|e| SubmitError::MalformedPayload(e.to_string()))
}

pub struct PeaceChainClient {
    config: Config,
    connections: Arc<ConnectionManager>,
    pipeline: SubmissionPipeline,
    scanner: HistoryScanner,
    stats: StatsAggregator,
}

impl PeaceChainClient {
    pub fn new(config: Config) -> Self {
        let connections = Arc::new(ConnectionManager::new(config.timeouts.clone()));
        Self {
            pipeline: SubmissionPipeline::new(connections.clone()),
            scanner: HistoryScanner::new(
                connections.clone(),
                config.policy.history_block_concurrency,
            ),
            stats: StatsAggregator::new(connections.clone()),
            connections,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn policy(&self) -> &PolicyConfig {
        &self.config.policy
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    pub async fn connect(&self, chain_id: ChainId) -> Result<ConnectionHandle, ConnectError> {
        self.connections.connect(chain_id, &self.config).await
    }

    /// 并发连接两个链族；单链失败不影响另一条链
    pub async fn connect_all(
        &self,
    ) -> (
        Result<ConnectionHandle, ConnectError>,
        Result<ConnectionHandle, ConnectError>,
    ) {
        self.connections.connect_all(&self.config).await
    }

    pub async fn status(&self, chain_id: ChainId) -> ChainConnection {
        self.connections.status(chain_id).await
    }

    pub async fn health_check(&self, chain_id: ChainId) -> ConnectionStatus {
        self.connections.health_check(chain_id).await
    }

    // ---------------------------------------------------------------------
    // 账户链：和平行动 / 违规
    // ---------------------------------------------------------------------

    pub async fn submit_peace_action(
        &self,
        actor: &str,
        action_type: &str,
        description: &str,
        reward: &str,
    ) -> Result<PeaceActionRecord, SubmitError> {
        let call = contracts::encode_call(
            contracts::recorder_abi(),
            contracts::RECORD_PEACE_ACTION,
            &[
                Token::Address(parse_address("actor", actor)?),
                Token::String(action_type.to_string()),
                Token::String(description.to_string()),
                Token::Uint(parse_uint("reward", reward)?),
            ],
        )?;

        let record: PeaceActionRecord = self
            .pipeline
            .submit_contract_call(ContractTarget::Recorder, call)
            .await?;

        info!(action_id = %record.action_id, tx_hash = %record.transaction_hash, "Peace action recorded");
        Ok(record)
    }

    /// 验证和平行动；返回确认事件中的行动 ID 是否与请求一致
    pub async fn verify_peace_action(&self, action_id: &str) -> Result<bool, SubmitError> {
        let id = parse_uint("action_id", action_id)?;
        let call = contracts::encode_call(
            contracts::recorder_abi(),
            contracts::VERIFY_PEACE_ACTION,
            &[Token::Uint(id)],
        )?;

        let (event, ctx) = self
            .pipeline
            .submit_and_decode(ContractTarget::Recorder, contracts::PEACE_ACTION_VERIFIED, call)
            .await?;

        let verified_id = event
            .uint("actionId")
            .map_err(|source| SubmitError::MalformedReceipt {
                tx_hash: ctx.tx_hash.clone(),
                source,
            })?;

        if verified_id != id {
            warn!(requested = %id, verified = %verified_id, tx_hash = %ctx.tx_hash, "Verified action id mismatch");
        }
        Ok(verified_id == id)
    }

    pub async fn submit_violation(
        &self,
        violator: &str,
        violation_type: &str,
        description: &str,
        penalty: &str,
    ) -> Result<ViolationRecord, SubmitError> {
        let call = contracts::encode_call(
            contracts::recorder_abi(),
            contracts::RECORD_VIOLATION,
            &[
                Token::Address(parse_address("violator", violator)?),
                Token::String(violation_type.to_string()),
                Token::String(description.to_string()),
                Token::Uint(parse_uint("penalty", penalty)?),
            ],
        )?;

        let record: ViolationRecord = self
            .pipeline
            .submit_contract_call(ContractTarget::Recorder, call)
            .await?;

        info!(violation_id = %record.violation_id, tx_hash = %record.transaction_hash, "Violation recorded");
        Ok(record)
    }

    // ---------------------------------------------------------------------
    // 账户链：治理
    // ---------------------------------------------------------------------

    pub async fn create_proposal(
        &self,
        request: ProposalRequest,
    ) -> Result<GovernanceProposal, SubmitError> {
        let urgency_level = request
            .urgency_level
            .unwrap_or(self.policy().default_urgency_level);
        if !(1..=5).contains(&urgency_level) {
            return Err(invalid(format!("urgency level must be 1-5, got {}", urgency_level)));
        }

        if request.targets.is_empty() {
            return Err(invalid("proposal needs at least one target"));
        }
        if request.targets.len() != request.values.len()
            || request.targets.len() != request.calldata.len()
        {
            return Err(invalid(format!(
                "targets/values/calldata length mismatch: {}/{}/{}",
                request.targets.len(),
                request.values.len(),
                request.calldata.len()
            )));
        }

        let targets = request
            .targets
            .iter()
            .map(|t| parse_address("target", t).map(Token::Address))
            .collect::<Result<Vec<_>, _>>()?;
        let values = request
            .values
            .iter()
            .map(|v| parse_uint("value", v).map(Token::Uint))
            .collect::<Result<Vec<_>, _>>()?;
        let calldata = request
            .calldata
            .iter()
            .map(|c| parse_calldata(c).map(|b| Token::Bytes(b.to_vec())))
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = ProposalMetadata {
            title: request.title,
            description: request.description,
            category: request.category,
            region: request.region,
            urgency_level,
        };
        let description =
            serde_json::to_string(&metadata).map_err(|e| SubmitError::MalformedPayload(e.to_string()))?;

        let call = contracts::encode_call(
            contracts::governance_abi(),
            contracts::PROPOSE,
            &[
                Token::Array(targets),
                Token::Array(values),
                Token::Array(calldata),
                Token::String(description),
            ],
        )?;

        let proposal: GovernanceProposal = self
            .pipeline
            .submit_contract_call(ContractTarget::Governance, call)
            .await?;

        info!(proposal_id = %proposal.proposal_id, tx_hash = %proposal.transaction_hash, "Proposal created");
        Ok(proposal)
    }

    pub async fn vote(&self, proposal_id: &str, support: VoteSupport) -> Result<Vote, SubmitError> {
        let call = contracts::encode_call(
            contracts::governance_abi(),
            contracts::CAST_VOTE,
            &[
                Token::Uint(parse_uint("proposal_id", proposal_id)?),
                Token::Uint(U256::from(support.as_u8())),
            ],
        )?;

        let vote: Vote = self
            .pipeline
            .submit_contract_call(ContractTarget::Governance, call)
            .await?;

        info!(proposal_id = %vote.proposal_id, weight = %vote.weight, tx_hash = %vote.transaction_hash, "Vote cast");
        Ok(vote)
    }

    // ---------------------------------------------------------------------
    // Extrinsic 链：资源流转
    // ---------------------------------------------------------------------

    pub async fn submit_resource_transfer(
        &self,
        from: &str,
        to: &str,
        resource_type: &str,
        amount: &str,
        region: &str,
        purpose: &str,
    ) -> Result<ResourceTransfer, SubmitError> {
        validate_decimal("amount", amount)?;

        let payload = AnnotationPayload::ResourceTransfer {
            from: from.to_string(),
            to: to.to_string(),
            resource_type: resource_type.to_string(),
            amount: amount.to_string(),
            region: region.to_string(),
            purpose: purpose.to_string(),
            timestamp: now_timestamp(),
        };
        let timestamp = payload_time(&payload)?;

        let confirmed = self.pipeline.submit_annotation(&payload).await?;

        info!(tx_hash = %confirmed.tx_hash, block_number = confirmed.block_number, "Resource transfer recorded");
        Ok(ResourceTransfer {
            transfer_id: confirmed.tx_hash.clone(),
            from: from.to_string(),
            to: to.to_string(),
            resource_type: resource_type.to_string(),
            amount: amount.to_string(),
            region: region.to_string(),
            purpose: purpose.to_string(),
            timestamp,
            transaction_hash: confirmed.tx_hash,
            block_number: Some(confirmed.block_number),
        })
    }

    pub async fn update_resource_allocation(
        &self,
        resource_type: &str,
        region: &str,
        allocation: &str,
    ) -> Result<ResourceAllocation, SubmitError> {
        validate_decimal("allocation", allocation)?;

        let payload = AnnotationPayload::ResourceAllocation {
            resource_type: resource_type.to_string(),
            region: region.to_string(),
            allocation: allocation.to_string(),
            timestamp: now_timestamp(),
        };
        let timestamp = payload_time(&payload)?;

        let confirmed = self.pipeline.submit_annotation(&payload).await?;

        info!(tx_hash = %confirmed.tx_hash, block_number = confirmed.block_number, "Resource allocation updated");
        Ok(ResourceAllocation {
            resource_type: resource_type.to_string(),
            region: region.to_string(),
            allocation: allocation.to_string(),
            timestamp,
            transaction_hash: confirmed.tx_hash,
            block_number: Some(confirmed.block_number),
        })
    }

    // ---------------------------------------------------------------------
    // Extrinsic 链：裁军验证（注解 + 奖励两步，非原子）
    // ---------------------------------------------------------------------

    /// 记录裁军验证注解，确认后再记录奖励和平行动
    ///
    /// 奖励 = 数量 × 单位奖励。第二步失败时第一步不会回滚，
    /// 错误中携带已确认的注解交易哈希。
    pub async fn verify_disarmament(
        &self,
        country: &str,
        weapon_type: &str,
        quantity: u64,
        evidence: &str,
    ) -> Result<DisarmamentVerification, DisarmamentError> {
        if quantity == 0 {
            return Err(DisarmamentError::AnnotationFailed(invalid(
                "quantity must be greater than 0",
            )));
        }
        let reward = quantity
            .checked_mul(self.policy().disarmament_unit_reward)
            .ok_or_else(|| DisarmamentError::AnnotationFailed(invalid("reward overflows u64")))?;

        let verifier = self
            .connections
            .status(ChainId::ExtrinsicChain)
            .await
            .ensure_writable()
            .map(|identity| identity.address.clone())
            .map_err(DisarmamentError::AnnotationFailed)?;

        let annotation = AnnotationPayload::DisarmamentVerification {
            country: country.to_string(),
            weapon_type: weapon_type.to_string(),
            quantity,
            evidence: evidence.to_string(),
            verifier: verifier.clone(),
            timestamp: now_timestamp(),
        };
        let confirmed = self
            .pipeline
            .submit_annotation(&annotation)
            .await
            .map_err(DisarmamentError::AnnotationFailed)?;

        info!(
            tx_hash = %confirmed.tx_hash,
            block_number = confirmed.block_number,
            "Disarmament annotation confirmed"
        );

        let reward_action = self
            .record_disarmament_reward(country, weapon_type, quantity, reward, &verifier)
            .await
            .map_err(|source| {
                warn!(
                    annotation_tx_hash = %confirmed.tx_hash,
                    error = %source,
                    "Disarmament reward failed after annotation was recorded"
                );
                DisarmamentError::RewardFailed {
                    annotation_tx_hash: confirmed.tx_hash.clone(),
                    source,
                }
            })?;

        Ok(DisarmamentVerification {
            country: country.to_string(),
            weapon_type: weapon_type.to_string(),
            quantity,
            annotation_tx_hash: confirmed.tx_hash,
            annotation_block: Some(confirmed.block_number),
            reward_action,
        })
    }

    async fn record_disarmament_reward(
        &self,
        country: &str,
        weapon_type: &str,
        quantity: u64,
        reward: u64,
        verifier: &str,
    ) -> Result<PeaceActionRecord, SubmitError> {
        let description = format!(
            "Verified disarmament of {} {} by {}",
            quantity, weapon_type, country
        );
        let payload = AnnotationPayload::PeaceAction {
            actor: country.to_string(),
            action_type: DISARMAMENT_ACTION_TYPE.to_string(),
            description: description.clone(),
            reward: reward.to_string(),
            verifier: verifier.to_string(),
            timestamp: now_timestamp(),
        };
        let timestamp = payload_time(&payload)?;

        let ConfirmedAnnotation {
            tx_hash,
            block_number,
            signer,
        } = self.pipeline.submit_annotation(&payload).await?;

        Ok(PeaceActionRecord {
            action_id: tx_hash.clone(),
            actor: country.to_string(),
            action_type: DISARMAMENT_ACTION_TYPE.to_string(),
            description,
            reward: reward.to_string(),
            verifier: signer,
            timestamp,
            transaction_hash: tx_hash,
            block_number,
        })
    }

    // ---------------------------------------------------------------------
    // 查询
    // ---------------------------------------------------------------------

    /// 按配置的窗口扫描地址的交易历史
    pub async fn get_transaction_history(
        &self,
        address: &str,
    ) -> Result<Vec<BlockchainTransaction>, ScanError> {
        self.get_transaction_history_window(address, self.policy().history_window_blocks)
            .await
    }

    pub async fn get_transaction_history_window(
        &self,
        address: &str,
        window: u64,
    ) -> Result<Vec<BlockchainTransaction>, ScanError> {
        self.scanner.get_transaction_history(address, window).await
    }

    /// 惰性历史流，供调用方边扫边处理
    pub async fn scan_history(
        &self,
        address: &str,
        window: u64,
    ) -> Result<BoxStream<'static, Result<BlockchainTransaction, ScanError>>, ScanError> {
        self.scanner.scan_history(address, window).await
    }

    pub async fn get_network_stats(&self) -> Result<NetworkStats, StatsError> {
        self.stats.get_network_stats().await
    }
}
