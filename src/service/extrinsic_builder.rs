//! Extrinsic 构建与签名
//!
//! 生成 v4 签名 extrinsic：
//! `Compact(len) ++ 0x84 ++ MultiAddress::Id ++ MultiSignature::Ed25519 ++ extra ++ call`。
//! extra 为 (不朽 era, Compact nonce, Compact tip[, 元数据哈希模式])，
//! 附加签名数据为 (spec_version, transaction_version, genesis, genesis[, None])。

use blake2::{digest::consts::U32, Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};
use parity_scale_codec::{Compact, Encode};

use crate::utils::ss58;

type Blake2b256 = Blake2b<U32>;

/// 签名 extrinsic 版本号（v4 + 已签名标志位）
const SIGNED_EXTRINSIC_V4: u8 = 0b1000_0100;
/// MultiAddress::Id
const MULTI_ADDRESS_ID: u8 = 0x00;
/// MultiSignature::Ed25519
const MULTI_SIGNATURE_ED25519: u8 = 0x00;
/// 不朽交易的 era 编码
const IMMORTAL_ERA: u8 = 0x00;
/// 签名负载超过该长度时改为对其 blake2-256 哈希签名
const MAX_SIGNED_PAYLOAD_LEN: usize = 256;

/// 链上下文中与签名相关的参数，连接时一次性获取
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrinsicParams {
    pub pallet_index: u8,
    pub call_index: u8,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    pub check_metadata_hash: bool,
}

/// ed25519 签名身份
pub struct ExtrinsicSigner {
    signing_key: SigningKey,
    public_key: [u8; 32],
    address: String,
}

impl std::fmt::Debug for ExtrinsicSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtrinsicSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl ExtrinsicSigner {
    /// 从32字节 hex 种子派生签名密钥
    pub fn from_seed_hex(seed: &str, ss58_prefix: u16) -> Result<Self, String> {
        let bytes = zeroize::Zeroizing::new(
            hex::decode(seed.trim().trim_start_matches("0x"))
                .map_err(|e| format!("seed is not valid hex: {}", e))?,
        );
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("seed must be 32 bytes, got {}", bytes.len()))?;

        Ok(Self::from_seed(&seed, ss58_prefix))
    }

    pub fn from_seed(seed: &[u8; 32], ss58_prefix: u16) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let public_key = signing_key.verifying_key().to_bytes();
        let address = ss58::encode(&public_key, ss58_prefix);

        Self {
            signing_key,
            public_key,
            address,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// extrinsic 哈希：完整编码（含长度前缀）的 blake2-256
pub fn extrinsic_hash(encoded: &[u8]) -> [u8; 32] {
    blake2_256(encoded)
}

/// 承载注解负载的 remark 调用：pallet ++ call ++ Vec<u8>
pub fn remark_call(params: &ExtrinsicParams, payload: &[u8]) -> Vec<u8> {
    let mut call = vec![params.pallet_index, params.call_index];
    payload.encode_to(&mut call);
    call
}

fn signed_extra(params: &ExtrinsicParams, nonce: u32) -> Vec<u8> {
    let mut extra = vec![IMMORTAL_ERA];
    Compact(nonce).encode_to(&mut extra);
    // tip
    Compact(0u128).encode_to(&mut extra);
    if params.check_metadata_hash {
        // 模式：Disabled
        extra.push(0);
    }
    extra
}

fn additional_signed(params: &ExtrinsicParams) -> Vec<u8> {
    let mut additional = Vec::with_capacity(72);
    params.spec_version.encode_to(&mut additional);
    params.transaction_version.encode_to(&mut additional);
    additional.extend_from_slice(&params.genesis_hash);
    // 不朽 era 的出块哈希即创世哈希
    additional.extend_from_slice(&params.genesis_hash);
    if params.check_metadata_hash {
        // Option<H256>::None
        additional.push(0);
    }
    additional
}

/// 构建并签名完整的 extrinsic
pub fn build_signed_extrinsic(
    signer: &ExtrinsicSigner,
    params: &ExtrinsicParams,
    nonce: u32,
    call: &[u8],
) -> Vec<u8> {
    let extra = signed_extra(params, nonce);

    let mut payload = Vec::with_capacity(call.len() + extra.len() + 72);
    payload.extend_from_slice(call);
    payload.extend_from_slice(&extra);
    payload.extend_from_slice(&additional_signed(params));

    let signature = if payload.len() > MAX_SIGNED_PAYLOAD_LEN {
        signer.sign(&blake2_256(&payload))
    } else {
        signer.sign(&payload)
    };

    let mut body = Vec::with_capacity(1 + 33 + 65 + extra.len() + call.len());
    body.push(SIGNED_EXTRINSIC_V4);
    body.push(MULTI_ADDRESS_ID);
    body.extend_from_slice(signer.public_key());
    body.push(MULTI_SIGNATURE_ED25519);
    body.extend_from_slice(&signature);
    body.extend_from_slice(&extra);
    body.extend_from_slice(call);

    // Vec<u8> 的 SCALE 编码即 Compact 长度前缀 + 原始字节
    body.encode()
}
