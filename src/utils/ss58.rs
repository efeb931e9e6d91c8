//! SS58 地址编码（Substrate 账户地址）

use blake2::{Blake2b512, Digest};

const SS58_PREFIX: &[u8] = b"SS58PRE";

fn prefix_bytes(prefix: u16) -> Vec<u8> {
    if prefix < 64 {
        vec![prefix as u8]
    } else {
        // 双字节前缀编码（14位）
        let first = ((prefix & 0b0000_0000_1111_1100) as u8) >> 2;
        let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first | 0b0100_0000, second]
    }
}

fn checksum(data: &[u8]) -> [u8; 2] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    let hash = hasher.finalize();
    [hash[0], hash[1]]
}

/// 将32字节公钥编码为 SS58 地址
pub fn encode(public_key: &[u8; 32], prefix: u16) -> String {
    let mut data = prefix_bytes(prefix);
    data.extend_from_slice(public_key);
    let check = checksum(&data);
    data.extend_from_slice(&check);
    bs58::encode(data).into_string()
}

/// 解码 SS58 地址为32字节公钥，同时校验前缀与校验和
pub fn decode(address: &str, prefix: u16) -> Option<[u8; 32]> {
    let data = bs58::decode(address).into_vec().ok()?;
    let prefix = prefix_bytes(prefix);
    if data.len() != prefix.len() + 32 + 2 || !data.starts_with(&prefix) {
        return None;
    }

    let (body, check) = data.split_at(data.len() - 2);
    if checksum(body) != [check[0], check[1]] {
        return None;
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&body[prefix.len()..]);
    Some(key)
}
