// RPC响应校验模块 - 防止链上数据污染

use crate::error::RpcError;

/// 验证 JSON-RPC 响应格式，返回 result 字段
pub fn validate_rpc_response(json: &serde_json::Value) -> Result<&serde_json::Value, RpcError> {
    // 检查是否有error字段
    if let Some(error) = json.get("error") {
        if !error.is_null() {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            return Err(RpcError::Rpc { code, message });
        }
    }

    // 检查jsonrpc版本
    if let Some(version) = json.get("jsonrpc") {
        if version.as_str() != Some("2.0") {
            return Err(RpcError::InvalidResponse(format!(
                "Unsupported JSON-RPC version: {:?}",
                version
            )));
        }
    }

    json.get("result")
        .ok_or_else(|| RpcError::InvalidResponse("Missing result field".into()))
}

/// 解析0x前缀的十六进制数量（区块号等）
pub fn parse_hex_u64(value: &str) -> Result<u64, RpcError> {
    let hex = value.trim_start_matches("0x");

    // u64最多16个十六进制字符
    if hex.is_empty() || hex.len() > 16 {
        return Err(RpcError::InvalidResponse(format!(
            "Invalid hex quantity: {}",
            value
        )));
    }

    u64::from_str_radix(hex, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("Invalid hex quantity {}: {}", value, e)))
}

/// 解码0x前缀的十六进制字节串
pub fn decode_hex_bytes(value: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| RpcError::InvalidResponse(format!("Invalid hex data: {}", e)))
}

/// 验证32字节哈希（交易哈希、区块哈希）格式，返回规范化的小写形式
pub fn validate_hash(hash: &str) -> Result<String, RpcError> {
    let raw = hash.trim_start_matches("0x");

    if raw.len() != 64 {
        return Err(RpcError::InvalidResponse(format!(
            "Invalid hash length: expected 64, got {}",
            raw.len()
        )));
    }

    if !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RpcError::InvalidResponse(
            "Invalid hash format: contains non-hex characters".into(),
        ));
    }

    Ok(format!("0x{}", raw.to_lowercase()))
}
