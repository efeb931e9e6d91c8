//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{fmt, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account_chain: AccountChainConfig,
    #[serde(default)]
    pub extrinsic_chain: ExtrinsicChainConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 敏感字符串（私钥、种子），Debug输出和释放时均不泄露
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// 账户链（EVM智能合约链）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountChainConfig {
    pub rpc_url: String,
    #[serde(default)]
    pub private_key: Option<Secret>,
    /// 和平行动记录合约地址
    #[serde(default)]
    pub recorder_contract: Option<String>,
    /// 治理合约地址
    #[serde(default)]
    pub governance_contract: Option<String>,
}

/// Extrinsic链（Substrate）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrinsicChainConfig {
    pub rpc_url: String,
    /// 32字节hex编码的ed25519种子
    #[serde(default)]
    pub seed: Option<Secret>,
    pub ss58_prefix: u16,
    /// 承载注解负载的调用：(pallet索引, call索引)，默认 System.remark
    pub remark_pallet_index: u8,
    pub remark_call_index: u8,
    /// 运行时是否要求 CheckMetadataHash 签名扩展
    #[serde(default)]
    pub check_metadata_hash: bool,
}

/// 各操作族超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub submit_secs: u64,
    pub query_secs: u64,
    pub receipt_poll_interval_ms: u64,
}

/// 业务策略常量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// 每件裁军武器对应的和平奖励（链原生单位）
    pub disarmament_unit_reward: u64,
    /// 提案默认紧急程度（1-5）
    pub default_urgency_level: u8,
    /// 历史扫描默认窗口（区块数）
    pub history_window_blocks: u64,
    /// 历史扫描时并发拉取的区块数
    pub history_block_concurrency: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for AccountChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("ACCOUNT_CHAIN_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".into()),
            private_key: env_opt("ACCOUNT_CHAIN_PRIVATE_KEY").map(Secret::new),
            recorder_contract: env_opt("PEACE_RECORDER_CONTRACT"),
            governance_contract: env_opt("GOVERNANCE_CONTRACT"),
        }
    }
}

impl Default for ExtrinsicChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("EXTRINSIC_CHAIN_RPC_URL")
                .unwrap_or_else(|_| "ws://127.0.0.1:9944".into()),
            seed: env_opt("EXTRINSIC_CHAIN_SEED").map(Secret::new),
            ss58_prefix: env_parse("EXTRINSIC_CHAIN_SS58_PREFIX", 42),
            remark_pallet_index: env_parse("EXTRINSIC_REMARK_PALLET_INDEX", 0),
            remark_call_index: env_parse("EXTRINSIC_REMARK_CALL_INDEX", 0),
            check_metadata_hash: std::env::var("EXTRINSIC_CHECK_METADATA_HASH")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: env_parse("CONNECT_TIMEOUT_SECS", 10),
            submit_secs: env_parse("SUBMIT_TIMEOUT_SECS", 120),
            query_secs: env_parse("QUERY_TIMEOUT_SECS", 15),
            receipt_poll_interval_ms: env_parse("RECEIPT_POLL_INTERVAL_MS", 1000),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn submit(&self) -> Duration {
        Duration::from_secs(self.submit_secs)
    }

    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            disarmament_unit_reward: env_parse("DISARMAMENT_UNIT_REWARD", 5000),
            default_urgency_level: env_parse("DEFAULT_URGENCY_LEVEL", 3),
            history_window_blocks: env_parse("HISTORY_WINDOW_BLOCKS", 1000),
            history_block_concurrency: env_parse("HISTORY_BLOCK_CONCURRENCY", 8),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            account_chain: AccountChainConfig::default(),
            extrinsic_chain: ExtrinsicChainConfig::default(),
            timeouts: TimeoutConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    ///
    /// 缺失的私钥/种子/合约地址不算错误：对应写路径降级为不可用
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if !(1..=5).contains(&self.policy.default_urgency_level) {
            anyhow::bail!("DEFAULT_URGENCY_LEVEL must be between 1 and 5");
        }

        if self.policy.disarmament_unit_reward == 0 {
            anyhow::bail!("DISARMAMENT_UNIT_REWARD must be greater than 0");
        }

        if self.policy.history_block_concurrency == 0 {
            anyhow::bail!("HISTORY_BLOCK_CONCURRENCY must be greater than 0");
        }

        let t = &self.timeouts;
        if t.connect_secs == 0 || t.submit_secs == 0 || t.query_secs == 0 {
            anyhow::bail!("Timeouts must be greater than 0 seconds");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        let config = Config::from_env().unwrap();
        assert!(!config.account_chain.rpc_url.is_empty());
        if std::env::var("DISARMAMENT_UNIT_REWARD").is_err() {
            assert_eq!(config.policy.disarmament_unit_reward, 5000);
        }
        if std::env::var("CONNECT_TIMEOUT_SECS").is_err() {
            assert_eq!(config.timeouts.connect(), Duration::from_secs(10));
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[account_chain]
rpc_url = "http://localhost:8545"
private_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
recorder_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[extrinsic_chain]
rpc_url = "ws://localhost:9944"
ss58_prefix = 42
remark_pallet_index = 0
remark_call_index = 7

[timeouts]
connect_secs = 5
submit_secs = 60
query_secs = 10
receipt_poll_interval_ms = 250

[policy]
disarmament_unit_reward = 5000
default_urgency_level = 4
history_window_blocks = 500
history_block_concurrency = 4

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.extrinsic_chain.remark_call_index, 7);
        assert_eq!(config.timeouts.connect(), Duration::from_secs(5));
        assert_eq!(config.policy.default_urgency_level, 4);
        assert!(config.account_chain.governance_contract.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("0xdeadbeef");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "0xdeadbeef");
    }

    #[test]
    fn test_config_validation_rejects_bad_urgency() {
        let mut config = Config::from_env().unwrap();
        config.logging.level = "info".into();
        config.logging.format = "text".into();
        config.policy.default_urgency_level = 9;
        assert!(config.validate().is_err());
    }
}
