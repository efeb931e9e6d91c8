//! 时间工具模块

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// ISO-8601 时间戳（毫秒精度，Z结尾），用于注解负载
pub fn iso8601(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 秒级时间戳转 DateTime，超出 chrono 可表示范围时返回 None
pub fn try_from_unix_secs(secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
}

/// 区块时间戳（秒）转 DateTime，越界时回退到 UNIX 纪元
pub fn from_unix_secs(secs: u64) -> DateTime<Utc> {
    try_from_unix_secs(secs).unwrap_or_default()
}
