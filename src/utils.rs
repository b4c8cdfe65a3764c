use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 生成一个随机唯一的卷 ID
pub fn generate_volume_id() -> [u8; 16] {
    *Uuid::new_v4().as_bytes()
}

/// 把卷 ID 格式化为标准 UUID 字符串
pub fn format_volume_id(id: &[u8; 16]) -> String {
    Uuid::from_bytes(*id).to_string()
}
