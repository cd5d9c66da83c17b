/// 健康检查
pub mod health;

/// 抠图网关（鉴权 + 转发上游）
pub mod removal;
