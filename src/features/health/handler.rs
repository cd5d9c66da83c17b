use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 服务状态
    #[schema(example = "healthy")]
    pub status: String,
    /// 服务名称
    #[schema(example = "bg-remover")]
    pub service: String,
    /// 当前版本（Cargo package version）
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 是否已配置服务令牌（未配置时抠图接口一律返回 500）
    pub auth_configured: bool,
    /// 是否已配置上游抠图服务地址
    pub upstream_configured: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "用于探活的健康检查端点，返回服务状态、版本信息以及关键配置是否就绪（不含任何密钥内容）。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_configured: state.removal.service_token().is_some(),
        upstream_configured: state.upstream.endpoint().is_ok(),
    })
}

pub fn create_health_router() -> Router<AppState> {
    Router::<AppState>::new().route("/health", get(health_check))
}
