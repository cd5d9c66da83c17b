use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 网关统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 服务端缺少必需配置（服务令牌 / 上游地址）
    #[error("{0}")]
    Configuration(String),

    /// 调用方未提供或提供了错误的服务令牌
    #[error("Unauthorized")]
    Authentication,

    /// 请求体校验失败
    #[error("{0}")]
    Validation(String),

    /// 上传文件超过大小上限
    #[error("{0}")]
    PayloadTooLarge(String),

    /// 上游返回非成功状态码（透传其状态码）
    #[error("Background removal failed")]
    UpstreamFailure { status: StatusCode, detail: String },

    /// 访问上游时的网络/读取异常
    #[error("Unexpected server error")]
    UpstreamTransport(String),
}

/// 网关错误响应体：`{ error, detail?, code, requestId? }`。
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 人类可读的错误概述
    #[schema(example = "Unauthorized")]
    pub error: String,

    /// 诊断细节（上游响应片段或底层错误文本）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理
    #[schema(example = "UNAUTHORIZED")]
    pub code: String,

    /// 请求追踪 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Authentication => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UpstreamFailure { status, .. } => *status,
            AppError::UpstreamTransport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Authentication => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::UpstreamFailure { .. } => "UPSTREAM_FAILURE",
            AppError::UpstreamTransport(_) => "UPSTREAM_TRANSPORT_ERROR",
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            AppError::UpstreamFailure { detail, .. } => Some(detail.clone()),
            AppError::UpstreamTransport(detail) if !detail.is_empty() => Some(detail.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.stable_code(), status = status.as_u16(), "{}", self);
        } else {
            tracing::debug!(code = self.stable_code(), status = status.as_u16(), "{}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            detail: self.detail(),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(body).into_response();
        *res.status_mut() = status;
        res.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        res
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamTransport(err.to_string())
    }
}
