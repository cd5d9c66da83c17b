use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

use crate::error::AppError;

pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// 调用方令牌的来源，按 [`CredentialSource::ORDERED`] 依次尝试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer <token>`（scheme 大小写不敏感）
    BearerHeader,
    /// `X-Service-Token: <token>`
    ServiceTokenHeader,
}

impl CredentialSource {
    pub const ORDERED: [CredentialSource; 2] = [
        CredentialSource::BearerHeader,
        CredentialSource::ServiceTokenHeader,
    ];

    /// 从请求头中提取令牌；值缺失、为空或不是合法 UTF-8 时返回 `None`。
    pub fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let token = match self {
            CredentialSource::BearerHeader => {
                let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
                let (scheme, rest) = raw.split_at_checked(7)?;
                scheme.eq_ignore_ascii_case("bearer ").then_some(rest)?
            }
            CredentialSource::ServiceTokenHeader => {
                headers.get(SERVICE_TOKEN_HEADER)?.to_str().ok()?
            }
        };
        (!token.is_empty()).then_some(token)
    }
}

/// 依序尝试各来源，返回第一个非空令牌及其来源。
pub fn extract_caller_token(headers: &HeaderMap) -> Option<(CredentialSource, &str)> {
    CredentialSource::ORDERED
        .iter()
        .find_map(|source| source.extract(headers).map(|token| (*source, token)))
}

/// 校验调用方令牌。
///
/// 服务端未配置令牌时一律返回配置错误（与调用方是否携带令牌无关）。
pub fn authenticate(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        return Err(AppError::Configuration(
            "Service token missing on server".to_string(),
        ));
    };

    let Some((source, provided)) = extract_caller_token(headers) else {
        tracing::debug!("缺少调用方令牌");
        return Err(AppError::Authentication);
    };

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        tracing::debug!(source = ?source, "调用方令牌不匹配");
        Err(AppError::Authentication)
    }
}
