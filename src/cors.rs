use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfig;

/// 配置列表解析结果：`*` 通配或具体值集合。
#[derive(Debug, PartialEq)]
enum ListSpec<T> {
    Any,
    Exact(Vec<T>),
}

impl<T> ListSpec<T> {
    fn is_any(&self) -> bool {
        matches!(self, ListSpec::Any)
    }
}

/// 解析配置中的字符串列表；无效值记录警告后跳过。
fn parse_list<T>(label: &str, values: &[String], parse: impl Fn(&str) -> Option<T>) -> ListSpec<T> {
    let mut out = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if value == "*" {
            return ListSpec::Any;
        }
        match parse(value) {
            Some(v) => out.push(v),
            None => tracing::warn!("CORS {} 含无效值: {}", label, value),
        }
    }
    ListSpec::Exact(out)
}

/// 根据配置构建 CORS 中间件；未启用或配置无效时返回 `None`。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origins = parse_list("allowed_origins", &cors.allowed_origins, |v| {
        HeaderValue::from_str(v).ok()
    });
    let methods = parse_list("allowed_methods", &cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });
    let headers = parse_list("allowed_headers", &cors.allowed_headers, |v| {
        HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok()
    });

    if origins == ListSpec::Exact(Vec::new()) {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }
    if cors.allow_credentials && (origins.is_any() || methods.is_any() || headers.is_any()) {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new()
        .allow_origin(match origins {
            ListSpec::Any => AllowOrigin::from(Any),
            ListSpec::Exact(list) => AllowOrigin::list(list),
        })
        .allow_methods(match methods {
            ListSpec::Any => AllowMethods::from(Any),
            // 未显式配置时至少放行抠图接口所需的 POST。
            ListSpec::Exact(list) if list.is_empty() => AllowMethods::list([Method::POST]),
            ListSpec::Exact(list) => AllowMethods::list(list),
        });

    layer = match headers {
        ListSpec::Any => layer.allow_headers(AllowHeaders::from(Any)),
        ListSpec::Exact(list) if list.is_empty() => layer,
        ListSpec::Exact(list) => layer.allow_headers(AllowHeaders::list(list)),
    };

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    if let Some(secs) = cors.max_age_secs.filter(|s| *s > 0) {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}
