use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 注入两种等价的服务令牌安全定义：`Authorization: Bearer` 与 `X-Service-Token`。
struct ServiceTokenSecurity;

impl Modify for ServiceTokenSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "ServiceToken",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Service-Token"))),
        );
    }
}

/// 业务接口挂载在 `config.api.prefix` 下，`/health` 不带前缀。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api")
                    .description(Some("对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）")),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（/health）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::removal::handler::remove_background,
    ),
    components(schemas(
        crate::features::removal::models::RemovalUpload,
        crate::features::removal::models::RemovalResponse,
        crate::error::ErrorBody,
        crate::features::health::handler::HealthResponse,
    )),
    modifiers(&ServiceTokenSecurity, &ApiServers),
    tags(
        (name = "Removal", description = "抠图：上传图片，经网关转发上游服务后返回去背景结果。"),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "bg-remover gateway API",
        version = env!("CARGO_PKG_VERSION"),
        description = "抠图网关（Axum + utoipa）。除 /health 外，业务接口实际挂载在 `config.api.prefix`（默认 /api）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_lists_removal_endpoint_and_security() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/remove-background"));
        assert!(doc.paths.paths.contains_key("/health"));
        let schemes = &doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("BearerToken"));
        assert!(schemes.contains_key("ServiceToken"));
    }
}
