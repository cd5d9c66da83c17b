use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::features::{health::create_health_router, removal::create_removal_router};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整的 HTTP 应用：路由、文档、request_id、访问日志与可选 CORS。
pub fn build_app(config: &AppConfig, state: AppState) -> Router {
    let api_router = create_removal_router(config.removal.max_upload_bytes);
    // axum 不允许在根路径 nest，前缀为空时直接 merge
    let prefix = config.api.prefix.trim_end_matches('/');
    let routes = if prefix.is_empty() {
        create_health_router().merge(api_router)
    } else {
        create_health_router().nest(prefix, api_router)
    };

    let mut app = routes
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    // request_id 放在最外层，保证访问日志与错误响应都能拿到它
    app.layer(axum::middleware::from_fn(request_id_middleware))
}
