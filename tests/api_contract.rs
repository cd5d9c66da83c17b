use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};
use utoipa::OpenApi;

/// 错误响应契约：`{ error, detail?, code }` + `Cache-Control: no-store`。
#[tokio::test]
async fn upstream_failure_into_response_keeps_contract() {
    let resp = bg_remover::AppError::UpstreamFailure {
        status: StatusCode::TOO_MANY_REQUESTS,
        detail: "slow down".to_string(),
    }
    .into_response();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("missing Content-Type")
        .to_str()
        .expect("invalid Content-Type");
    assert_eq!(content_type, "application/json");
    assert_eq!(
        resp.headers().get(header::CACHE_CONTROL).expect("missing Cache-Control"),
        "no-store"
    );

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");

    assert_eq!(v["error"], "Background removal failed");
    assert_eq!(v["detail"], "slow down");
    assert_eq!(v["code"], "UPSTREAM_FAILURE");
    // 请求上下文之外没有 requestId
    assert!(v.get("requestId").is_none());
}

/// 无诊断细节的错误不输出 detail 字段。
#[tokio::test]
async fn unauthorized_has_no_detail() {
    let resp = bg_remover::AppError::Authentication.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");
    assert_eq!(v["error"], "Unauthorized");
    assert!(v.get("detail").is_none());
}

/// 对外 JSON 字段命名统一 camelCase。
#[test]
fn removal_response_serializes_as_camel_case() {
    let resp = bg_remover::features::removal::RemovalResult::new(vec![1u8, 2, 3], None).to_response();
    let v = serde_json::to_value(resp).expect("serialize json");

    assert_eq!(v["imageBase64"], "AQID");
    assert_eq!(v["contentType"], "image/png");
    assert!(v.get("image_base64").is_none());
}

#[test]
fn openapi_documents_removal_endpoint() {
    let doc = serde_json::to_value(bg_remover::openapi::ApiDoc::openapi()).expect("serialize openapi");
    let op = &doc["paths"]["/remove-background"]["post"];
    assert!(op.is_object(), "missing POST /remove-background");
    for status in ["200", "400", "401", "413", "500"] {
        assert!(op["responses"].get(status).is_some(), "missing response {status}");
    }
    assert!(doc["components"]["schemas"].get("RemovalResponse").is_some());
    assert!(doc["components"]["schemas"].get("ErrorBody").is_some());
}
