//! 抠图网关处理模块（features/removal）
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};

use super::credential::authenticate;
use super::models::{RemovalResponse, RemovalUpload, UploadedFile};
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const FILE_REQUIRED: &str = "Image file is required";

#[utoipa::path(
    post,
    path = "/remove-background",
    summary = "去除图片背景",
    description = "上传单张图片（multipart 字段 `file`），由网关转发给上游抠图服务，返回 base64 编码的结果图片。上游失败时透传其状态码。需通过 `Authorization: Bearer <token>` 或 `X-Service-Token` 提供服务令牌。",
    request_body(content = RemovalUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "抠图成功（Cache-Control: no-store）", body = RemovalResponse),
        (status = 400, description = "缺少 file 字段或请求体格式错误", body = ErrorBody),
        (status = 401, description = "服务令牌缺失或错误", body = ErrorBody),
        (status = 413, description = "上传文件过大", body = ErrorBody),
        (status = 500, description = "服务端配置缺失或访问上游异常", body = ErrorBody)
    ),
    security(("BearerToken" = []), ("ServiceToken" = [])),
    tag = "Removal"
)]
pub async fn remove_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    // 鉴权先于任何请求体读取
    authenticate(&headers, state.removal.service_token())?;

    let mut multipart = multipart
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e.body_text())))?;
    let file = extract_file(&mut multipart).await?;

    // 上游地址缺失时不发起任何网络请求
    state.upstream.endpoint()?;

    tracing::debug!(
        file_name = file.upload_name(),
        bytes = file.len(),
        "转发图片至上游"
    );
    let result = state.upstream.remove_background(file).await?;

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(result.to_response()),
    ))
}

/// 取出第一个名为 `file` 的文件字段；同名文本字段视为缺失。
async fn extract_file(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Err(AppError::Validation(FILE_REQUIRED.to_string()));
        };
        let media_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedFile::new(Some(file_name), media_type, data));
    }
    Err(AppError::Validation(FILE_REQUIRED.to_string()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

pub fn create_removal_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/remove-background", post(remove_background))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
