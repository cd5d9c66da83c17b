use futures_util::StreamExt;
use reqwest::{Client, Response, header, multipart::Form};

use super::models::{RemovalResult, UploadedFile};
use crate::config::RemovalConfig;
use crate::error::AppError;

/// 上游失败时回传的诊断文本上限（字符数）。
pub const DIAGNOSTIC_LIMIT_CHARS: usize = 500;

/// 上游响应体无法读取时的占位诊断文本。
pub const UNREADABLE_BODY: &str = "no response body";

/// 上游抠图服务客户端。
///
/// 地址与令牌在启动时从配置取得，之后不再变化。
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    endpoint: Option<String>,
    token: Option<String>,
}

impl UpstreamClient {
    pub fn new(http: Client, config: &RemovalConfig) -> Self {
        Self {
            http,
            endpoint: config.upstream_url().map(str::to_string),
            token: config.upstream_token().map(str::to_string),
        }
    }

    /// 上游地址；未配置时返回配置错误。
    pub fn endpoint(&self) -> Result<&str, AppError> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Upstream URL not configured".to_string()))
    }

    /// 将文件转发给上游，并把上游响应翻译为抠图结果或错误。
    pub async fn remove_background(&self, file: UploadedFile) -> Result<RemovalResult, AppError> {
        let endpoint = self.endpoint()?;
        let form = Form::new().part("file", file.multipart_part());

        let mut request = self.http.post(endpoint).multipart(form);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("请求上游抠图服务失败: {}", e);
            AppError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = read_diagnostic(response).await;
            tracing::warn!(status = status.as_u16(), "上游抠图服务返回失败: {}", detail);
            return Err(AppError::UpstreamFailure { status, detail });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await?;

        tracing::info!(
            upload_bytes = file.len(),
            result_bytes = data.len(),
            content_type = content_type.as_deref().unwrap_or("-"),
            "上游抠图完成"
        );

        Ok(RemovalResult::new(data, content_type.as_deref()))
    }
}

/// 读取上游失败响应的前 [`DIAGNOSTIC_LIMIT_CHARS`] 个字符；读取失败时返回占位文本。
async fn read_diagnostic(response: Response) -> String {
    // 每个字符最多 4 字节，读够即可停止，避免把超大错误页整段读入内存。
    let byte_budget = DIAGNOSTIC_LIMIT_CHARS * 4;
    let mut buf = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                buf.extend_from_slice(&bytes);
                if buf.len() >= byte_budget {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("读取上游错误响应失败: {}", e);
                return UNREADABLE_BODY.to_string();
            }
        }
    }

    truncate_chars(&String::from_utf8_lossy(&buf), DIAGNOSTIC_LIMIT_CHARS)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
