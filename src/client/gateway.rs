use std::future::Future;
use std::sync::Arc;

use reqwest::{Client, multipart::Form};
use serde::Deserialize;

use super::error::ClientError;
use crate::config::ClientConfig;
use crate::features::removal::{DEFAULT_IMAGE_TYPE, RemovalResponse, UploadedFile};

/// 一次抠图调用的请求内容（仅存活于单次 HTTP 调用期间）。
#[derive(Debug, Clone)]
pub struct RemovalRequest {
    pub file: UploadedFile,
    /// 可选的服务令牌，非空时以 Bearer 方式携带
    pub credential: Option<String>,
}

/// 抠图网关调用接口；生产实现为 [`HttpGateway`]，测试中可替换为桩实现。
pub trait RemovalGateway: Send + Sync {
    fn remove_background(
        &self,
        request: RemovalRequest,
    ) -> impl Future<Output = Result<RemovalResponse, ClientError>> + Send;
}

impl<G: RemovalGateway> RemovalGateway for Arc<G> {
    fn remove_background(
        &self,
        request: RemovalRequest,
    ) -> impl Future<Output = Result<RemovalResponse, ClientError>> + Send {
        self.as_ref().remove_background(request)
    }
}

/// 网关响应体：成功与失败共用，字段均可缺省。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayPayload {
    image_base64: Option<String>,
    content_type: Option<String>,
    error: Option<String>,
}

/// 基于 reqwest 的网关客户端。
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    url: String,
}

impl HttpGateway {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = crate::http::build_client(config.timeout())?;
        Ok(Self::new(http, config.gateway_url.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemovalGateway for HttpGateway {
    async fn remove_background(
        &self,
        request: RemovalRequest,
    ) -> Result<RemovalResponse, ClientError> {
        let mut builder = self
            .http
            .post(&self.url)
            .multipart(Form::new().part("file", request.file.multipart_part()));
        if let Some(token) = request.credential.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            // 错误体不是 JSON 时同样给出通用提示
            let payload: GatewayPayload = serde_json::from_slice(&body).unwrap_or_default();
            let message = payload
                .error
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Background removal failed".to_string());
            tracing::debug!(status = status.as_u16(), "网关返回失败: {}", message);
            return Err(ClientError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GatewayPayload = serde_json::from_slice(&body)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        let image_base64 = payload
            .image_base64
            .filter(|b| !b.is_empty())
            .ok_or(ClientError::MissingImageData)?;

        Ok(RemovalResponse {
            image_base64,
            content_type: payload
                .content_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string()),
        })
    }
}
