use std::sync::Arc;

use crate::config::RemovalConfig;
use crate::features::removal::UpstreamClient;

/// 聚合的应用共享状态（启动时构建，请求期间只读）
#[derive(Clone)]
pub struct AppState {
    /// 抠图网关配置（服务令牌、上游地址等）
    pub removal: Arc<RemovalConfig>,
    /// 上游抠图服务客户端
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    /// 依据配置构建状态，上游 HTTP Client 使用配置中的超时。
    pub fn from_config(removal: RemovalConfig) -> Result<Self, reqwest::Error> {
        let http = crate::http::build_client(removal.upstream_timeout())?;
        Ok(Self::with_client(removal, http))
    }

    /// 使用外部提供的 HTTP Client 构建状态。
    pub fn with_client(removal: RemovalConfig, http: reqwest::Client) -> Self {
        let upstream = UpstreamClient::new(http, &removal);
        Self {
            removal: Arc::new(removal),
            upstream: Arc::new(upstream),
        }
    }
}
