use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
    /// 日志格式：full | compact | pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default)]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 是否允许携带凭证（Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

/// 抠图网关配置。
///
/// 密钥类字段在 `Debug` 输出中会被遮蔽；空字符串一律视为未配置。
#[derive(Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// 调用方访问网关所需的服务令牌
    #[serde(default)]
    pub service_token: Option<String>,
    /// 上游抠图服务地址
    #[serde(default)]
    pub upstream_url: Option<String>,
    /// 上游抠图服务令牌（可选，配置后以 Bearer 方式携带）
    #[serde(default)]
    pub upstream_token: Option<String>,
    /// 上游请求整体超时（秒）
    #[serde(default = "RemovalConfig::default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
    /// 上传请求体大小上限（字节）
    #[serde(default = "RemovalConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl RemovalConfig {
    fn default_upstream_timeout() -> u64 {
        60
    }

    fn default_max_upload_bytes() -> usize {
        25 * 1024 * 1024
    }

    pub fn service_token(&self) -> Option<&str> {
        non_empty(self.service_token.as_deref())
    }

    pub fn upstream_url(&self) -> Option<&str> {
        non_empty(self.upstream_url.as_deref())
    }

    pub fn upstream_token(&self) -> Option<&str> {
        non_empty(self.upstream_token.as_deref())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            service_token: None,
            upstream_url: None,
            upstream_token: None,
            upstream_timeout_secs: Self::default_upstream_timeout(),
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

impl fmt::Debug for RemovalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalConfig")
            .field("service_token", &redact(self.service_token()))
            .field("upstream_url", &self.upstream_url)
            .field("upstream_token", &redact(self.upstream_token()))
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

/// 上传客户端（bgremove 命令行）配置
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// 网关抠图接口完整地址
    #[serde(default = "ClientConfig::default_gateway_url")]
    pub gateway_url: String,
    /// 默认携带的服务令牌
    #[serde(default)]
    pub default_service_token: Option<String>,
    /// 单次请求超时（秒）
    #[serde(default = "ClientConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    fn default_gateway_url() -> String {
        "http://127.0.0.1:3000/api/remove-background".to_string()
    }

    fn default_timeout() -> u64 {
        90
    }

    pub fn default_service_token(&self) -> Option<&str> {
        non_empty(self.default_service_token.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: Self::default_gateway_url(),
            default_service_token: None,
            timeout_secs: Self::default_timeout(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("gateway_url", &self.gateway_url)
            .field(
                "default_service_token",
                &redact(self.default_service_token()),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 抠图网关配置
    #[serde(default)]
    pub removal: RemovalConfig,
    /// 上传客户端配置
    #[serde(default)]
    pub client: ClientConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

/// 旧部署方式沿用的环境变量名（仅在 APP_* 未提供时兜底）。
const LEGACY_SERVICE_TOKEN: &str = "SERVICE_API_TOKEN";
const LEGACY_UPSTREAM_URL: &str = "WITHOUTBG_API_URL";
const LEGACY_UPSTREAM_TOKEN: &str = "WITHOUTBG_API_TOKEN";
const LEGACY_CLIENT_TOKENS: [&str; 2] = [
    "NEXT_PUBLIC_DEFAULT_SERVICE_TOKEN",
    "DEFAULT_SERVICE_TOKEN",
];

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖。
    ///
    /// 配置文件可缺省；`APP_REMOVAL__SERVICE_TOKEN` 这类变量以 `__` 分隔层级。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path.as_path()).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = builder.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());

        tracing::debug!("配置加载完成: removal = {:?}", config.removal);

        Ok(config)
    }

    /// 从 TOML 文本构建配置（不读取环境变量）。
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// 用旧环境变量名补齐未配置的字段。
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup_non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.removal.service_token().is_none() {
            self.removal.service_token = lookup_non_empty(LEGACY_SERVICE_TOKEN);
        }
        if self.removal.upstream_url().is_none() {
            self.removal.upstream_url = lookup_non_empty(LEGACY_UPSTREAM_URL);
        }
        if self.removal.upstream_token().is_none() {
            self.removal.upstream_token = lookup_non_empty(LEGACY_UPSTREAM_TOKEN);
        }
        if self.client.default_service_token().is_none() {
            self.client.default_service_token =
                LEGACY_CLIENT_TOKENS.iter().find_map(|k| lookup_non_empty(*k));
        }
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 抠图接口的完整挂载路径
    pub fn removal_path(&self) -> String {
        format!(
            "{}/remove-background",
            self.api.prefix.trim_end_matches('/')
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn redact(value: Option<&str>) -> &'static str {
    match value {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_falls_back_to_defaults() {
        let cfg = AppConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(cfg.server_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.removal_path(), "/api/remove-background");
        assert_eq!(cfg.removal.upstream_timeout_secs, 60);
        assert!(cfg.removal.service_token().is_none());
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [removal]
            service_token = ""
            upstream_url = "https://bg.example/remove"
            upstream_token = ""
            "#,
        )
        .expect("parse config");
        assert!(cfg.removal.service_token().is_none());
        assert!(cfg.removal.upstream_token().is_none());
        assert_eq!(
            cfg.removal.upstream_url(),
            Some("https://bg.example/remove")
        );
    }

    #[test]
    fn legacy_env_only_fills_missing_values() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
            [removal]
            service_token = "from-file"
            "#,
        )
        .expect("parse config");

        let env: HashMap<&str, &str> = HashMap::from([
            ("SERVICE_API_TOKEN", "legacy-token"),
            ("WITHOUTBG_API_URL", "https://legacy.example/remove"),
            ("WITHOUTBG_API_TOKEN", ""),
            ("DEFAULT_SERVICE_TOKEN", "client-token"),
        ]);
        cfg.apply_legacy_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.removal.service_token(), Some("from-file"));
        assert_eq!(
            cfg.removal.upstream_url(),
            Some("https://legacy.example/remove")
        );
        assert!(cfg.removal.upstream_token().is_none());
        assert_eq!(cfg.client.default_service_token(), Some("client-token"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [removal]
            service_token = "super-secret"
            upstream_token = "upstream-secret"
            "#,
        )
        .expect("parse config");
        let dbg = format!("{:?}", cfg.removal);
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("upstream-secret"));
        assert!(dbg.contains("<set>"));
    }
}
