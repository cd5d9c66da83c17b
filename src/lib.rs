/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 功能聚合模块（网关侧）
pub mod features;

/// 上传客户端（控制器 + 网关调用）
pub mod client;

/// 应用状态聚合模块
pub mod state;

/// 路由组装
pub mod app;

/// OpenAPI 文档
pub mod openapi;

/// 请求追踪 ID 中间件
pub mod request_id;

/// CORS 中间件构建
pub mod cors;

/// 优雅退出
pub mod shutdown;

/// HTTP Client 构建工具
pub mod http;

// 导出常用类型供外部使用
pub use app::build_app;
pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
