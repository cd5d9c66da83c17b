use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("bg-remover/", env!("CARGO_PKG_VERSION"));

/// 构建带整体超时的 HTTP Client（网关访问上游、bgremove 访问网关共用）。
///
/// `Client` 内部自带连接池且线程安全，启动时构建一次后克隆复用。
/// `timeout` 覆盖发送请求与读取响应体的全过程。
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}
