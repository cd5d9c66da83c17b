//! 优雅退出
//!
//! 监听 SIGINT / SIGTERM（Windows 下为 Ctrl+C），供 `axum::serve(..).with_graceful_shutdown` 使用。

use std::time::Duration;
use tracing::{info, warn};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
}

/// 等待第一个退出信号。
pub async fn wait_for_signal() -> ShutdownReason {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => ShutdownReason::Interrupt,
                    _ = sigterm.recv() => ShutdownReason::Terminate,
                }
            }
            _ => {
                warn!("注册 unix 信号失败，退回 Ctrl+C 监听");
                ctrl_c().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C 监听失败: {}", e);
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}

/// 收到退出信号后再给在途请求 `grace` 的收尾时间，超时则强制退出进程。
pub async fn graceful_signal(grace: Duration) {
    let reason = wait_for_signal().await;
    info!("接收到退出信号: {:?}，开始优雅退出（最长 {}s）", reason, grace.as_secs());

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("优雅退出超时，强制退出");
        std::process::exit(1);
    });
}
