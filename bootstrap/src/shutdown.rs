//! Graceful Shutdown

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::runtime::shutdown_signal;

/// Shutdown 控制器
///
/// 克隆后共享同一个取消状态
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Triggering shutdown");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 供下游等待的取消令牌
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 等待关闭
    pub fn wait(&self) -> impl Future<Output = ()> + Send + '_ {
        self.token.cancelled()
    }

    /// 收到进程信号时触发关闭
    pub fn spawn_signal_handler(&self) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => controller.shutdown(),
                _ = controller.wait() => {}
            }
        })
    }
}
