//! telemetry - 可观测性库
//!
//! 日志统一输出到 stderr，stdout 留给面向操作员的输出

use std::net::SocketAddr;

use courier_errors::{AppError, AppResult};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub mod metrics;

/// 初始化 tracing
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// 初始化 Prometheus metrics 并在 `addr` 上暴露抓取端点
///
/// 必须在 tokio 运行时内调用
pub fn init_metrics(addr: SocketAddr) -> AppResult<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::config(format!("Failed to install Prometheus exporter: {}", e)))
}

/// 健康检查状态
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            healthy: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, name: impl Into<String>, healthy: bool, message: Option<String>) {
        if !healthy {
            self.healthy = false;
        }
        self.checks.push(HealthCheck {
            name: name.into(),
            healthy,
            message,
        });
    }

    /// 第一个失败的检查项
    pub fn first_failure(&self) -> Option<&HealthCheck> {
        self.checks.iter().find(|check| !check.healthy)
    }

    /// 逐项输出检查结果
    pub fn log(&self) {
        for check in &self.checks {
            if check.healthy {
                tracing::info!(check = %check.name, "Startup check passed");
            } else {
                tracing::error!(
                    check = %check.name,
                    message = check.message.as_deref().unwrap_or(""),
                    "Startup check failed"
                );
            }
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}
