//! 运行时初始化

use courier_config::AppConfig;
use courier_errors::AppResult;
use courier_telemetry::{init_metrics, init_tracing, init_tracing_json};
use tracing::{error, info};

/// 初始化日志与 metrics
///
/// 生产环境或显式配置时输出 JSON 日志；配置了 `metrics_addr` 才启动 Prometheus 端点
pub fn init_runtime(config: &AppConfig) -> AppResult<()> {
    if config.telemetry.json || config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    if let Some(addr) = config.telemetry.metrics_addr {
        init_metrics(addr)?;
        info!(addr = %addr, "Prometheus exporter listening");
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );

    Ok(())
}

/// 等待关闭信号（SIGINT / SIGTERM）
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
