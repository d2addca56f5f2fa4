//! User Producer 入口

use std::process::ExitCode;

use courier_bootstrap::run_producer;

#[tokio::main]
async fn main() -> ExitCode {
    match run_producer("config", user_producer::run).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 日志可能尚未初始化
            eprintln!("user-producer: {}", e);
            tracing::error!(error = %e, "Producer aborted");
            ExitCode::from(e.exit_code())
        }
    }
}
