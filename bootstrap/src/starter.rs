//! 服务启动器

use std::future::Future;

use courier_config::AppConfig;
use courier_errors::AppResult;
use tracing::info;

use crate::infrastructure::Infrastructure;
use crate::retry::RetryConfig;
use crate::runtime::init_runtime;
use crate::shutdown::ShutdownController;

/// 运行 Producer 服务
///
/// 1. 读取 `.env` 并加载配置
/// 2. 初始化日志与 metrics
/// 3. 监听关闭信号
/// 4. 创建基础设施（Registry、Kafka）并检查连通性
/// 5. 调用闭包运行业务逻辑
///
/// ```ignore
/// run_producer("config", |infra, shutdown| async move {
///     let service = MyService::new(&infra).await?;
///     service.run(shutdown.token()).await
/// })
/// .await
/// ```
pub async fn run_producer<F, Fut>(config_dir: &str, run: F) -> AppResult<()>
where
    F: FnOnce(Infrastructure, ShutdownController) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();

    let config = AppConfig::load(config_dir)?;
    init_runtime(&config)?;

    info!(
        app_name = %config.app_name,
        brokers = %config.kafka.brokers,
        topic = %config.producer.topic,
        "Starting producer"
    );

    let shutdown = ShutdownController::new();
    let signal_handler = shutdown.spawn_signal_handler();

    let result = match Infrastructure::from_config(config, &RetryConfig::default()).await {
        Ok(infra) => run(infra, shutdown.clone()).await,
        Err(e) => Err(e),
    };

    // 结束信号监听任务
    shutdown.shutdown();
    let _ = signal_handler.await;

    result
}
