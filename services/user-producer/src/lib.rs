//! User Producer
//!
//! 从标准输入读取用户名，以 Avro 编码发布到 Kafka，并逐条输出投递结果

pub mod application;
pub mod domain;
pub mod infrastructure;

use std::io::Write;
use std::sync::Arc;

use courier_bootstrap::{Infrastructure, ShutdownController};
use courier_errors::AppResult;
use courier_producer::{DeliveryReporter, ProducerClient, ProducerClientConfig};
use tracing::info;

use crate::application::{InputLoop, UserPublisher, banner};

/// 运行交互式 Producer 直到输入结束或收到关闭信号
pub async fn run(infra: Infrastructure, shutdown: ShutdownController) -> AppResult<()> {
    let config = infra.config();
    let settings = &config.producer;
    let stdin = infrastructure::stdin_reader()?;

    let producer = Arc::new(ProducerClient::new(
        infra.transport(),
        ProducerClientConfig::from_settings(settings),
    ));

    let provider = infra.schema_provider();
    let publisher = match UserPublisher::start(
        &provider,
        producer.clone(),
        DeliveryReporter::console(),
        &settings.topic,
    )
    .await
    {
        Ok(publisher) => publisher,
        Err(e) => {
            producer.close(settings.flush_timeout()).await;
            return Err(e);
        }
    };

    {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(
            stdout,
            "{}",
            banner(config.client_id(), &settings.topic, &settings.sentinel)
        );
    }

    let report = InputLoop::new(publisher, &settings.sentinel, settings.flush_timeout())
        .with_cancellation(shutdown.token())
        .run(stdin)
        .await;

    info!(
        reason = ?report.termination,
        enqueued = report.enqueued,
        rejected = report.rejected,
        flushed = report.close.delivered + report.close.failed,
        timed_out = report.close.timed_out,
        "Producer stopped"
    );

    Ok(())
}
