//! User 发布服务
//!
//! 启动时解析 schema；之后每条记录序列化后入队，投递结果交给 Reporter

use std::sync::Arc;
use std::time::Duration;

use courier_errors::{AppError, AppResult};
use courier_producer::{CloseSummary, DeliveryOutcome, DeliveryReporter, ProducerClient};
use courier_schema::{RecordSerializer, SchemaHandle, SchemaProvider};
use tracing::info;

use crate::domain::User;

pub struct UserPublisher {
    topic: String,
    handle: SchemaHandle,
    serializer: RecordSerializer,
    producer: Arc<ProducerClient>,
    reporter: DeliveryReporter,
}

impl UserPublisher {
    /// 解析 User 的 schema 后创建
    ///
    /// Registry 不可用时返回 SchemaUnavailable，此时尚未发送任何消息
    pub async fn start(
        provider: &SchemaProvider,
        producer: Arc<ProducerClient>,
        reporter: DeliveryReporter,
        topic: impl Into<String>,
    ) -> AppResult<Self> {
        let topic = topic.into();
        let handle = provider.resolve::<User>(&topic).await?;

        info!(
            topic = %topic,
            subject = handle.subject().unwrap_or_default(),
            schema_id = handle.id(),
            "User publisher ready"
        );

        Ok(Self {
            topic,
            handle,
            serializer: RecordSerializer::new(),
            producer,
            reporter,
        })
    }

    /// 序列化并入队，不等待投递结果
    ///
    /// 返回错误时该记录没有进入队列
    pub async fn publish(&self, user: &User) -> AppResult<()> {
        let payload = self.serializer.serialize(user, &self.handle)?;
        let pending = self.producer.enqueue(&self.topic, None, payload).await?;
        self.reporter.watch(pending);
        Ok(())
    }

    /// 入队前失败的记录同样输出一行结果
    pub fn report_rejected(&self, cause: AppError) {
        self.reporter.report(DeliveryOutcome::Failure {
            topic: self.topic.clone(),
            cause,
        });
    }

    /// 关闭 Producer 并等待所有结果输出
    pub async fn shutdown(&self, flush_timeout: Duration) -> CloseSummary {
        let summary = self.producer.close(flush_timeout).await;
        self.reporter.drain().await;
        summary
    }
}
