//! Kafka 消息传输
//!
//! 提交立即返回确认 future，重试交给 librdkafka（默认关闭）

use courier_errors::{AppError, AppResult};
use courier_ports::{AckFuture, DeliveryAck, Envelope, MessageTransport};
use futures::FutureExt;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, info, warn};

use crate::config::KafkaProducerConfig;

/// 基于 rdkafka FutureProducer 的传输层
pub struct KafkaTransport {
    producer: FutureProducer,
}

impl KafkaTransport {
    /// 创建传输层
    pub fn new(config: &KafkaProducerConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let producer: FutureProducer = client_config.create().map_err(|e| {
            AppError::connection(format!("Failed to create Kafka producer: {}", e))
        })?;

        info!(brokers = %config.brokers, "Kafka producer created");

        Ok(Self { producer })
    }
}

impl MessageTransport for KafkaTransport {
    fn submit(&self, envelope: Envelope) -> AckFuture {
        let topic = envelope.topic.clone();

        let mut record: FutureRecord<'_, [u8], [u8]> =
            FutureRecord::to(&envelope.topic).payload(&envelope.value[..]);
        if let Some(key) = envelope.key.as_deref() {
            record = record.key(key);
        }

        let delivery = match self.producer.send_result(record) {
            Ok(delivery) => delivery,
            Err((e, _)) => {
                warn!(topic = %topic, error = %e, "Kafka rejected message");
                let error = match e {
                    KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull) => {
                        AppError::queue_full(format!("librdkafka queue full: {}", e))
                    }
                    other => AppError::delivery(other.to_string()),
                };
                return futures::future::ready(Err(error)).boxed();
            }
        };

        async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => {
                    debug!(topic = %topic, partition, offset, "Message acknowledged");
                    Ok(DeliveryAck { partition, offset })
                }
                Ok(Err((e, _))) => Err(AppError::delivery(e.to_string())),
                // producer 在确认前被销毁
                Err(_) => Err(AppError::delivery("delivery report dropped")),
            }
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "kafka"
    }
}

impl Drop for KafkaTransport {
    fn drop(&mut self) {
        let pending = self.producer.in_flight_count();
        if pending > 0 {
            warn!(pending, "Kafka producer dropped with unacknowledged messages");
        }
    }
}
