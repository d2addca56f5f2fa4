//! Kafka 健康检查模块
//!
//! 启动时检查 broker 连通性和目标 topic

use std::time::{Duration, Instant};

use courier_errors::{AppError, AppResult};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use tracing::{debug, error};

use crate::config::KafkaProducerConfig;

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    /// 是否健康
    pub healthy: bool,
    /// 延迟（毫秒）
    pub latency_ms: Option<u64>,
    /// 错误信息
    pub error: Option<String>,
    /// Broker 数量
    pub broker_count: usize,
    /// 目标 topic 分区数，topic 不存在时为 None
    pub topic_partitions: Option<usize>,
}

impl HealthCheckResult {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            latency_ms: None,
            error: Some(error.into()),
            broker_count: 0,
            topic_partitions: None,
        }
    }
}

/// Kafka 健康检查器
pub struct KafkaHealthChecker {
    consumer: BaseConsumer,
    timeout: Duration,
}

impl KafkaHealthChecker {
    /// 创建健康检查器
    pub fn new(config: &KafkaProducerConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.connection_entries() {
            client_config.set(&key, &value);
        }

        let consumer: BaseConsumer = client_config.create().map_err(|e| {
            AppError::connection(format!("Failed to create health checker: {}", e))
        })?;

        Ok(Self {
            consumer,
            timeout: Duration::from_secs(10),
        })
    }

    /// 设置超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 执行健康检查（阻塞）
    pub fn check(&self, topic: &str) -> HealthCheckResult {
        let start = Instant::now();

        match self.consumer.fetch_metadata(Some(topic), self.timeout) {
            Ok(metadata) => {
                let latency = start.elapsed().as_millis() as u64;
                let broker_count = metadata.brokers().len();
                let topic_partitions = metadata
                    .topics()
                    .iter()
                    .find(|t| t.name() == topic && t.error().is_none())
                    .map(|t| t.partitions().len());

                debug!(
                    latency_ms = latency,
                    brokers = broker_count,
                    topic = topic,
                    partitions = ?topic_partitions,
                    "Kafka health check passed"
                );

                HealthCheckResult {
                    healthy: broker_count > 0,
                    latency_ms: Some(latency),
                    error: None,
                    broker_count,
                    topic_partitions,
                }
            }
            Err(e) => {
                error!(error = %e, "Kafka health check failed");
                HealthCheckResult::failed(e.to_string())
            }
        }
    }
}

/// 异步健康检查（在后台线程执行）
pub async fn check_kafka_health_async(
    config: KafkaProducerConfig,
    topic: String,
    timeout: Duration,
) -> AppResult<HealthCheckResult> {
    tokio::task::spawn_blocking(move || {
        let checker = KafkaHealthChecker::new(&config)?.with_timeout(timeout);
        Ok(checker.check(&topic))
    })
    .await
    .map_err(|e| AppError::internal(format!("Health check task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result() {
        let result = HealthCheckResult::failed("broker down");

        assert!(!result.healthy);
        assert_eq!(result.error.as_deref(), Some("broker down"));
        assert!(result.topic_partitions.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_unhealthy() {
        let config = KafkaProducerConfig::new("localhost:1");
        let result = check_kafka_health_async(
            config,
            "usertopic".to_string(),
            Duration::from_millis(200),
        )
        .await
        .unwrap();

        assert!(!result.healthy);
        assert!(result.error.is_some());
    }

    #[test]
    #[ignore] // 需要 Kafka 实例
    fn test_health_checker() {
        let config = KafkaProducerConfig::new("localhost:29092");
        let checker = KafkaHealthChecker::new(&config).unwrap();
        let result = checker.check("usertopic");
        println!("Health check result: {:?}", result);
    }
}
