//! 基础设施资源管理
//!
//! 启动时创建 Registry 客户端与 Kafka 传输层，检查连通性

use std::sync::Arc;

use courier_adapter_kafka::{KafkaProducerConfig, KafkaTransport, check_kafka_health_async};
use courier_adapter_schema_registry::HttpSchemaRegistry;
use courier_config::AppConfig;
use courier_errors::{AppError, AppResult};
use courier_ports::{MessageTransport, SchemaRegistry};
use courier_schema::SchemaProvider;
use courier_telemetry::HealthStatus;
use tracing::info;

use crate::retry::{RetryConfig, is_transient, with_retry};

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// Schema Registry 客户端
    registry: Arc<HttpSchemaRegistry>,
    /// Kafka 传输层
    transport: Arc<KafkaTransport>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    ///
    /// Registry 或 Broker 不可达时返回启动错误
    pub async fn from_config(config: AppConfig, retry: &RetryConfig) -> AppResult<Self> {
        let mut health = HealthStatus::new();
        let mut first_error: Option<AppError> = None;

        // 1. Schema Registry
        let registry = Arc::new(HttpSchemaRegistry::from_config(&config.schema_registry)?);
        let registry_check = with_retry(retry, "Schema registry check", is_transient, || {
            registry.check()
        })
        .await;
        match registry_check {
            Ok(()) => health.add_check("schema_registry", true, None),
            Err(e) => {
                health.add_check("schema_registry", false, Some(e.to_string()));
                first_error.get_or_insert(e);
            }
        }

        // 2. Kafka producer
        let kafka_config = KafkaProducerConfig::from_app_config(&config)?;
        let transport = Arc::new(
            with_retry(retry, "Kafka producer creation", is_transient, || {
                let cfg = kafka_config.clone();
                async move { KafkaTransport::new(&cfg) }
            })
            .await?,
        );

        // 3. Broker 元数据
        let topic = config.producer.topic.clone();
        let timeout = config.kafka.request_timeout();
        let broker_check = with_retry(retry, "Kafka health check", is_transient, || {
            let cfg = kafka_config.clone();
            let topic = topic.clone();
            async move {
                let result = check_kafka_health_async(cfg, topic, timeout).await?;
                if result.healthy {
                    Ok(result)
                } else {
                    Err(AppError::connection(
                        result
                            .error
                            .unwrap_or_else(|| "no brokers available".to_string()),
                    ))
                }
            }
        })
        .await;
        match broker_check {
            Ok(result) => {
                let message = match result.topic_partitions {
                    Some(partitions) => format!("topic {} has {} partitions", topic, partitions),
                    // 可能由 broker 自动创建
                    None => format!("topic {} not found", topic),
                };
                health.add_check("kafka", true, Some(message));
            }
            Err(e) => {
                health.add_check("kafka", false, Some(e.to_string()));
                first_error.get_or_insert(e);
            }
        }

        health.log();
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            brokers = %config.kafka.brokers,
            registry = %registry.base_url(),
            topic = %config.producer.topic,
            "Infrastructure initialized"
        );

        Ok(Self {
            config,
            registry,
            transport,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn schema_registry(&self) -> Arc<dyn SchemaRegistry> {
        self.registry.clone()
    }

    pub fn transport(&self) -> Arc<dyn MessageTransport> {
        self.transport.clone()
    }

    /// 按配置创建 Schema Provider
    pub fn schema_provider(&self) -> SchemaProvider {
        SchemaProvider::new(self.schema_registry())
            .with_strategy(self.config.schema_registry.subject_strategy)
            .with_auto_register(self.config.schema_registry.auto_register)
    }
}
