//! Kafka 配置模块
//!
//! 把应用配置映射为 librdkafka 属性

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use courier_config::AppConfig;
use courier_errors::{AppError, AppResult};

/// librdkafka `queue.buffering.max.messages` 上限
const MAX_QUEUE_MESSAGES: usize = 10_000_000;

/// 压缩类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Snappy => "snappy",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
        }
    }
}

impl FromStr for CompressionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "gzip" => Ok(CompressionType::Gzip),
            "snappy" => Ok(CompressionType::Snappy),
            "lz4" => Ok(CompressionType::Lz4),
            "zstd" => Ok(CompressionType::Zstd),
            other => Err(AppError::config(format!("Unknown compression type: {}", other))),
        }
    }
}

/// Producer 配置
#[derive(Debug, Clone)]
pub struct KafkaProducerConfig {
    /// Broker 地址列表
    pub brokers: String,
    /// 客户端 ID
    pub client_id: Option<String>,
    /// 压缩类型
    pub compression: CompressionType,
    /// 延迟发送时间（用于批量）
    pub linger_ms: u64,
    /// 确认模式：0=不等待，1=leader确认，-1=所有副本确认
    pub acks: i32,
    /// 重试次数，0 表示失败直接上报
    pub retries: u32,
    /// 请求超时
    pub request_timeout: Duration,
    /// 单条消息从入队到确认的最长时间
    pub message_timeout: Duration,
    /// 幂等性
    pub enable_idempotence: bool,
    /// 本地队列条数上限
    pub queue_max_messages: usize,
    /// 本地队列字节上限
    pub queue_max_bytes: usize,
    /// 额外配置
    pub extra: HashMap<String, String>,
}

impl KafkaProducerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: None,
            compression: CompressionType::default(),
            linger_ms: 5,
            acks: -1,
            retries: 0,
            request_timeout: Duration::from_secs(30),
            message_timeout: Duration::from_secs(300),
            enable_idempotence: false,
            queue_max_messages: 100_000,
            queue_max_bytes: 32 * 1024 * 1024,
            extra: HashMap::new(),
        }
    }

    /// 从应用配置创建
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        let kafka = &config.kafka;
        let mut producer = Self::new(&kafka.brokers)
            .with_client_id(config.client_id())
            .with_compression(kafka.compression.parse()?)
            .with_linger_ms(kafka.linger_ms)
            .with_acks(kafka.acks)
            .with_retries(kafka.retries)
            .with_queue_limits(
                config.producer.buffer_max_messages,
                config.producer.buffer_max_bytes,
            );
        producer.request_timeout = Duration::from_millis(kafka.request_timeout_ms);
        producer.message_timeout = Duration::from_millis(kafka.message_timeout_ms);
        if kafka.enable_idempotence {
            producer = producer.with_idempotence();
        }
        Ok(producer)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_linger_ms(mut self, ms: u64) -> Self {
        self.linger_ms = ms;
        self
    }

    pub fn with_acks(mut self, acks: i32) -> Self {
        self.acks = acks;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_queue_limits(mut self, messages: usize, bytes: usize) -> Self {
        self.queue_max_messages = messages;
        self.queue_max_bytes = bytes;
        self
    }

    pub fn with_idempotence(mut self) -> Self {
        self.enable_idempotence = true;
        self.acks = -1; // 幂等性需要 acks=-1
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// 连接相关的配置项（健康检查复用）
    pub fn connection_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![("bootstrap.servers".to_string(), self.brokers.clone())];

        if let Some(client_id) = &self.client_id {
            entries.push(("client.id".to_string(), client_id.clone()));
        }

        entries
    }

    /// 转换为 rdkafka ClientConfig 的配置项
    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        let mut entries = self.connection_entries();

        entries.push((
            "compression.type".to_string(),
            self.compression.as_str().to_string(),
        ));
        entries.push(("linger.ms".to_string(), self.linger_ms.to_string()));
        entries.push(("acks".to_string(), self.acks.to_string()));
        entries.push((
            "request.timeout.ms".to_string(),
            self.request_timeout.as_millis().to_string(),
        ));
        entries.push((
            "message.timeout.ms".to_string(),
            self.message_timeout.as_millis().to_string(),
        ));
        entries.push((
            "queue.buffering.max.messages".to_string(),
            self.queue_max_messages.clamp(1, MAX_QUEUE_MESSAGES).to_string(),
        ));
        entries.push((
            "queue.buffering.max.kbytes".to_string(),
            self.queue_max_bytes.div_ceil(1024).clamp(1, i32::MAX as usize).to_string(),
        ));

        if self.enable_idempotence {
            // 幂等模式下由 librdkafka 管理重试
            entries.push(("enable.idempotence".to_string(), "true".to_string()));
        } else {
            entries.push(("retries".to_string(), self.retries.to_string()));
        }

        for (key, value) in &self.extra {
            entries.push((key.clone(), value.clone()));
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry<'a>(entries: &'a [(String, String)], key: &str) -> Option<&'a str> {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_producer_config_defaults() {
        let entries = KafkaProducerConfig::new("localhost:29092").to_client_config_entries();

        assert_eq!(entry(&entries, "bootstrap.servers"), Some("localhost:29092"));
        assert_eq!(entry(&entries, "retries"), Some("0"));
        assert_eq!(entry(&entries, "acks"), Some("-1"));
        assert_eq!(entry(&entries, "queue.buffering.max.kbytes"), Some("32768"));
        assert!(entry(&entries, "enable.idempotence").is_none());
    }

    #[test]
    fn test_idempotence_leaves_retries_to_librdkafka() {
        let entries = KafkaProducerConfig::new("localhost:29092")
            .with_acks(1)
            .with_idempotence()
            .to_client_config_entries();

        assert_eq!(entry(&entries, "enable.idempotence"), Some("true"));
        assert_eq!(entry(&entries, "acks"), Some("-1"));
        assert!(entry(&entries, "retries").is_none());
    }

    #[test]
    fn test_from_app_config() {
        let mut app = AppConfig::default();
        app.kafka.compression = "LZ4".to_string();
        app.kafka.retries = 2;
        app.producer.buffer_max_bytes = 1500;
        app.producer.buffer_max_messages = 20_000_000;

        let config = KafkaProducerConfig::from_app_config(&app).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("user-producer"));

        let entries = config.to_client_config_entries();
        assert_eq!(entry(&entries, "compression.type"), Some("lz4"));
        assert_eq!(entry(&entries, "retries"), Some("2"));
        assert_eq!(entry(&entries, "queue.buffering.max.kbytes"), Some("2"));
        assert_eq!(entry(&entries, "queue.buffering.max.messages"), Some("10000000"));
    }

    #[test]
    fn test_unknown_compression_is_config_error() {
        let mut app = AppConfig::default();
        app.kafka.compression = "brotli".to_string();

        let result = KafkaProducerConfig::from_app_config(&app);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
