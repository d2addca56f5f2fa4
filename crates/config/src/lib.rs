//! courier-config - 配置加载库
//!
//! 加载顺序：`default.toml` → `{APP_ENV}.toml` → `COURIER_` 前缀环境变量（`__` 分隔层级）

use std::net::SocketAddr;
use std::time::Duration;

use courier_errors::AppError;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::config(err.to_string())
    }
}

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default)]
    pub client_id: Option<String>,
    /// 确认模式：0=不等待，1=leader确认，-1=所有副本确认
    #[serde(default = "default_acks")]
    pub acks: i32,
    /// 默认不自动重试；开启后可能产生重复投递
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub enable_idempotence: bool,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

fn default_brokers() -> String {
    "localhost:29092".to_string()
}

fn default_acks() -> i32 {
    -1
}

fn default_compression() -> String {
    "none".to_string()
}

fn default_linger_ms() -> u64 {
    5
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_message_timeout_ms() -> u64 {
    300_000
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: None,
            acks: default_acks(),
            retries: 0,
            enable_idempotence: false,
            compression: default_compression(),
            linger_ms: default_linger_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            message_timeout_ms: default_message_timeout_ms(),
        }
    }
}

impl KafkaConfig {
    /// Broker 请求超时，启动时的元数据检查也使用它
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Subject 命名策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectNameStrategy {
    /// `{topic}-value`
    #[default]
    Topic,
    /// 记录全名
    Record,
    /// `{topic}-{记录全名}`
    TopicRecord,
}

impl SubjectNameStrategy {
    pub fn subject(&self, topic: &str, record_full_name: &str) -> String {
        match self {
            Self::Topic => format!("{}-value", topic),
            Self::Record => record_full_name.to_string(),
            Self::TopicRecord => format!("{}-{}", topic, record_full_name),
        }
    }
}

/// Schema Registry 配置
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default)]
    pub basic_auth_user: Option<String>,
    #[serde(default)]
    pub basic_auth_password: Option<Secret<String>>,
    #[serde(default = "default_registry_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 缓存未命中时自动注册 schema
    #[serde(default = "default_true")]
    pub auto_register: bool,
    #[serde(default)]
    pub subject_strategy: SubjectNameStrategy,
}

fn default_registry_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_registry_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SchemaRegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            basic_auth_user: None,
            basic_auth_password: None,
            request_timeout_secs: default_registry_timeout_secs(),
            auto_register: true,
            subject_strategy: SubjectNameStrategy::default(),
        }
    }
}

impl SchemaRegistryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 缓冲区满时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFullPolicy {
    /// 挂起 enqueue 直到缓冲区释放空间
    #[default]
    Block,
    /// 立即返回 QueueFull
    Reject,
}

/// Producer 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProducerSettings {
    #[serde(default = "default_topic")]
    pub topic: String,
    /// 未完成投递消息的字节上限（key + value）
    #[serde(default = "default_buffer_max_bytes")]
    pub buffer_max_bytes: usize,
    /// 未完成投递消息的条数上限
    #[serde(default = "default_buffer_max_messages")]
    pub buffer_max_messages: usize,
    #[serde(default)]
    pub queue_full: QueueFullPolicy,
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

fn default_topic() -> String {
    "usertopic".to_string()
}

fn default_buffer_max_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_buffer_max_messages() -> usize {
    100_000
}

fn default_flush_timeout_ms() -> u64 {
    10_000
}

fn default_sentinel() -> String {
    "q".to_string()
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            buffer_max_bytes: default_buffer_max_bytes(),
            buffer_max_messages: default_buffer_max_messages(),
            queue_full: QueueFullPolicy::default(),
            flush_timeout_ms: default_flush_timeout_ms(),
            sentinel: default_sentinel(),
        }
    }
}

impl ProducerSettings {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
    /// 配置后启动 Prometheus 导出端点
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics_addr: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub schema_registry: SchemaRegistryConfig,
    #[serde(default)]
    pub producer: ProducerSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_name() -> String {
    "user-producer".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_env: default_app_env(),
            kafka: KafkaConfig::default(),
            schema_registry: SchemaRegistryConfig::default(),
            producer: ProducerSettings::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("COURIER_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// 校验必填项与缓冲区上限
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kafka.brokers.trim().is_empty() {
            return Err(ConfigError::Invalid("kafka.brokers must not be empty".into()));
        }
        if self.producer.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("producer.topic must not be empty".into()));
        }
        if self.producer.sentinel.is_empty() {
            return Err(ConfigError::Invalid("producer.sentinel must not be empty".into()));
        }
        if self.producer.buffer_max_bytes == 0 || self.producer.buffer_max_messages == 0 {
            return Err(ConfigError::Invalid(
                "producer buffer limits must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// 未显式配置时使用应用名作为 client.id
    pub fn client_id(&self) -> &str {
        self.kafka.client_id.as_deref().unwrap_or(&self.app_name)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

#[cfg(test)]
mod tests;
