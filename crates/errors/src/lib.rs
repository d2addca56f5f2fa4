//! courier-errors - 统一错误处理
//!
//! 区分启动期致命错误与单条消息错误：前者终止进程，后者只影响对应的投递结果

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Producer client is closed")]
    ClientClosed,

    #[error("Queue full: {0}")]
    QueueFull(String),

    #[error("Delivery not acknowledged before flush timeout")]
    FlushTimeout,

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn schema_unavailable(msg: impl Into<String>) -> Self {
        Self::SchemaUnavailable(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn queue_full(msg: impl Into<String>) -> Self {
        Self::QueueFull(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 是否为启动期致命错误（配置、Schema、Broker 连接）
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::SchemaUnavailable(_) | Self::Connection(_) | Self::Config(_)
        )
    }

    /// 转换为进程退出码（sysexits 约定）
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::SchemaUnavailable(_) | Self::Connection(_) => 69,
            Self::Config(_) => 78,
            _ => 1,
        }
    }

    /// 指标标签使用的简短分类
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaUnavailable(_) => "schema_unavailable",
            Self::Serialization(_) => "serialization",
            Self::ClientClosed => "client_closed",
            Self::QueueFull(_) => "queue_full",
            Self::FlushTimeout => "flush_timeout",
            Self::Delivery(_) => "delivery",
            Self::Connection(_) => "connection",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
