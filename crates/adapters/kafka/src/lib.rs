//! adapter-kafka - Kafka 适配器
//!
//! - 基于 rdkafka 的消息传输层（异步确认，不自动重试）
//! - Producer 配置到 librdkafka 属性的映射
//! - Broker 连通性检查

mod config;
mod health;
mod transport;

pub use config::*;
pub use health::*;
pub use transport::*;
