//! ports - 抽象 trait 层
//!
//! 定义 Broker 与 Schema Registry 两个外部协作方的接口

mod envelope;
mod message_transport;
mod schema_registry;

pub use envelope::*;
pub use message_transport::*;
pub use schema_registry::*;
