//! Avro 记录抽象

use serde::{Serialize, de::DeserializeOwned};

/// 带有 Avro schema 定义的领域记录
pub trait AvroRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Avro schema JSON
    const SCHEMA: &'static str;
}
