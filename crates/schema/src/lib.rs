//! courier-schema - Schema 解析与记录序列化
//!
//! - `SchemaProvider`: 按 subject 缓存 Registry 返回的 schema
//! - `RecordSerializer`: Avro 编码并加上 schema id 头
//! - `InMemorySchemaRegistry`: 进程内 Registry（用于测试）

mod handle;
mod memory;
mod provider;
mod record;
mod serializer;

pub use handle::*;
pub use memory::*;
pub use provider::*;
pub use record::*;
pub use serializer::*;
