//! Schema Registry trait 定义

use async_trait::async_trait;
use courier_errors::AppResult;

/// Schema Registry 客户端 trait
///
/// 只消费注册与查询契约，兼容性校验与存储由 Registry 自身负责
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// 在 subject 下注册 schema，返回 schema id（已存在时返回原 id）
    async fn register(&self, subject: &str, schema: &str) -> AppResult<i32>;

    /// 查询 schema 在 subject 下的 id，不存在时返回 SchemaUnavailable
    async fn lookup(&self, subject: &str, schema: &str) -> AppResult<i32>;

    /// 按 id 获取 schema 定义
    async fn schema_by_id(&self, id: i32) -> AppResult<String>;
}
