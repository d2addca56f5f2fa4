//! Schema Provider
//!
//! 按 subject / id 缓存解析结果，只在缓存未命中时访问 Registry

use std::collections::HashMap;
use std::sync::Arc;

use apache_avro::Schema;
use courier_config::SubjectNameStrategy;
use courier_errors::{AppError, AppResult};
use courier_ports::SchemaRegistry;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{AvroRecord, SchemaHandle};

/// Schema Provider
pub struct SchemaProvider {
    registry: Arc<dyn SchemaRegistry>,
    strategy: SubjectNameStrategy,
    auto_register: bool,
    by_subject: RwLock<HashMap<String, SchemaHandle>>,
    by_id: RwLock<HashMap<i32, SchemaHandle>>,
}

impl SchemaProvider {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            strategy: SubjectNameStrategy::default(),
            auto_register: true,
            by_subject: RwLock::new(HashMap::new()),
            by_id: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_strategy(mut self, strategy: SubjectNameStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_auto_register(mut self, auto_register: bool) -> Self {
        self.auto_register = auto_register;
        self
    }

    /// 解析记录类型 `R` 写入 `topic` 时使用的 schema
    pub async fn resolve<R: AvroRecord>(&self, topic: &str) -> AppResult<SchemaHandle> {
        let schema = Schema::parse_str(R::SCHEMA)
            .map_err(|e| AppError::schema_unavailable(format!("Invalid record schema: {}", e)))?;
        let full_name = schema
            .name()
            .map(|name| name.fullname(None))
            .ok_or_else(|| AppError::schema_unavailable("Record schema must be a named type"))?;
        let subject = self.strategy.subject(topic, &full_name);

        if let Some(handle) = self.by_subject.read().await.get(&subject) {
            debug!(subject = %subject, schema_id = handle.id(), "Schema cache hit");
            return Ok(handle.clone());
        }

        let canonical = schema.canonical_form();
        let id = if self.auto_register {
            self.registry.register(&subject, &canonical).await
        } else {
            self.registry.lookup(&subject, &canonical).await
        }
        .map_err(into_unavailable)?;

        info!(
            subject = %subject,
            schema_id = id,
            auto_register = self.auto_register,
            "Schema resolved"
        );

        let handle = SchemaHandle::new(id, Some(subject.clone()), schema);
        let handle = self
            .by_subject
            .write()
            .await
            .entry(subject)
            .or_insert(handle)
            .clone();
        self.by_id
            .write()
            .await
            .entry(handle.id())
            .or_insert_with(|| handle.clone());

        Ok(handle)
    }

    /// 按 id 解析 schema（消费端解码使用）
    pub async fn resolve_id(&self, id: i32) -> AppResult<SchemaHandle> {
        if let Some(handle) = self.by_id.read().await.get(&id) {
            return Ok(handle.clone());
        }

        let definition = self.registry.schema_by_id(id).await.map_err(into_unavailable)?;
        let schema = Schema::parse_str(&definition).map_err(|e| {
            AppError::schema_unavailable(format!("Registry returned invalid schema {}: {}", id, e))
        })?;

        let handle = SchemaHandle::new(id, None, schema);
        Ok(self
            .by_id
            .write()
            .await
            .entry(id)
            .or_insert(handle)
            .clone())
    }

    /// 已缓存的 subject 数量
    pub async fn cached_subjects(&self) -> usize {
        self.by_subject.read().await.len()
    }
}

fn into_unavailable(err: AppError) -> AppError {
    match err {
        AppError::SchemaUnavailable(_) => err,
        other => AppError::schema_unavailable(other.to_string()),
    }
}
