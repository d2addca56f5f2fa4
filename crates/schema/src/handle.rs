//! 已解析的 schema

use std::sync::Arc;

use apache_avro::Schema;

/// Registry 解析得到的 schema，创建后只读，可在并发序列化之间共享
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    id: i32,
    subject: Option<String>,
    schema: Arc<Schema>,
}

impl SchemaHandle {
    pub fn new(id: i32, subject: Option<String>, schema: Schema) -> Self {
        Self {
            id,
            subject,
            schema: Arc::new(schema),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// 记录全名（命名空间 + 名称）
    pub fn full_name(&self) -> Option<String> {
        self.schema.name().map(|name| name.fullname(None))
    }
}
