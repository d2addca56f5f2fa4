//! User 记录

use courier_schema::AvroRecord;
use serde::{Deserialize, Serialize};

/// 每条记录固定的颜色
pub const FAVORITE_COLOR: &str = "green";

/// 操作员输入一行生成一个 User
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub favorite_color: String,
    pub favorite_number: i32,
}

impl User {
    pub fn new(name: impl Into<String>, favorite_number: i32) -> Self {
        Self {
            name: name.into(),
            favorite_color: FAVORITE_COLOR.to_string(),
            favorite_number,
        }
    }
}

impl AvroRecord for User {
    const SCHEMA: &'static str = r#"{
        "type": "record",
        "name": "User",
        "namespace": "confluent.io.examples.serialization.avro",
        "fields": [
            { "name": "name", "type": "string" },
            { "name": "favorite_number", "type": "int" },
            { "name": "favorite_color", "type": "string" }
        ]
    }"#;
}
