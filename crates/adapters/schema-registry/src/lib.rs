//! adapter-schema-registry - Confluent 兼容 Schema Registry 的 HTTP 客户端

mod client;

pub use client::*;
