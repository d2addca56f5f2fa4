//! Schema Provider 测试

use std::sync::Arc;

use courier_config::SubjectNameStrategy;
use courier_errors::AppError;
use courier_ports::SchemaRegistry;
use courier_schema::{AvroRecord, InMemorySchemaRegistry, RecordSerializer, SchemaProvider};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    order_id: String,
    quantity: i64,
}

impl AvroRecord for Order {
    const SCHEMA: &'static str = r#"{
        "type": "record",
        "name": "Order",
        "namespace": "shop.orders",
        "fields": [
            {"name": "order_id", "type": "string"},
            {"name": "quantity", "type": "long"}
        ]
    }"#;
}

#[tokio::test]
async fn test_resolve_registers_once_and_caches() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let provider = SchemaProvider::new(registry.clone());

    let first = provider.resolve::<Order>("orders").await.unwrap();
    let second = provider.resolve::<Order>("orders").await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(first.subject(), Some("orders-value"));
    assert_eq!(first.full_name().as_deref(), Some("shop.orders.Order"));
    assert_eq!(registry.call_count(), 1);
    assert_eq!(provider.cached_subjects().await, 1);
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_handle() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let provider = Arc::new(SchemaProvider::new(registry.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.resolve::<Order>("orders").await })
        })
        .collect();

    let ids: Vec<i32> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id())
        .collect();

    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(provider.cached_subjects().await, 1);
}

#[tokio::test]
async fn test_subject_strategy_applies() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let provider =
        SchemaProvider::new(registry.clone()).with_strategy(SubjectNameStrategy::TopicRecord);

    let handle = provider.resolve::<Order>("orders").await.unwrap();
    assert_eq!(handle.subject(), Some("orders-shop.orders.Order"));
}

#[tokio::test]
async fn test_lookup_only_requires_existing_schema() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let provider = SchemaProvider::new(registry.clone()).with_auto_register(false);

    let result = provider.resolve::<Order>("orders").await;
    assert!(matches!(result, Err(AppError::SchemaUnavailable(_))));

    let canonical = apache_avro::Schema::parse_str(Order::SCHEMA)
        .unwrap()
        .canonical_form();
    let id = registry.register("orders-value", &canonical).await.unwrap();

    let handle = provider.resolve::<Order>("orders").await.unwrap();
    assert_eq!(handle.id(), id);
}

#[tokio::test]
async fn test_unreachable_registry_is_schema_unavailable() {
    let provider = SchemaProvider::new(Arc::new(InMemorySchemaRegistry::unavailable()));

    let result = provider.resolve::<Order>("orders").await;
    assert!(matches!(result, Err(AppError::SchemaUnavailable(_))));
    assert_eq!(provider.cached_subjects().await, 0);
}

#[tokio::test]
async fn test_round_trip_through_registry_lookup() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let producer_side = SchemaProvider::new(registry.clone());
    let consumer_side = SchemaProvider::new(registry.clone());
    let serializer = RecordSerializer::new();

    let order = Order {
        order_id: "o-1".to_string(),
        quantity: 3,
    };
    let handle = producer_side.resolve::<Order>("orders").await.unwrap();
    let payload = serializer.serialize(&order, &handle).unwrap();

    let (schema_id, _) = courier_schema::decode_frame(&payload).unwrap();
    let reader = consumer_side.resolve_id(schema_id).await.unwrap();
    let decoded: Order = serializer.deserialize(&payload, &reader).unwrap();

    assert_eq!(decoded, order);
}
