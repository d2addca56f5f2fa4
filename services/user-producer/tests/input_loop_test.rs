//! Input Loop 场景测试

use std::sync::Arc;
use std::time::Duration;

use courier_config::QueueFullPolicy;
use courier_errors::AppError;
use courier_ports::Envelope;
use courier_producer::{
    DeliveryReporter, InMemoryTransport, ProducerClient, ProducerClientConfig, RecordingSink,
};
use courier_schema::{InMemorySchemaRegistry, RecordSerializer, SchemaProvider};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use user_producer::application::{InputLoop, Termination, UserPublisher};
use user_producer::domain::User;

struct Harness {
    registry: Arc<InMemorySchemaRegistry>,
    transport: Arc<InMemoryTransport>,
    sink: Arc<RecordingSink>,
    provider: SchemaProvider,
    producer: Arc<ProducerClient>,
}

impl Harness {
    fn new(transport: InMemoryTransport) -> Self {
        Self::with_registry(InMemorySchemaRegistry::new(), transport)
    }

    fn with_registry(registry: InMemorySchemaRegistry, transport: InMemoryTransport) -> Self {
        Self::configured(registry, transport, ProducerClientConfig::default())
    }

    fn configured(
        registry: InMemorySchemaRegistry,
        transport: InMemoryTransport,
        config: ProducerClientConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let transport = Arc::new(transport);
        let producer = Arc::new(ProducerClient::new(transport.clone(), config));
        Self {
            provider: SchemaProvider::new(registry.clone()),
            registry,
            transport,
            sink: Arc::new(RecordingSink::new()),
            producer,
        }
    }

    async fn publisher(&self) -> Result<UserPublisher, AppError> {
        UserPublisher::start(
            &self.provider,
            self.producer.clone(),
            DeliveryReporter::new(self.sink.clone()),
            "usertopic",
        )
        .await
    }

    async fn decode(&self, envelope: &Envelope) -> User {
        let handle = self.provider.resolve::<User>("usertopic").await.unwrap();
        RecordSerializer::new()
            .deserialize(&envelope.value, &handle)
            .unwrap()
    }
}

#[tokio::test]
async fn test_alice_bob_then_sentinel() {
    let harness = Harness::new(InMemoryTransport::new());
    let publisher = harness.publisher().await.unwrap();

    let input = tokio_test::io::Builder::new()
        .read(b"alice\n")
        .read(b"bob\n")
        .read(b"q\n")
        .build();

    let report = InputLoop::new(publisher, "q", Duration::from_secs(1))
        .run(BufReader::new(input))
        .await;

    assert_eq!(report.termination, Termination::Sentinel);
    assert_eq!(report.enqueued, 2);
    assert_eq!(report.close.delivered, 2);

    let submitted = harness.transport.submitted();
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().all(|e| e.topic == "usertopic" && e.key.is_none()));

    assert_eq!(
        harness.decode(&submitted[0]).await,
        User {
            name: "alice".to_string(),
            favorite_color: "green".to_string(),
            favorite_number: 2,
        }
    );
    assert_eq!(
        harness.decode(&submitted[1]).await,
        User {
            name: "bob".to_string(),
            favorite_color: "green".to_string(),
            favorite_number: 3,
        }
    );

    let mut lines = harness.sink.lines();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "produced to: usertopic [[0]] @0".to_string(),
            "produced to: usertopic [[0]] @1".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_crlf_line_endings_are_trimmed() {
    let harness = Harness::new(InMemoryTransport::new());
    let publisher = harness.publisher().await.unwrap();

    let input = tokio_test::io::Builder::new()
        .read(b"alice\r\n")
        .read(b"q\n")
        .build();

    let report = InputLoop::new(publisher, "q", Duration::from_secs(1))
        .run(BufReader::new(input))
        .await;

    assert_eq!(report.enqueued, 1);
    let submitted = harness.transport.submitted();
    assert_eq!(harness.decode(&submitted[0]).await.name, "alice");
}

#[tokio::test]
async fn test_end_of_input_terminates_like_sentinel() {
    let harness = Harness::new(InMemoryTransport::new());
    let publisher = harness.publisher().await.unwrap();

    let input = tokio_test::io::Builder::new().read(b"carol\n").build();

    let report = InputLoop::new(publisher, "q", Duration::from_secs(1))
        .run(BufReader::new(input))
        .await;

    assert_eq!(report.termination, Termination::EndOfInput);
    assert_eq!(report.enqueued, 1);
    assert_eq!(report.close.delivered, 1);
    assert!(harness.producer.is_closed());
}

#[tokio::test]
async fn test_registry_unavailable_aborts_before_any_send() {
    let harness = Harness::with_registry(
        InMemorySchemaRegistry::unavailable(),
        InMemoryTransport::new(),
    );

    let err = match harness.publisher().await {
        Ok(_) => panic!("publisher must not start without a schema"),
        Err(e) => e,
    };

    assert!(matches!(err, AppError::SchemaUnavailable(_)));
    assert!(err.is_startup_fatal());
    assert_eq!(err.exit_code(), 69);
    assert_eq!(harness.registry.call_count(), 1);
    assert!(harness.transport.submitted().is_empty());
}

#[tokio::test]
async fn test_zero_flush_timeout_expires_pending_delivery() {
    let harness = Harness::new(InMemoryTransport::holding());
    let publisher = harness.publisher().await.unwrap();

    let input = tokio_test::io::Builder::new()
        .read(b"alice\n")
        .read(b"q\n")
        .build();

    let report = tokio::time::timeout(
        Duration::from_secs(1),
        InputLoop::new(publisher, "q", Duration::ZERO).run(BufReader::new(input)),
    )
    .await
    .expect("close must not hang");

    assert_eq!(report.enqueued, 1);
    assert_eq!(report.close.timed_out, 1);
    assert_eq!(harness.sink.failures(), 1);
    assert!(harness.sink.lines()[0].starts_with("error producing message:"));
}

#[tokio::test]
async fn test_cancellation_terminates_reading() {
    let harness = Harness::new(InMemoryTransport::new());
    let publisher = harness.publisher().await.unwrap();
    let cancel = CancellationToken::new();

    // 写端保持打开，读端一直等待输入
    let (_writer, reader) = tokio::io::duplex(64);

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(1),
        InputLoop::new(publisher, "q", Duration::from_secs(1))
            .with_cancellation(cancel)
            .run(BufReader::new(reader)),
    )
    .await
    .expect("cancellation must stop the loop");

    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.enqueued, 0);
    assert!(harness.producer.is_closed());
}

#[tokio::test]
async fn test_enqueue_rejection_is_reported_and_loop_continues() {
    let registry = InMemorySchemaRegistry::new();
    let transport = Arc::new(InMemoryTransport::holding());
    let producer = Arc::new(ProducerClient::new(
        transport.clone(),
        ProducerClientConfig::default()
            .with_buffer_max_messages(1)
            .with_queue_full(QueueFullPolicy::Reject),
    ));
    let provider = SchemaProvider::new(Arc::new(registry));
    let sink = Arc::new(RecordingSink::new());
    let publisher = UserPublisher::start(
        &provider,
        producer.clone(),
        DeliveryReporter::new(sink.clone()),
        "usertopic",
    )
    .await
    .unwrap();

    let input = tokio_test::io::Builder::new()
        .read(b"alice\n")
        .read(b"bob\n")
        .read(b"q\n")
        .build();

    let report = InputLoop::new(publisher, "q", Duration::ZERO)
        .run(BufReader::new(input))
        .await;

    assert_eq!(report.enqueued, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.close.timed_out, 1);
    assert_eq!(sink.failures(), 2);
}

#[tokio::test]
async fn test_invalid_utf8_line_is_replaced_and_loop_continues() {
    let harness = Harness::new(InMemoryTransport::new());
    let publisher = harness.publisher().await.unwrap();

    let input = tokio_test::io::Builder::new()
        .read(b"caf\xe9\n")
        .read(b"alice\n")
        .read(b"q\n")
        .build();

    let report = InputLoop::new(publisher, "q", Duration::from_secs(1))
        .run(BufReader::new(input))
        .await;

    assert_eq!(report.termination, Termination::Sentinel);
    assert_eq!(report.enqueued, 2);

    let submitted = harness.transport.submitted();
    let first = harness.decode(&submitted[0]).await;
    assert_eq!(first.name, "caf\u{FFFD}");
    assert_eq!(first.favorite_number, 2);
    assert_eq!(harness.decode(&submitted[1]).await.name, "alice");
}

#[tokio::test]
async fn test_cancellation_while_blocked_on_full_buffer() {
    let harness = Harness::configured(
        InMemorySchemaRegistry::new(),
        InMemoryTransport::holding(),
        ProducerClientConfig::default()
            .with_buffer_max_messages(1)
            .with_queue_full(QueueFullPolicy::Block),
    );
    let publisher = harness.publisher().await.unwrap();
    let cancel = CancellationToken::new();

    // alice 占满缓冲区且不会被确认，bob 阻塞在入队
    let input = tokio_test::io::Builder::new()
        .read(b"alice\n")
        .read(b"bob\n")
        .build();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(2),
        InputLoop::new(publisher, "q", Duration::ZERO)
            .with_cancellation(cancel)
            .run(BufReader::new(input)),
    )
    .await
    .expect("cancellation must interrupt a blocked enqueue");

    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.enqueued, 1);
    assert_eq!(report.close.timed_out, 1);
    assert_eq!(harness.transport.submitted().len(), 1);
    assert!(harness.producer.is_closed());
}

#[tokio::test]
async fn test_closed_producer_terminates_loop() {
    let harness = Harness::new(InMemoryTransport::new());
    let publisher = harness.publisher().await.unwrap();
    harness.producer.close(Duration::from_secs(1)).await;

    let input = tokio_test::io::Builder::new().read(b"alice\n").build();

    let report = InputLoop::new(publisher, "q", Duration::from_secs(1))
        .run(BufReader::new(input))
        .await;

    assert_eq!(report.termination, Termination::ClientClosed);
    assert_eq!(report.enqueued, 0);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.close.total(), 0);
    assert!(harness.transport.submitted().is_empty());
    assert!(harness.sink.lines().is_empty());
}
