use crate::{AppConfig, QueueFullPolicy, SchemaRegistryConfig, SubjectNameStrategy};
use std::time::Duration;

use figment::Jail;
use secrecy::{ExposeSecret, Secret};

#[test]
fn test_secret_redaction() {
    let config = SchemaRegistryConfig {
        basic_auth_user: Some("registry".to_string()),
        basic_auth_password: Some(Secret::new("my_secret_password".to_string())),
        ..Default::default()
    };
    let debug_output = format!("{:?}", config);
    assert!(!debug_output.contains("my_secret_password"));
    assert!(debug_output.contains("Secret([REDACTED"));
}

#[test]
fn test_defaults_without_files() {
    Jail::expect_with(|_jail| {
        let config = AppConfig::load(".").expect("defaults should load");
        assert_eq!(config.kafka.brokers, "localhost:29092");
        assert_eq!(config.kafka.retries, 0);
        assert_eq!(config.schema_registry.url, "http://localhost:8081");
        assert_eq!(config.producer.topic, "usertopic");
        assert_eq!(config.producer.sentinel, "q");
        assert_eq!(config.producer.queue_full, QueueFullPolicy::Block);
        assert_eq!(config.client_id(), "user-producer");
        Ok(())
    });
}

#[test]
fn test_file_and_env_layering() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            r#"
            app_name = "users"

            [producer]
            topic = "from-file"
            queue_full = "reject"
            buffer_max_messages = 2

            [schema_registry]
            subject_strategy = "topic_record"
            basic_auth_user = "svc"
            basic_auth_password = "hunter2"
            "#,
        )?;
        jail.set_env("COURIER_PRODUCER__TOPIC", "from-env");
        jail.set_env("COURIER_KAFKA__BROKERS", "kafka-1:9092,kafka-2:9092");

        let config = AppConfig::load(".").expect("config should load");
        assert_eq!(config.app_name, "users");
        assert_eq!(config.producer.topic, "from-env");
        assert_eq!(config.producer.queue_full, QueueFullPolicy::Reject);
        assert_eq!(config.producer.buffer_max_messages, 2);
        assert_eq!(config.kafka.brokers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(
            config.schema_registry.subject_strategy,
            SubjectNameStrategy::TopicRecord
        );
        let password = config.schema_registry.basic_auth_password.as_ref().unwrap();
        assert_eq!(password.expose_secret(), "hunter2");
        Ok(())
    });
}

#[test]
fn test_environment_specific_file() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", "[producer]\nflush_timeout_ms = 1000")?;
        jail.create_file("production.toml", "app_env = \"production\"\n[producer]\nflush_timeout_ms = 5000")?;
        jail.set_env("APP_ENV", "production");

        let config = AppConfig::load(".").expect("config should load");
        assert!(config.is_production());
        assert_eq!(config.producer.flush_timeout().as_millis(), 5000);
        Ok(())
    });
}

#[test]
fn test_validation_rejects_empty_topic() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", "[producer]\ntopic = \"\"")?;
        assert!(AppConfig::load(".").is_err());
        Ok(())
    });
}

#[test]
fn test_validation_rejects_zero_buffer() {
    let mut config = AppConfig::default();
    config.producer.buffer_max_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_subject_name_strategy() {
    let name = "confluent.io.examples.serialization.avro.User";
    assert_eq!(SubjectNameStrategy::Topic.subject("usertopic", name), "usertopic-value");
    assert_eq!(SubjectNameStrategy::Record.subject("usertopic", name), name);
    assert_eq!(
        SubjectNameStrategy::TopicRecord.subject("usertopic", name),
        format!("usertopic-{}", name)
    );
}

#[test]
fn test_kafka_request_timeout_is_independent_of_registry() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            r#"
            [kafka]
            request_timeout_ms = 1500

            [schema_registry]
            request_timeout_secs = 60
            "#,
        )?;

        let config = AppConfig::load(".").expect("config should load");
        assert_eq!(config.kafka.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.schema_registry.request_timeout(), Duration::from_secs(60));
        Ok(())
    });
}
