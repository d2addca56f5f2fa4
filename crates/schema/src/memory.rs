//! 进程内 Schema Registry（用于测试与本地调试）

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_errors::{AppError, AppResult};
use courier_ports::SchemaRegistry;

#[derive(Default)]
struct State {
    next_id: i32,
    versions: HashMap<(String, String), i32>,
    schemas: HashMap<i32, String>,
}

/// 进程内 Schema Registry
pub struct InMemorySchemaRegistry {
    state: Mutex<State>,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..Default::default()
            }),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// 模拟不可达的 Registry
    pub fn unavailable() -> Self {
        let registry = Self::new();
        registry.set_available(false);
        registry
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 收到的请求总数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::schema_unavailable("Schema registry unreachable"))
        }
    }

    fn state(&self) -> AppResult<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::internal("Schema registry state poisoned"))
    }
}

impl Default for InMemorySchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn register(&self, subject: &str, schema: &str) -> AppResult<i32> {
        self.check()?;
        let mut state = self.state()?;

        let key = (subject.to_string(), schema.to_string());
        if let Some(id) = state.versions.get(&key) {
            return Ok(*id);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.versions.insert(key, id);
        state.schemas.insert(id, schema.to_string());
        Ok(id)
    }

    async fn lookup(&self, subject: &str, schema: &str) -> AppResult<i32> {
        self.check()?;
        let state = self.state()?;

        state
            .versions
            .get(&(subject.to_string(), schema.to_string()))
            .copied()
            .ok_or_else(|| {
                AppError::schema_unavailable(format!("Schema not found under subject {}", subject))
            })
    }

    async fn schema_by_id(&self, id: i32) -> AppResult<String> {
        self.check()?;
        let state = self.state()?;

        state
            .schemas
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::schema_unavailable(format!("Schema {} not found", id)))
    }
}
