//! 进程内传输层与结果收集（用于测试与本地调试）

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use courier_errors::{AppError, AppResult};
use courier_ports::{AckFuture, DeliveryAck, Envelope, MessageTransport};
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::delivery::DeliveryOutcome;
use crate::reporter::ReportSink;

#[derive(Default)]
struct TransportState {
    offsets: HashMap<String, i64>,
    submitted: Vec<Envelope>,
    held: VecDeque<(oneshot::Sender<AppResult<DeliveryAck>>, DeliveryAck)>,
    hold: bool,
    fail_next: usize,
}

/// 进程内传输层
///
/// 默认立即确认；`holding()` 模式下确认被挂起，直到调用 `release`
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<TransportState>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂起确认，模拟尚未应答的 Broker
    pub fn holding() -> Self {
        let transport = Self::new();
        transport.lock().hold = true;
        transport
    }

    /// 接下来的 `count` 条消息以 Broker 拒绝结束
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_next = count;
    }

    /// 确认最早挂起的 `count` 条消息，返回实际确认的条数
    pub fn release(&self, count: usize) -> usize {
        let mut state = self.lock();
        let mut released = 0;
        while released < count {
            let Some((sender, ack)) = state.held.pop_front() else {
                break;
            };
            let _ = sender.send(Ok(ack));
            released += 1;
        }
        released
    }

    /// 确认所有挂起的消息
    pub fn release_all(&self) -> usize {
        self.release(usize::MAX)
    }

    /// 挂起中的消息数
    pub fn held(&self) -> usize {
        self.lock().held.len()
    }

    /// 已提交的消息（按提交顺序）
    pub fn submitted(&self) -> Vec<Envelope> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TransportState> {
        // 测试辅助类型，锁中毒时沿用内部状态
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MessageTransport for InMemoryTransport {
    fn submit(&self, envelope: Envelope) -> AckFuture {
        let mut state = self.lock();
        let topic = envelope.topic.clone();
        state.submitted.push(envelope);

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return futures::future::ready(Err(AppError::delivery(format!(
                "broker rejected message for {}",
                topic
            ))))
            .boxed();
        }

        let offset = state.offsets.entry(topic).or_insert(0);
        let ack = DeliveryAck {
            partition: 0,
            offset: *offset,
        };
        *offset += 1;

        if !state.hold {
            return futures::future::ready(Ok(ack)).boxed();
        }

        let (sender, receiver) = oneshot::channel();
        state.held.push_back((sender, ack));
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(AppError::delivery("transport dropped acknowledgement")))
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// 收集投递结果
#[derive(Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<(bool, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到的结果行（按到达顺序）
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .lock()
            .map(|outcomes| outcomes.iter().map(|(_, line)| line.clone()).collect())
            .unwrap_or_default()
    }

    pub fn successes(&self) -> usize {
        self.count(true)
    }

    pub fn failures(&self) -> usize {
        self.count(false)
    }

    fn count(&self, success: bool) -> usize {
        self.outcomes
            .lock()
            .map(|outcomes| outcomes.iter().filter(|(ok, _)| *ok == success).count())
            .unwrap_or_default()
    }
}

impl ReportSink for RecordingSink {
    fn report(&self, outcome: &DeliveryOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push((outcome.is_success(), outcome.to_string()));
        }
    }
}
