//! Delivery Reporter
//!
//! 每个 PendingDelivery 挂一个轻量任务，结果产生后立即输出，不阻塞发送路径

use std::io::Write;
use std::sync::Arc;

use courier_telemetry::metrics::record_delivery;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::delivery::{DeliveryOutcome, PendingDelivery};

/// 投递结果输出目标
pub trait ReportSink: Send + Sync + 'static {
    fn report(&self, outcome: &DeliveryOutcome);
}

/// 输出到 stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn report(&self, outcome: &DeliveryOutcome) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", outcome);
    }
}

/// Delivery Reporter
pub struct DeliveryReporter {
    sink: Arc<dyn ReportSink>,
    tracker: TaskTracker,
}

impl DeliveryReporter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            tracker: TaskTracker::new(),
        }
    }

    pub fn console() -> Self {
        Self::new(Arc::new(ConsoleSink))
    }

    /// 等待投递结果并输出，不阻塞调用方
    pub fn watch(&self, pending: PendingDelivery) {
        let sink = self.sink.clone();
        self.tracker.spawn(async move {
            let outcome = pending.await;
            log_outcome(&outcome);
            sink.report(&outcome);
        });
    }

    /// 立即输出一个已知结果（入队前就失败的消息）
    pub fn report(&self, outcome: DeliveryOutcome) {
        log_outcome(&outcome);
        self.sink.report(&outcome);
    }

    /// 尚未输出的投递数量
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// 等待所有已登记的投递输出完毕
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn log_outcome(outcome: &DeliveryOutcome) {
    record_delivery(outcome.topic(), outcome.is_success());

    match outcome {
        DeliveryOutcome::Success(receipt) => debug!(
            topic = %receipt.topic,
            partition = receipt.partition,
            offset = receipt.offset,
            "Message delivered"
        ),
        DeliveryOutcome::Failure { topic, cause } => warn!(
            topic = %topic,
            error = %cause,
            "Message delivery failed"
        ),
    }
}
