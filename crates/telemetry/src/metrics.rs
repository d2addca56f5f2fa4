//! Producer 指标

use ::metrics::{counter, gauge};

/// 记录成功进入缓冲区的消息
pub fn record_enqueued(topic: &str) {
    counter!("producer_enqueued_total", "topic" => topic.to_string()).increment(1);
}

/// 记录被拒绝的 enqueue
pub fn record_enqueue_rejected(reason: &'static str) {
    counter!("producer_enqueue_rejected_total", "reason" => reason).increment(1);
}

/// 记录投递结果
pub fn record_delivery(topic: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("producer_deliveries_total", "topic" => topic.to_string(), "status" => status)
        .increment(1);
}

/// 更新缓冲区占用字节数
pub fn set_buffer_bytes(bytes: usize) {
    gauge!("producer_buffer_bytes").set(bytes as f64);
}
