//! 投递结果

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use courier_errors::AppError;
use tokio::sync::oneshot;

/// 成功投递的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for DeliveryReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [[{}]] @{}", self.topic, self.partition, self.offset)
    }
}

/// 单条消息的最终结果
#[derive(Debug)]
pub enum DeliveryOutcome {
    Success(DeliveryReceipt),
    Failure { topic: String, cause: AppError },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::Success(receipt) => &receipt.topic,
            Self::Failure { topic, .. } => topic,
        }
    }

    pub fn receipt(&self) -> Option<&DeliveryReceipt> {
        match self {
            Self::Success(receipt) => Some(receipt),
            Self::Failure { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<&AppError> {
        match self {
            Self::Success(_) => None,
            Self::Failure { cause, .. } => Some(cause),
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(receipt) => write!(f, "produced to: {}", receipt),
            Self::Failure { cause, .. } => write!(f, "error producing message: {}", cause),
        }
    }
}

/// 一条在途消息的句柄
///
/// 后台发送任务恰好写入一次结果；await 即得到该结果
#[derive(Debug)]
pub struct PendingDelivery {
    topic: String,
    receiver: oneshot::Receiver<DeliveryOutcome>,
}

impl PendingDelivery {
    pub(crate) fn new(topic: String, receiver: oneshot::Receiver<DeliveryOutcome>) -> Self {
        Self { topic, receiver }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Future for PendingDelivery {
    type Output = DeliveryOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // 发送端在写入结果前被丢弃（后台任务异常退出）
            Poll::Ready(Err(_)) => Poll::Ready(DeliveryOutcome::Failure {
                topic: this.topic.clone(),
                cause: AppError::internal("delivery dropped before completion"),
            }),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines() {
        let success = DeliveryOutcome::Success(DeliveryReceipt {
            topic: "usertopic".to_string(),
            partition: 0,
            offset: 42,
        });
        assert_eq!(success.to_string(), "produced to: usertopic [[0]] @42");
        assert!(success.is_success());

        let failure = DeliveryOutcome::Failure {
            topic: "usertopic".to_string(),
            cause: AppError::FlushTimeout,
        };
        assert_eq!(
            failure.to_string(),
            "error producing message: Delivery not acknowledged before flush timeout"
        );
        assert_eq!(failure.topic(), "usertopic");
        assert!(failure.receipt().is_none());
    }

    #[tokio::test]
    async fn test_pending_resolves_once() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingDelivery::new("usertopic".to_string(), rx);
        tx.send(DeliveryOutcome::Success(DeliveryReceipt {
            topic: "usertopic".to_string(),
            partition: 1,
            offset: 7,
        }))
        .unwrap();

        let outcome = pending.await;
        assert_eq!(outcome.receipt().unwrap().offset, 7);
    }

    #[tokio::test]
    async fn test_pending_dropped_sender_is_failure() {
        let (tx, rx) = oneshot::channel::<DeliveryOutcome>();
        let pending = PendingDelivery::new("usertopic".to_string(), rx);
        drop(tx);

        let outcome = pending.await;
        assert!(matches!(outcome.cause(), Some(AppError::Internal(_))));
    }
}
