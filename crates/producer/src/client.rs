//! Producer Client
//!
//! 调用方通过 `enqueue` 把消息放入出站队列后立即拿到 `PendingDelivery`；
//! 后台任务按入队顺序提交给传输层，并在确认到达时写入结果

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use courier_config::{ProducerSettings, QueueFullPolicy};
use courier_errors::{AppError, AppResult};
use courier_ports::{DeliveryAck, Envelope, MessageTransport};
use courier_telemetry::metrics::{record_enqueue_rejected, record_enqueued};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::budget::{OutboundBudget, Reservation};
use crate::delivery::{DeliveryOutcome, DeliveryReceipt, PendingDelivery};

/// Producer Client 配置
#[derive(Debug, Clone)]
pub struct ProducerClientConfig {
    /// 未完成投递的字节上限
    pub buffer_max_bytes: usize,
    /// 未完成投递的条数上限
    pub buffer_max_messages: usize,
    /// 缓冲区满时阻塞还是拒绝
    pub queue_full: QueueFullPolicy,
}

impl Default for ProducerClientConfig {
    fn default() -> Self {
        Self::from_settings(&ProducerSettings::default())
    }
}

impl ProducerClientConfig {
    pub fn from_settings(settings: &ProducerSettings) -> Self {
        Self {
            buffer_max_bytes: settings.buffer_max_bytes,
            buffer_max_messages: settings.buffer_max_messages,
            queue_full: settings.queue_full,
        }
    }

    pub fn with_buffer_max_bytes(mut self, bytes: usize) -> Self {
        self.buffer_max_bytes = bytes;
        self
    }

    pub fn with_buffer_max_messages(mut self, messages: usize) -> Self {
        self.buffer_max_messages = messages;
        self
    }

    pub fn with_queue_full(mut self, policy: QueueFullPolicy) -> Self {
        self.queue_full = policy;
        self
    }
}

/// close 时的投递统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseSummary {
    /// 成功投递
    pub delivered: usize,
    /// 传输层或 Broker 报告失败
    pub failed: usize,
    /// 超时前未确认
    pub timed_out: usize,
}

impl CloseSummary {
    pub fn total(&self) -> usize {
        self.delivered + self.failed + self.timed_out
    }
}

struct Queued {
    envelope: Envelope,
    reservation: Reservation,
    completion: oneshot::Sender<DeliveryOutcome>,
}

struct InFlight {
    topic: String,
    completion: oneshot::Sender<DeliveryOutcome>,
    _reservation: Reservation,
}

/// Producer Client
///
/// 必须在 tokio 运行时内创建；后台发送任务随之启动，直到 `close` 结束
pub struct ProducerClient {
    transport_name: String,
    policy: QueueFullPolicy,
    budget: OutboundBudget,
    closing: AtomicBool,
    sender: Mutex<Option<mpsc::UnboundedSender<Queued>>>,
    dispatcher: Mutex<Option<JoinHandle<CloseSummary>>>,
    abort: CancellationToken,
}

impl ProducerClient {
    pub fn new(transport: Arc<dyn MessageTransport>, config: ProducerClientConfig) -> Self {
        let (sender, queue) = mpsc::unbounded_channel();
        let abort = CancellationToken::new();
        let transport_name = transport.name().to_string();

        let dispatcher = tokio::spawn(dispatch(transport, queue, abort.clone()));

        info!(
            transport = %transport_name,
            buffer_max_bytes = config.buffer_max_bytes,
            buffer_max_messages = config.buffer_max_messages,
            queue_full = ?config.queue_full,
            "Producer client started"
        );

        Self {
            transport_name,
            policy: config.queue_full,
            budget: OutboundBudget::new(config.buffer_max_bytes, config.buffer_max_messages),
            closing: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(dispatcher)),
            abort,
        }
    }

    /// 传输层名称
    pub fn name(&self) -> &str {
        &self.transport_name
    }

    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// 出站缓冲预算
    pub fn budget(&self) -> &OutboundBudget {
        &self.budget
    }

    /// 放入出站队列
    ///
    /// 只在本地准入阶段等待（`Block` 策略下缓冲区满时）；投递结果通过返回的句柄获取
    pub async fn enqueue(
        &self,
        topic: impl Into<String>,
        key: Option<Bytes>,
        value: Bytes,
    ) -> AppResult<PendingDelivery> {
        let envelope = Envelope {
            topic: topic.into(),
            key,
            value,
        };
        self.send(envelope).await
    }

    /// 放入出站队列
    pub async fn send(&self, envelope: Envelope) -> AppResult<PendingDelivery> {
        self.admit(envelope).await.inspect_err(|e| {
            record_enqueue_rejected(e.kind());
            debug!(error = %e, "Enqueue rejected");
        })
    }

    async fn admit(&self, envelope: Envelope) -> AppResult<PendingDelivery> {
        if self.is_closed() {
            return Err(AppError::ClientClosed);
        }

        let size = envelope.size();
        let reservation = match self.policy {
            QueueFullPolicy::Block => self.budget.reserve(size).await?,
            QueueFullPolicy::Reject => self.budget.try_reserve(size)?,
        };

        let topic = envelope.topic.clone();
        let (completion, receiver) = oneshot::channel();
        {
            let guard = self
                .sender
                .lock()
                .map_err(|_| AppError::internal("producer queue lock poisoned"))?;
            let sender = guard.as_ref().ok_or(AppError::ClientClosed)?;
            sender
                .send(Queued {
                    envelope,
                    reservation,
                    completion,
                })
                .map_err(|_| AppError::ClientClosed)?;
        }

        record_enqueued(&topic);
        Ok(PendingDelivery::new(topic, receiver))
    }

    /// 停止接收新消息，在 `timeout` 内等待已入队消息投递完成
    ///
    /// 超时后仍未确认的消息以 FlushTimeout 结束；重复调用返回空统计
    pub async fn close(&self, timeout: Duration) -> CloseSummary {
        if self.closing.swap(true, Ordering::SeqCst) {
            return CloseSummary::default();
        }

        // 唤醒阻塞在缓冲区上的 enqueue
        self.budget.close();
        // 关闭队列，后台任务处理完剩余消息后退出
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let handle = match self.dispatcher.lock() {
            Ok(mut dispatcher) => dispatcher.take(),
            Err(_) => None,
        };
        let Some(mut handle) = handle else {
            return CloseSummary::default();
        };

        let joined = match tokio::time::timeout(timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Flush timed out, expiring outstanding deliveries"
                );
                self.abort.cancel();
                handle.await
            }
        };

        let summary = joined.unwrap_or_else(|e| {
            error!(error = %e, "Producer dispatcher terminated abnormally");
            CloseSummary::default()
        });

        info!(
            delivered = summary.delivered,
            failed = summary.failed,
            timed_out = summary.timed_out,
            "Producer client closed"
        );

        summary
    }
}

/// 后台发送任务
///
/// 按入队顺序提交；确认可能乱序到达，每条消息的结果恰好写入一次
async fn dispatch(
    transport: Arc<dyn MessageTransport>,
    mut queue: mpsc::UnboundedReceiver<Queued>,
    abort: CancellationToken,
) -> CloseSummary {
    let mut summary = CloseSummary::default();
    let mut in_flight: HashMap<u64, InFlight> = HashMap::new();
    let mut acks = FuturesUnordered::new();
    let mut next_id: u64 = 0;
    let mut queue_open = true;

    loop {
        if !queue_open && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            biased;

            _ = abort.cancelled() => {
                queue.close();
                while let Ok(queued) = queue.try_recv() {
                    expire(queued.envelope.topic, queued.completion, &mut summary);
                }
                for (_, InFlight { topic, completion, .. }) in in_flight.drain() {
                    expire(topic, completion, &mut summary);
                }
                break;
            }

            queued = queue.recv(), if queue_open => match queued {
                Some(Queued { envelope, reservation, completion }) => {
                    let id = next_id;
                    next_id += 1;

                    let topic = envelope.topic.clone();
                    let ack = transport.submit(envelope);
                    acks.push(async move { (id, ack.await) });

                    in_flight.insert(id, InFlight {
                        topic,
                        completion,
                        _reservation: reservation,
                    });
                }
                None => queue_open = false,
            },

            Some((id, result)) = acks.next(), if !acks.is_empty() => {
                if let Some(pending) = in_flight.remove(&id) {
                    complete(pending, result, &mut summary);
                }
            }
        }
    }

    summary
}

fn complete(pending: InFlight, result: AppResult<DeliveryAck>, summary: &mut CloseSummary) {
    let InFlight {
        topic,
        completion,
        _reservation: reservation,
    } = pending;
    // 先归还预算，调用方拿到结果时空间已可用
    drop(reservation);

    let outcome = match result {
        Ok(ack) => {
            summary.delivered += 1;
            DeliveryOutcome::Success(DeliveryReceipt {
                topic,
                partition: ack.partition,
                offset: ack.offset,
            })
        }
        Err(cause) => {
            summary.failed += 1;
            DeliveryOutcome::Failure { topic, cause }
        }
    };

    // 调用方可能已丢弃句柄
    let _ = completion.send(outcome);
}

fn expire(topic: String, completion: oneshot::Sender<DeliveryOutcome>, summary: &mut CloseSummary) {
    summary.timed_out += 1;
    let _ = completion.send(DeliveryOutcome::Failure {
        topic,
        cause: AppError::FlushTimeout,
    });
}
