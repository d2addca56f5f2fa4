//! Input Loop
//!
//! 逐行读取操作员输入，每行生成一个 User 并发布；读到结束标记、输入结束或收到取消时停止，
//! 随后在限定时间内关闭 Producer

use std::time::Duration;

use courier_errors::AppError;
use courier_producer::CloseSummary;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::UserPublisher;
use crate::domain::User;

/// 启动提示
pub fn banner(client_id: &str, topic: &str, sentinel: &str) -> String {
    format!(
        "{} producing on {}. Enter user names, {} to exit.",
        client_id, topic, sentinel
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Reading,
    Terminated(Termination),
}

/// 停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// 读到结束标记
    Sentinel,
    /// 输入结束（EOF）
    EndOfInput,
    /// 输入读取失败
    InputError,
    /// 外部取消
    Cancelled,
    /// Producer 已关闭
    ClientClosed,
}

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub termination: Termination,
    /// 成功入队的记录数
    pub enqueued: usize,
    /// 入队前失败的记录数
    pub rejected: usize,
    pub close: CloseSummary,
}

pub struct InputLoop {
    publisher: UserPublisher,
    sentinel: String,
    flush_timeout: Duration,
    cancel: CancellationToken,
    state: LoopState,
    counter: i32,
}

impl InputLoop {
    pub fn new(publisher: UserPublisher, sentinel: impl Into<String>, flush_timeout: Duration) -> Self {
        Self {
            publisher,
            sentinel: sentinel.into(),
            flush_timeout,
            cancel: CancellationToken::new(),
            state: LoopState::Reading,
            counter: 1,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 读取直到停止，然后关闭 Producer
    ///
    /// 非 UTF-8 字节按替换字符处理；只有 EOF、读取错误或取消会结束读取
    pub async fn run<R>(mut self, mut reader: R) -> LoopReport
    where
        R: AsyncBufRead + Unpin,
    {
        let mut enqueued = 0;
        let mut rejected = 0;
        let mut buf = Vec::new();

        let termination = loop {
            if let LoopState::Terminated(reason) = self.state {
                break reason;
            }

            buf.clear();
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                read = reader.read_until(b'\n', &mut buf) => Some(read),
            };

            let next = match read {
                None => LoopState::Terminated(Termination::Cancelled),
                Some(Err(e)) => {
                    warn!(error = %e, "Failed to read input");
                    LoopState::Terminated(Termination::InputError)
                }
                Some(Ok(0)) => LoopState::Terminated(Termination::EndOfInput),
                Some(Ok(_)) => {
                    let line = String::from_utf8_lossy(&buf);
                    let text = line.trim_end_matches(['\r', '\n']);
                    if text == self.sentinel {
                        LoopState::Terminated(Termination::Sentinel)
                    } else {
                        self.counter += 1;
                        let user = User::new(text, self.counter);

                        // Block 策略下 enqueue 可能等待缓冲区，取消时放弃这条记录
                        let published = tokio::select! {
                            biased;
                            _ = self.cancel.cancelled() => None,
                            result = self.publisher.publish(&user) => Some(result),
                        };

                        match published {
                            None => LoopState::Terminated(Termination::Cancelled),
                            Some(Ok(())) => {
                                enqueued += 1;
                                debug!(
                                    name = %user.name,
                                    favorite_number = user.favorite_number,
                                    "User enqueued"
                                );
                                LoopState::Reading
                            }
                            Some(Err(AppError::ClientClosed)) => {
                                LoopState::Terminated(Termination::ClientClosed)
                            }
                            Some(Err(e)) => {
                                rejected += 1;
                                self.publisher.report_rejected(e);
                                LoopState::Reading
                            }
                        }
                    }
                }
            };
            self.state = next;
        };

        info!(
            reason = ?termination,
            enqueued,
            rejected,
            "Input loop terminated"
        );

        let close = self.publisher.shutdown(self.flush_timeout).await;

        LoopReport {
            termination,
            enqueued,
            rejected,
            close,
        }
    }
}
