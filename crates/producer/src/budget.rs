//! 出站缓冲预算
//!
//! 消息从进入缓冲到投递结果产生之间一直占用预算（字节数 + 条数）

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier_errors::{AppError, AppResult};
use courier_telemetry::metrics::set_buffer_bytes;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// 出站缓冲预算
#[derive(Debug)]
pub struct OutboundBudget {
    bytes: Arc<Semaphore>,
    messages: Arc<Semaphore>,
    max_bytes: usize,
    max_messages: usize,
    used_bytes: Arc<AtomicUsize>,
}

impl OutboundBudget {
    pub fn new(max_bytes: usize, max_messages: usize) -> Self {
        let max_bytes = max_bytes.clamp(1, (u32::MAX as usize).min(Semaphore::MAX_PERMITS));
        let max_messages = max_messages.clamp(1, Semaphore::MAX_PERMITS);

        Self {
            bytes: Arc::new(Semaphore::new(max_bytes)),
            messages: Arc::new(Semaphore::new(max_messages)),
            max_bytes,
            max_messages,
            used_bytes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// 当前占用的字节数
    pub fn used_bytes(&self) -> usize {
        self.used_bytes.load(Ordering::SeqCst)
    }

    /// 当前占用的条数
    pub fn used_messages(&self) -> usize {
        self.max_messages - self.messages.available_permits()
    }

    /// 申请预算，空间不足时挂起直到有消息投递完成
    pub async fn reserve(&self, size: usize) -> AppResult<Reservation> {
        let size = self.check_size(size)?;

        let message = self
            .messages
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::ClientClosed)?;
        let bytes = self
            .bytes
            .clone()
            .acquire_many_owned(size)
            .await
            .map_err(|_| AppError::ClientClosed)?;

        Ok(self.grant(message, bytes))
    }

    /// 申请预算，空间不足时立即失败
    pub fn try_reserve(&self, size: usize) -> AppResult<Reservation> {
        let size = self.check_size(size)?;

        let message = self
            .messages
            .clone()
            .try_acquire_owned()
            .map_err(|e| self.try_acquire_error(e))?;
        let bytes = self
            .bytes
            .clone()
            .try_acquire_many_owned(size)
            .map_err(|e| self.try_acquire_error(e))?;

        Ok(self.grant(message, bytes))
    }

    /// 关闭预算，唤醒所有等待者（返回 ClientClosed）
    pub fn close(&self) {
        self.messages.close();
        self.bytes.close();
    }

    fn check_size(&self, size: usize) -> AppResult<u32> {
        if size > self.max_bytes {
            return Err(AppError::queue_full(format!(
                "message of {} bytes exceeds buffer capacity of {} bytes",
                size, self.max_bytes
            )));
        }
        // max_bytes 不超过 u32::MAX
        Ok(size as u32)
    }

    fn try_acquire_error(&self, err: TryAcquireError) -> AppError {
        match err {
            TryAcquireError::Closed => AppError::ClientClosed,
            TryAcquireError::NoPermits => AppError::queue_full(format!(
                "outbound buffer exhausted ({} messages / {} bytes)",
                self.max_messages, self.max_bytes
            )),
        }
    }

    fn grant(&self, message: OwnedSemaphorePermit, bytes: OwnedSemaphorePermit) -> Reservation {
        let size = bytes.num_permits();
        let used = self.used_bytes.fetch_add(size, Ordering::SeqCst) + size;
        set_buffer_bytes(used);

        Reservation {
            _message: message,
            _bytes: bytes,
            size,
            used_bytes: self.used_bytes.clone(),
        }
    }
}

/// 已占用的预算，drop 时归还
#[derive(Debug)]
pub struct Reservation {
    _message: OwnedSemaphorePermit,
    _bytes: OwnedSemaphorePermit,
    size: usize,
    used_bytes: Arc<AtomicUsize>,
}

impl Reservation {
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let used = self.used_bytes.fetch_sub(self.size, Ordering::SeqCst) - self.size;
        set_buffer_bytes(used);
    }
}
