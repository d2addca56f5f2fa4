//! 操作员输入
//!
//! 阻塞读取放在独立线程，异步侧通过 channel 接收；进程退出时不需要等待读取返回

use std::io::{self, BufRead};

use bytes::Bytes;
use courier_errors::{AppError, AppResult};
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 16;

/// 标准输入
pub fn stdin_reader() -> AppResult<impl AsyncBufRead + Unpin + Send + 'static> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}

/// 在独立线程上逐行读取 `source`
///
/// 读到 EOF 或错误后线程结束；异步侧不再接收时线程在下一行后退出
pub fn spawn_line_reader<R>(source: R) -> AppResult<impl AsyncBufRead + Unpin + Send + 'static>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

    std::thread::Builder::new()
        .name("input-reader".to_string())
        .spawn(move || forward_lines(source, sender))
        .map_err(|e| AppError::internal(format!("Failed to spawn input reader: {}", e)))?;

    let chunks = futures::stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|chunk| (chunk, receiver))
    });

    Ok(StreamReader::new(Box::pin(chunks)))
}

fn forward_lines<R: BufRead>(mut source: R, sender: mpsc::Sender<io::Result<Bytes>>) {
    loop {
        let mut line = Vec::new();
        let chunk = match source.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => Ok(Bytes::from(line)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };

        let failed = chunk.is_err();
        if sender.blocking_send(chunk).is_err() || failed {
            break;
        }
    }

    debug!("Input reader stopped");
}
