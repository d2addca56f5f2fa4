//! Message Transport trait 定义

use courier_errors::AppResult;
use futures::future::BoxFuture;

use crate::{DeliveryAck, Envelope};

/// 等待 Broker 确认的 future
pub type AckFuture = BoxFuture<'static, AppResult<DeliveryAck>>;

/// 消息传输 trait
///
/// `submit` 必须同步地把消息交给底层发送队列并立即返回，
/// 按调用顺序提交即保证同一调用方的发送顺序
pub trait MessageTransport: Send + Sync {
    /// 提交消息，返回其确认 future
    ///
    /// 本地提交失败（例如底层队列已满）通过返回一个立即失败的 future 表达
    fn submit(&self, envelope: Envelope) -> AckFuture;

    /// 传输层名称（用于日志与提示信息）
    fn name(&self) -> &str;
}
