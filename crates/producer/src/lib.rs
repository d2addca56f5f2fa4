//! courier-producer - 异步消息生产
//!
//! - `ProducerClient`: 有界出站缓冲 + 后台发送任务
//! - `PendingDelivery` / `DeliveryOutcome`: 单条消息的投递结果，恰好产生一次
//! - `DeliveryReporter`: 在投递完成时输出结果

mod budget;
mod client;
mod delivery;
mod memory;
mod reporter;

pub use budget::*;
pub use client::*;
pub use delivery::*;
pub use memory::*;
pub use reporter::*;
