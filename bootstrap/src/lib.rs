//! courier-bootstrap - 统一启动骨架
//!
//! 配置加载、运行时初始化、基础设施创建与关闭信号

mod infrastructure;
mod retry;
mod runtime;
mod shutdown;
mod starter;

pub use infrastructure::*;
pub use retry::*;
pub use runtime::*;
pub use shutdown::*;
pub use starter::*;
