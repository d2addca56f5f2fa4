//! 基础设施层

mod console;

pub use console::*;
