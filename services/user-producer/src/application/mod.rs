//! 应用层

mod input_loop;
mod publisher;

pub use input_loop::*;
pub use publisher::*;
