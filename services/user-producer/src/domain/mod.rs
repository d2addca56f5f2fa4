//! 领域层

mod user;

pub use user::*;
