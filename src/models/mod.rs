//! Data models

mod controls;
mod environment;
mod filter;
mod health;
mod node;

pub use controls::*;
pub use environment::*;
pub use filter::*;
pub use health::*;
pub use node::*;
