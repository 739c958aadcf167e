//! Shared utilities

pub mod cancel;
pub mod error;
pub mod validation;

pub use cancel::{cancellable, with_deadline};
pub use error::{AppError, AppResult};
