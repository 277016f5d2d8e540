//! Convenience result type alias for Breakglass.

use crate::error::AppError;

/// A specialized `Result` type for Breakglass operations.
pub type AppResult<T> = Result<T, AppError>;
