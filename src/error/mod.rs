mod app_error;

pub use app_error::AppError;

/// Result alias shared by handlers, queries and services.
pub type Result<T> = std::result::Result<T, AppError>;
