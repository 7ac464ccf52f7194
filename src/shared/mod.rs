pub mod shutdown;
pub mod types;
pub mod utills;
pub mod validations;

pub use types::{PaginatedResult, PaginationParams};
pub use utills::{retry_with_backoff, RetryConfig};
