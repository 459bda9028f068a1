pub mod batch;
pub mod retry;

pub use batch::{fetch_all, run_bounded};
pub use retry::{retry_propagating, Attempt, RateLimitAware, RetryEngine, RetryPolicy};
