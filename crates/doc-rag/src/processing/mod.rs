//! Retry and cancellation primitives for ingestion and query work

mod cancel;
mod retry;

pub use cancel::CancellationToken;
pub use retry::RetryPolicy;
