//! Utility modules for chaptertune

pub mod api_retry;

pub use api_retry::{RateLimitedInvoker, RetryPolicy, Sleeper, TokioSleeper};
