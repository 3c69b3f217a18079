//! HTTP client module with retry logic, deadlines and error classification.

mod client;
mod retry;

pub use client::{DOWNLOAD_TIMEOUT, HttpClient, METADATA_TIMEOUT};
pub use retry::{NonRetryableError, RetryPolicy, check_retryable, classify_status, is_not_found};
