//! Timeout wrapper for refinement calls.
//!
//! HTTP clients carry their own timeout; this bounds the whole call,
//! including response parsing, so a slow provider never stalls a job.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, TypecraftError};

/// Run `future`, failing with `Timeout` after `timeout`
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TypecraftError::timeout(operation_name, timeout)),
    }
}
