//! Create-time retry for IAM and ECR propagation delays
//!
//! A freshly created role or repository policy can take a while to become
//! visible to the control plane, which rejects the create with a validation
//! or access-denied message in the meantime.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::ApiError;

pub const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(120);

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Messages the control plane returns while a new execution role is not yet assumable
pub const IAM_PROPAGATION_MESSAGES: &[&str] = &[
    "Role validation failed",
    "is not authorized to perform: sts:AssumeRole",
    "cannot be assumed",
];

/// Messages returned while a repository policy granting pull access is not yet visible
pub const ECR_PROPAGATION_MESSAGES: &[&str] = &["Access denied while validating ECR URI"];

fn is_propagation_error(err: &ApiError, needles: &[&str]) -> bool {
    match err {
        ApiError::Validation { message } | ApiError::AccessDenied { message } => {
            needles.iter().any(|needle| message.contains(needle))
        }
        _ => false,
    }
}

/// Re-invokes `op` while it fails with a Validation or AccessDenied error
/// whose message contains one of `needles`, until `timeout` elapses.
/// Any other error is returned immediately.
pub async fn retry_when_message_contains<T, F, Fut>(
    timeout: Duration,
    needles: &[&str],
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let deadline = Instant::now() + timeout;
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_propagation_error(&err, needles) => {
                if Instant::now() + backoff > deadline {
                    return Err(err);
                }
                tracing::debug!(
                    "Retrying after {:?} (attempt {}), waiting for propagation: {}",
                    backoff,
                    attempt,
                    err.message()
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
