//! I/O error classification and retry for table file writes.

use std::io::ErrorKind;
use std::time::Duration;

use crate::config::DbConfig;
use crate::error::DbError;

/// Retry settings for transient I/O failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DbConfig) -> Self {
        Self {
            max_retries: config.persistence_max_retries,
            delay: Duration::from_millis(config.persistence_retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DbConfig::default())
    }
}

/// Classifies I/O errors into specific DbError variants.
pub fn classify_io_error(error: std::io::Error, context: &str) -> DbError {
    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
            DbError::DiskFull(format!("{}: {}", context, error))
        }
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            DbError::TransientIoError(format!("{}: {}", context, error))
        }
        _ => DbError::IoError(format!("{}: {}", context, error)),
    }
}

/// Runs `operation`, retrying only while it fails with `TransientIoError`.
pub fn retry_io_operation<F, T>(
    mut operation: F,
    policy: RetryPolicy,
    context: &str,
) -> Result<T, DbError>
where
    F: FnMut() -> Result<T, DbError>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(DbError::TransientIoError(msg)) if attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Transient I/O error in {} (attempt {}/{}): {}",
                    context,
                    attempt,
                    policy.max_retries,
                    msg
                );
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn classifies_error_kinds() {
        let err = classify_io_error(io::Error::from(ErrorKind::TimedOut), "flush");
        assert!(matches!(err, DbError::TransientIoError(_)));
        let err = classify_io_error(io::Error::from(ErrorKind::PermissionDenied), "flush");
        assert!(matches!(err, DbError::IoError(_)));
        assert!(err.is_persistence_failure());
    }

    #[test]
    fn retries_transient_errors_only() {
        let policy = RetryPolicy {
            max_retries: 2,
            delay: Duration::ZERO,
        };

        let mut calls = 0;
        let result = retry_io_operation(
            || {
                calls += 1;
                if calls < 3 {
                    Err(DbError::TransientIoError("busy".into()))
                } else {
                    Ok(calls)
                }
            },
            policy,
            "test",
        );
        assert_eq!(result.unwrap(), 3);

        let mut calls = 0;
        let result: Result<(), DbError> = retry_io_operation(
            || {
                calls += 1;
                Err(DbError::IoError("denied".into()))
            },
            policy,
            "test",
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
