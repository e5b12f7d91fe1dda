//! I/O utilities for persistence operations.

use std::io::ErrorKind;

use crate::error::StoreError;

/// Classifies I/O errors into specific StoreError variants.
pub fn classify_io_error(error: std::io::Error, context: &str) -> StoreError {
    match error.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            StoreError::TransientIoError(format!("{}: {}", context, error))
        }
        _ => StoreError::IoError(format!("{}: {}", context, error)),
    }
}

/// Retries an operation that may fail with transient I/O errors.
pub fn retry_io_operation<F, T>(
    operation: F,
    max_retries: u32,
    retry_delay_ms: u64,
    context: &str,
) -> Result<T, StoreError>
where
    F: Fn() -> Result<T, StoreError>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(StoreError::TransientIoError(msg)) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Transient I/O error in {} (attempt {}/{}): {}",
                    context,
                    attempt,
                    max_retries,
                    msg
                );
                if retry_delay_ms > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(retry_delay_ms));
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_transient_errors_are_retried() {
        let calls = Cell::new(0);
        let result = retry_io_operation(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(StoreError::TransientIoError("busy".to_string()))
                } else {
                    Ok(7)
                }
            },
            3,
            0,
            "test",
        );
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_io_operation(
            || {
                calls.set(calls.get() + 1);
                Err(StoreError::IoError("denied".to_string()))
            },
            3,
            0,
            "test",
        );
        assert!(matches!(result, Err(StoreError::IoError(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_classify_io_error() {
        let transient = classify_io_error(std::io::Error::from(ErrorKind::TimedOut), "read");
        assert!(matches!(transient, StoreError::TransientIoError(_)));
        let permanent = classify_io_error(std::io::Error::from(ErrorKind::NotFound), "read");
        assert!(matches!(permanent, StoreError::IoError(ref m) if m.starts_with("read")));
    }
}
