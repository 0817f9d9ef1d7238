//! Result type alias for Wardsync
//!
//! This module provides a convenient Result type alias that uses WardsyncError
//! as the error type.

use super::errors::WardsyncError;

/// Result type alias for Wardsync operations
///
/// # Examples
///
/// ```
/// use wardsync::domain::result::Result;
/// use wardsync::domain::errors::WardsyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(WardsyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, WardsyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{StoreError, WardsyncError};

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(WardsyncError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> std::result::Result<i32, StoreError> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
