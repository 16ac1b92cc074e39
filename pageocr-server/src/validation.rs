//! Upload validation module
//!
//! Checks applied to a page image body before it reaches the store.

use crate::error::ApiError;

/// Validates that an upload carries any bytes at all
pub fn validate_not_empty(size: usize) -> Result<(), ApiError> {
    if size == 0 {
        Err(ApiError::bad_request("Empty request body: expected image bytes"))
    } else {
        Ok(())
    }
}

/// Validates the size of an uploaded image
///
/// Returns an error if the image exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "Image too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}
