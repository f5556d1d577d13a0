//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
/// A failed run already carries its rendered summary.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::RunFailed(report) => report.clone(),
        other => other.to_string(),
    }
}
