//! Result type alias for config-merge operations

use crate::error::ConfigMergeError;

/// Standard Result type for config-merge operations
pub type Result<T> = std::result::Result<T, ConfigMergeError>;

/// Extension trait for attaching the processed file to an error
pub trait ResultExt<T> {
    /// Wrap the error with the path of the file being processed
    fn in_file(self, path: &std::path::Path) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_file(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|err| {
            tracing::debug!("Failure while processing {}: {}", path.display(), err);
            err.in_file(path)
        })
    }
}
