//! Error handling module for the page sync engine.
//!
//! Provides the centralized error type shared by the cache, the remote store
//! adapters, the coordinator and the credential check.

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONNECTIVITY_ERROR: &str = "CONNECTIVITY_ERROR";
    pub const WRITE_ERROR: &str = "WRITE_ERROR";
    pub const CREDENTIAL_ERROR: &str = "CREDENTIAL_ERROR";
    pub const MALFORMED_DATA: &str = "MALFORMED_DATA";
    pub const CACHE_ERROR: &str = "CACHE_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync engine error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Remote store unreachable, closed or silent
    Connectivity(String),
    /// Remote write rejected or failed in transit
    Write(String),
    /// Digest mismatch or privileged mode required
    Credential(String),
    /// Upstream value could not be decoded
    MalformedData(String),
    /// Local snapshot could not be read or written
    Cache(String),
    /// Collection index out of range
    NotFound(String),
    /// Invalid configuration value
    Config(String),
}

impl SyncError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Connectivity(_) => codes::CONNECTIVITY_ERROR,
            SyncError::Write(_) => codes::WRITE_ERROR,
            SyncError::Credential(_) => codes::CREDENTIAL_ERROR,
            SyncError::MalformedData(_) => codes::MALFORMED_DATA,
            SyncError::Cache(_) => codes::CACHE_ERROR,
            SyncError::NotFound(_) => codes::NOT_FOUND,
            SyncError::Config(_) => codes::CONFIG_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            SyncError::Connectivity(msg) => msg.clone(),
            SyncError::Write(msg) => msg.clone(),
            SyncError::Credential(msg) => msg.clone(),
            SyncError::MalformedData(msg) => msg.clone(),
            SyncError::Cache(msg) => msg.clone(),
            SyncError::NotFound(msg) => msg.clone(),
            SyncError::Config(msg) => msg.clone(),
        }
    }

    /// Re-tag a transport failure that happened while writing.
    ///
    /// Adapters report connection problems as `Connectivity`; from the
    /// caller's point of view a failed write is always a `Write` error.
    pub fn into_write_error(self) -> Self {
        match self {
            SyncError::Write(_) => self,
            other => SyncError::Write(other.message()),
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for SyncError {}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON error: {:?}", err);
        SyncError::MalformedData(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        tracing::warn!("Local cache I/O error: {:?}", err);
        SyncError::Cache(format!("I/O error: {}", err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        tracing::warn!("Remote transport error: {:?}", err);
        SyncError::Connectivity(format!("Transport error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = SyncError::Write("permission denied".into());
        assert_eq!(err.to_string(), "WRITE_ERROR: permission denied");
    }

    #[test]
    fn test_into_write_error() {
        let err = SyncError::Connectivity("connection reset".into()).into_write_error();
        assert_eq!(err, SyncError::Write("connection reset".into()));

        let err = SyncError::Write("rejected".into()).into_write_error();
        assert_eq!(err.error_code(), codes::WRITE_ERROR);
    }

    #[test]
    fn test_json_error_is_malformed_data() {
        let err: SyncError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(err.error_code(), codes::MALFORMED_DATA);
    }
}
