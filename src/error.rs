//! Error handling for camagent
//!
//! Closed ports, failed fingerprints and failed ONVIF handshakes are not errors:
//! the scan pipeline represents them by omission. Everything here terminates the
//! current run.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid run configuration, detected before any network I/O
    #[error("Config error: {0}")]
    Config(String),

    /// Inventory API answered with a non-2xx status
    #[error("API error: {status} {message}")]
    Api { status: u16, message: String },

    /// Deploy parameters rejected by the safety gate
    #[error("Unsafe deploy parameter: {0}")]
    UnsafeDeploy(String),

    /// External process (scp, ssh, docker, restart command) failed
    #[error("Process error: {0}")]
    Process(String),

    /// ONVIF SOAP fault or unusable response
    #[error("ONVIF error: {0}")]
    Onvif(String),

    /// Parse error (CIDR, port list, input document)
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for rejections raised by the deploy safety gate
    pub fn is_unsafe_deploy(&self) -> bool {
        matches!(self, Error::UnsafeDeploy(_))
    }
}
