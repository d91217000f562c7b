//! Common error types for Warden components.

use thiserror::Error;

/// Common errors across Warden components
#[derive(Debug, Error)]
pub enum WardenError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CAPTCHA pool load/save error
    #[error("CAPTCHA pool error: {0}")]
    Pool(String),

    /// CAPTCHA rendering or image encoding error
    #[error("CAPTCHA error: {0}")]
    Captcha(String),

    /// Random number generator failure
    #[error("Entropy failure: {0}")]
    Entropy(String),

    /// HTML template parse/render error
    #[error("Render error: {0}")]
    Render(String),

    /// Filesystem or socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
