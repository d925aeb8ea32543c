//! Result and error types for visreg.

use thiserror::Error;

/// Result type for visreg operations
pub type VisregResult<T> = Result<T, VisregError>;

/// Errors that can occur in visreg
#[derive(Debug, Error)]
pub enum VisregError {
    /// Image data is missing, unreadable or not a supported raster format
    #[error("Failed to decode image: {message}")]
    Decode {
        /// Error message
        message: String,
    },

    /// No baseline has been captured under this name
    #[error("Baseline not found: {name}")]
    BaselineNotFound {
        /// Baseline name as given by the caller
        name: String,
    },

    /// Caller passed an unusable value (empty name, empty image, bad threshold)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Two perceptual hashes of different sizes were compared
    #[error("Hash size mismatch: {left}x{left} vs {right}x{right}")]
    HashSizeMismatch {
        /// Hash size of the left operand
        left: u32,
        /// Hash size of the right operand
        right: u32,
    },

    /// Image processing error (encoding, resampling)
    #[error("Image processing failed: {message}")]
    ImageProcessing {
        /// Error message
        message: String,
    },

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl VisregError {
    /// Create a decode error
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a config error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this is the "no reference exists yet" condition.
    ///
    /// Test harnesses use this to tell a missing baseline apart from a
    /// mismatching one.
    #[must_use]
    pub const fn is_baseline_not_found(&self) -> bool {
        matches!(self, Self::BaselineNotFound { .. })
    }
}

/// Check a similarity threshold lies in `[0, 1]`.
pub(crate) fn validate_threshold(threshold: f64) -> VisregResult<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(VisregError::invalid_argument(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_not_found_message() {
        let err = VisregError::BaselineNotFound {
            name: "login_button".to_string(),
        };
        assert!(err.to_string().contains("login_button"));
        assert!(err.is_baseline_not_found());
    }

    #[test]
    fn test_decode_error() {
        let err = VisregError::decode("truncated PNG");
        assert!(err.to_string().contains("decode"));
        assert!(!err.is_baseline_not_found());
    }

    #[test]
    fn test_hash_size_mismatch_message() {
        let err = VisregError::HashSizeMismatch { left: 8, right: 16 };
        assert_eq!(err.to_string(), "Hash size mismatch: 8x8 vs 16x16");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VisregError = io.into();
        assert!(matches!(err, VisregError::Io(_)));
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(0.95).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.01).is_err());
        assert!(validate_threshold(1.5).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }
}
