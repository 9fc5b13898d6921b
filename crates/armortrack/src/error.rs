//! Crate error type.
//!
//! Geometry failures (degenerate contours, incompatible pairs) are not errors:
//! they surface as `Option::None` and the candidate is dropped. This type only
//! covers hard construction failures and configuration/collaborator I/O.

/// Errors reported by `armortrack`.
#[derive(Debug)]
pub enum Error {
    /// A four-corner feature was built from the wrong number of corners.
    InvalidCornerCount {
        /// Required number of corners.
        expected: usize,
        /// Provided number of corners.
        got: usize,
    },
    /// The classifier collaborator failed on a region of interest.
    Classifier(String),
    /// Reading a configuration file failed.
    Io(std::io::Error),
    /// Parsing a configuration file failed.
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCornerCount { expected, got } => {
                write!(f, "invalid corner count: expected {}, got {}", expected, got)
            }
            Self::Classifier(msg) => write!(f, "classifier failed: {}", msg),
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
