// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use std::path::PathBuf;

use thiserror::Error;

/// Root error type for all HL-MRF kernel failures.
///
/// Recoverable conditions (a term shape a reasoner cannot handle, an
/// unrecognized comparator) are not errors: the generator logs them once
/// and drops the term.
#[derive(Error, Debug)]
pub enum HlmrfError {
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid model input (unknown rule, bad weight, oversized term).
    #[error("validation error: {0}")]
    Validation(String),

    /// Numerical error (NaN/Inf in a proximal solve or gradient step).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Term page could not be read or written.
    #[error("page I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Term page contents are truncated or corrupt.
    #[error("page format error: {0}")]
    PageFormat(String),

    /// Operation not valid in the current store/reasoner state.
    #[error("state error: {0}")]
    State(String),
}

impl HlmrfError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type HlmrfResult<T> = Result<T, HlmrfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_names_path() {
        let err = HlmrfError::io(
            "/tmp/pages/00000003.page",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("00000003.page"), "{msg}");
        assert!(msg.contains("gone"), "{msg}");
    }

    #[test]
    fn test_numerical_display() {
        let err = HlmrfError::Numerical("x[0] = NaN".into());
        assert_eq!(err.to_string(), "numerical error: x[0] = NaN");
    }
}
