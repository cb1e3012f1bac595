use crate::pkg::PkgError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for ahkpm operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pkg(#[from] PkgError),

    #[error("No ahkpm.json found in {start} or any parent directory")]
    ProjectNotFound { start: PathBuf },

    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Stable error code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Pkg(e) => e.code(),
            Self::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            Self::InvalidEnv { .. } => "INVALID_ENV",
            Self::Other(_) => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through_pkg_errors() {
        let err = Error::from(PkgError::GitUnavailable);
        assert_eq!(err.code(), "PKG_GIT_UNAVAILABLE");

        let err = Error::ProjectNotFound {
            start: PathBuf::from("/tmp"),
        };
        assert_eq!(err.code(), "PROJECT_NOT_FOUND");
        assert!(err.to_string().contains("ahkpm.json"));
    }
}
