use std::error::Error;
use std::fmt;

use config::ConfigError;

use crate::engine::EngineError;
use crate::ir::IrError;
use crate::loader::LoadError;

/// Process exit status for any failed run.
pub const EXIT_FAILURE: i32 = 1;

/// Message reported when the run fails without a typed error.
pub const UNKNOWN_FAILURE: &str = "Non-exception object thrown";

/// The two ways a run can fail, as seen from the process boundary.
#[derive(Debug)]
pub enum AppError {
    /// Wrong command line. Carries the usage text.
    Usage(String),
    /// Missing or unreadable files, invalid artifacts, or an engine failure.
    Resource(String),
}

impl AppError {
    /// Exit status the process should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            // clap reports usage mistakes with status 2, keep that convention
            AppError::Usage(_) => 2,
            AppError::Resource(_) => EXIT_FAILURE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Usage(msg) | AppError::Resource(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::Resource(err.to_string())
    }
}

impl From<IrError> for AppError {
    fn from(err: IrError) -> Self {
        AppError::Resource(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Resource(err.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Resource(format!("Configuration error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Resource(err.to_string())
    }
}

impl From<Box<dyn Error + Send + Sync>> for AppError {
    fn from(err: Box<dyn Error + Send + Sync>) -> Self {
        AppError::Resource(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_and_resource_exit_codes_differ_from_success() {
        assert_ne!(AppError::Usage("Usage: x".into()).exit_code(), 0);
        assert_eq!(AppError::Resource("boom".into()).exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_load_error_becomes_resource_error() {
        let err: AppError = LoadError::CannotOpen("/nowhere/model.xml".into()).into();
        assert!(matches!(err, AppError::Resource(_)));
        assert!(err.message().contains("Cannot open model or weights file"));
    }
}
