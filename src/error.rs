//! Error types.
//!
//! - `PseError` is what the library returns: only structural problems (missing
//!   columns, empty input, unreadable files) are errors. Row- and group-level
//!   problems are reported as `domain::Diagnostic`s instead.
//! - `AppError` is what the binary prints: a message plus a process exit code.

use thiserror::Error;

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PseError {
    /// A required column is missing, the table is empty, or no row is usable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid options passed by the caller (bounds, counts, etc.).
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PseError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        PseError::InvalidInput(message.into())
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        PseError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PseError> for AppError {
    fn from(err: PseError) -> Self {
        let exit_code = match &err {
            PseError::InvalidInput(_) => 3,
            PseError::Io { .. } | PseError::Csv(_) | PseError::Json(_) | PseError::Config(_) => 2,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_exit_code_3() {
        let app: AppError = PseError::invalid_input("Missing required column: `x`").into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("Missing required column"));
    }

    #[test]
    fn config_error_maps_to_exit_code_2() {
        let app: AppError = PseError::Config("x_min must be < x_max".to_string()).into();
        assert_eq!(app.exit_code(), 2);
    }
}
