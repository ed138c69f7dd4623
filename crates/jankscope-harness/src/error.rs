use std::path::PathBuf;

use jankscope_core::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("required path does not exist: {path}")]
    MissingPath { path: PathBuf },

    #[error("malformed trace at line {line}: {message}")]
    MalformedTrace { line: usize, message: String },
}

impl HarnessError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::Config(_) | Self::MissingPath { .. } => 2,
            Self::MalformedTrace { .. } => 3,
            Self::Io(_) | Self::Json(_) => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedTrace {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_usage_from_input_errors() {
        assert_eq!(HarnessError::invalid("bad").exit_code(), 2);
        assert_eq!(
            HarnessError::Config(ConfigError::NegativeMergeGap { value: -1 }).exit_code(),
            2
        );
        assert_eq!(HarnessError::malformed(4, "oops").exit_code(), 3);
        let io = std::io::Error::other("disk");
        assert_eq!(HarnessError::from(io).exit_code(), 1);
    }

    #[test]
    fn malformed_trace_names_the_line() {
        let message = HarnessError::malformed(12, "unknown kind").to_string();
        assert_eq!(message, "malformed trace at line 12: unknown kind");
    }
}
