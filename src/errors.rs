use std::process::ExitCode;

use thiserror::Error;

/// Exit status used when the user interrupts with Ctrl-C.
pub const INTERRUPTED_STATUS: u8 = 130;

/// Failures that decide how the process exits.
///
/// Flows propagate `anyhow::Error`; `main` looks for one of these in the
/// error chain to pick the exit status. Anything unclassified exits with 1.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection failed to {target}: {reason}")]
    Connection { target: String, reason: String },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus { url: String, status: u16, body: String },

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Verification failed: {0}")]
    Verification(String),
}

impl AppError {
    pub fn exit_status(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Connection { .. } => 3,
            AppError::Verification(_) => 4,
            AppError::Cancelled(_) => INTERRUPTED_STATUS,
            _ => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Finds the first `AppError` anywhere in an `anyhow` chain.
pub fn classify(err: &anyhow::Error) -> Option<&AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>())
}
