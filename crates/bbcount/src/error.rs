use bbcount_ir::{ParseError, VerifyError};
use bbcount_pass::PassError;
use thiserror::Error;

/// Errors from loading, instrumenting or writing a module.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("module failed verification with {} error(s)", .0.len())]
    InvalidModule(Vec<VerifyError>),
    #[error("{0}")]
    Pass(#[from] PassError),
}

impl Error {
    /// Whether the input could not be read as a valid module.
    #[must_use]
    pub const fn is_invalid_module(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::InvalidModule(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
