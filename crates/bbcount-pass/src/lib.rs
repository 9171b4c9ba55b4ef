//! Basic-block execution counting over bbcount IR.
//!
//! [`CountBasicBlocks`] adds a 64-bit global counter to a module, calls a
//! runtime setup hook first thing in the entry function, and bumps the
//! counter before every block terminator. [`report`] walks a module
//! read-only and yields what it finds: functions, stack allocations and
//! call sites.

mod config;
mod count;
mod inject;
mod instrument;
mod manager;
mod report;

pub use config::*;
pub use count::*;
pub use inject::*;
pub use instrument::*;
pub use manager::*;
pub use report::*;

use bbcount_ir::{IrError, VerifyError};
use thiserror::Error;

/// Pass errors.
#[derive(Error, Debug)]
pub enum PassError {
    #[error("count-bb requires a `{0}` function")]
    MissingEntryFunction(String),
    #[error("module is already instrumented: `@{0}` exists")]
    AlreadyInstrumented(String),
    #[error("`@{0}` clashes with another symbol count-bb needs")]
    SymbolConflict(String),
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
    #[error("module is invalid after `{pass}`: {} error(s), first: {}", .errors.len(), first_error(.errors))]
    VerificationFailed {
        pass: &'static str,
        errors: Vec<VerifyError>,
    },
}

fn first_error(errors: &[VerifyError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, PassError>;
