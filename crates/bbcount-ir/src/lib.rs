//! Intermediate representation for the basic-block counter.
//!
//! An LLVM-style IR: module → functions → basic blocks → instructions, with
//! a shared `@`-namespace for globals and functions. This crate owns the
//! data model plus the collaborators needed to get a module in and out of
//! text: a parser for a textual subset, a printer and a verifier.

mod block;
mod builder;
mod display;
mod function;
mod instr;
mod module;
pub mod parse;
mod terminator;
mod types;
mod value;
pub mod verify;

pub use block::*;
pub use builder::*;
pub use display::*;
pub use function::*;
pub use instr::*;
pub use module::*;
pub use parse::{ParseError, parse_bytes, parse_module};
pub use types::*;
pub use value::*;
pub use verify::{VerifyError, VerifyReport, VerifyWarning, verify_module};

use thiserror::Error;

/// Errors raised when mutating the IR.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("symbol `@{0}` is already defined")]
    DuplicateSymbol(String),
    #[error("value `%{name}` is already defined in `@{function}`")]
    DuplicateValue { function: String, name: String },
    #[error("`@{name}` has signature `{found}`, expected `{expected}`")]
    SignatureMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("cannot insert at index {index} of block `%{block}`")]
    InvalidInsertion { block: String, index: usize },
    #[error("block `%{block}` in `@{function}` has no terminator")]
    MissingTerminator { function: String, block: String },
}

pub type Result<T> = std::result::Result<T, IrError>;
