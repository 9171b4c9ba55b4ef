//! bbcount - basic-block execution counter
//!
//! Loads an LLVM-style textual IR module, verifies it, and either reports
//! what it contains or instruments it so that a linked program counts the
//! basic blocks it executes.
//!
//! # Example
//!
//! ```ignore
//! use bbcount::{InstrumentConfig, instrument_module, load_module};
//!
//! let mut loaded = load_module("hello.ll")?;
//! instrument_module(&mut loaded.module, &InstrumentConfig::default())?;
//! println!("{}", loaded.module);
//! ```

mod error;
mod pipeline;

pub use bbcount_ir::{Module, ParseError, VerifyError, VerifyWarning};
pub use bbcount_pass::{
    CountBasicBlocks, Finding, InstrumentConfig, OnExisting, PassError, PassManager, ReportOptions,
    ReportStats, report,
};
pub use error::{Error, Result};
pub use pipeline::*;
