//! CLI definitions and argument types.

use std::path::PathBuf;

use bbcount::{InstrumentConfig, OnExisting};
use bbcount_pass::{DEFAULT_COUNTER, DEFAULT_ENTRY, DEFAULT_HOOK};
use clap::{Parser, ValueEnum};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

/// Printed on stdout for any argument error.
pub const USAGE: &str = "usage: bbcount <IR file>";

#[derive(Parser)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "bbcount")]
#[command(about = "Basic-block execution counter for LLVM-style textual IR")]
#[command(version)]
pub struct Cli {
    /// Input IR module (textual)
    #[arg(value_name = "IR_FILE")]
    pub input: PathBuf,

    /// Run the count-bb pass and print the instrumented module
    #[arg(long)]
    pub instrument: bool,

    /// Write the instrumented module to FILE (implies --instrument)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Function that calls the setup hook
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ENTRY)]
    pub entry: String,

    /// Name of the counter global
    #[arg(long, value_name = "NAME", default_value = DEFAULT_COUNTER)]
    pub counter: String,

    /// Name of the runtime setup hook
    #[arg(long, value_name = "NAME", default_value = DEFAULT_HOOK)]
    pub hook: String,

    /// What to do when the counter already exists
    #[arg(long, value_enum, default_value = "fail")]
    pub on_existing: OnExistingArg,

    /// Also report blocks, loads, stores and compares
    #[arg(long, conflicts_with_all = ["instrument", "output"])]
    pub detailed: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub silent: bool,
}

impl Cli {
    /// Whether to instrument instead of report.
    #[must_use]
    pub const fn instruments(&self) -> bool {
        self.instrument || self.output.is_some()
    }

    /// Pass settings from the command line.
    #[must_use]
    pub fn instrument_config(&self) -> InstrumentConfig {
        InstrumentConfig::default()
            .with_entry(self.entry.as_str())
            .with_counter(self.counter.as_str())
            .with_hook(self.hook.as_str())
            .with_on_existing(self.on_existing.into())
    }

    /// Default log directive for the chosen verbosity.
    #[must_use]
    pub const fn log_directive(&self) -> &'static str {
        if self.verbose {
            "bbcount=debug"
        } else if self.silent {
            "bbcount=error"
        } else {
            "bbcount=warn"
        }
    }
}

/// Policy argument for an already-present counter.
#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum OnExistingArg {
    /// Refuse to instrument twice
    #[default]
    Fail,
    /// Leave the module unchanged
    Skip,
}

impl From<OnExistingArg> for OnExisting {
    fn from(arg: OnExistingArg) -> Self {
        match arg {
            OnExistingArg::Fail => Self::Fail,
            OnExistingArg::Skip => Self::Skip,
        }
    }
}
