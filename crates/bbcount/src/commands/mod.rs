//! Command implementations.
//!
//! The CLI has two modes: report (the default) and instrument.

mod instrument;
mod report;

use bbcount::{Error, ReportOptions, load_module};

use crate::cli::{Cli, EXIT_FAILURE};
use crate::terminal;

/// Load the input module and dispatch to the selected mode.
pub fn run_command(cli: &Cli) -> i32 {
    let loaded = match load_module(&cli.input) {
        Ok(loaded) => loaded,
        Err(err) => return load_failed(cli, &err),
    };
    if loaded.debug_info_broken() {
        terminal::caution("debug info is broken");
    }

    if cli.instruments() {
        instrument::cmd_instrument(cli, loaded.module)
    } else {
        report::cmd_report(
            &loaded.module,
            ReportOptions {
                detailed: cli.detailed,
            },
        )
    }
}

fn load_failed(cli: &Cli, err: &Error) -> i32 {
    if !err.is_invalid_module() {
        terminal::error(err);
        return EXIT_FAILURE;
    }
    match err {
        Error::Parse(parse) => terminal::diagnostic(&cli.input, parse),
        Error::InvalidModule(errors) => {
            for verify in errors {
                terminal::diagnostic(&cli.input, verify);
            }
        }
        _ => {}
    }
    terminal::error("invalid module");
    EXIT_FAILURE
}
