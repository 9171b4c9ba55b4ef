//! Instrument mode.

use std::io::{self, Write};

use bbcount::{Module, instrument_module, write_module};
use tracing::info;

use crate::cli::{Cli, EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal;

/// Handle instrument mode: run the pass, then print or write the module.
pub fn cmd_instrument(cli: &Cli, mut module: Module) -> i32 {
    let config = cli.instrument_config();
    let modified = match instrument_module(&mut module, &config) {
        Ok(modified) => modified,
        Err(err) => {
            terminal::error(err);
            return EXIT_FAILURE;
        }
    };
    info!(modified, counter = %config.counter, "count-bb done");

    let written = match &cli.output {
        Some(path) => write_module(&module, path).map_err(|e| e.to_string()),
        None => {
            let mut out = io::stdout().lock();
            write!(out, "{module}")
                .and_then(|()| out.flush())
                .map_err(|e| e.to_string())
        }
    };
    match written {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            terminal::error(err);
            EXIT_FAILURE
        }
    }
}
