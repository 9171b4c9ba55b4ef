//! Traversal report on stdout.

use std::io::{self, BufWriter, Write};

use bbcount::{Module, ReportOptions, ReportStats, report};
use tracing::info;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal;

/// Handle report mode.
pub fn cmd_report(module: &Module, options: ReportOptions) -> i32 {
    let mut stats = ReportStats::new();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let written = report(module, options)
        .try_for_each(|finding| {
            stats.record(&finding);
            writeln!(out, "{finding}")
        })
        .and_then(|()| out.flush());
    if let Err(err) = written {
        terminal::error(err);
        return EXIT_FAILURE;
    }

    info!(
        functions = stats.functions,
        allocas = stats.allocas,
        direct_calls = stats.direct_calls,
        indirect_calls = stats.indirect_calls,
        callees = stats.distinct_callees(),
        "report finished"
    );
    EXIT_SUCCESS
}
