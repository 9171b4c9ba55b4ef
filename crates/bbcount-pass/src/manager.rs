//! Ordered execution of module passes.

use bbcount_ir::{Module, verify_module};
use tracing::{debug, info_span};

use crate::{PassError, Result};

/// A transformation over a whole module.
pub trait ModulePass {
    /// Pass name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Run on `module`. Returns whether the module changed.
    fn run_on_module(&mut self, module: &mut Module) -> Result<bool>;
}

/// Runs passes in registration order, optionally verifying after each.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn ModulePass>>,
    verify_each: bool,
}

impl PassManager {
    /// Create an empty pass manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the module after every pass that changed it.
    #[must_use]
    pub const fn with_verify_each(mut self, enabled: bool) -> Self {
        self.verify_each = enabled;
        self
    }

    /// Append a pass.
    pub fn add_pass(&mut self, pass: Box<dyn ModulePass>) {
        self.passes.push(pass);
    }

    /// Registered pass names in order.
    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|p| p.name())
    }

    /// Run every pass over `module`.
    ///
    /// Stops at the first failing pass. Returns whether any pass changed the
    /// module.
    pub fn run(&mut self, module: &mut Module) -> Result<bool> {
        let mut modified = false;
        for pass in &mut self.passes {
            let name = pass.name();
            let _span = info_span!("pass", pass = name).entered();
            let changed = pass.run_on_module(module)?;
            debug!(changed, "pass finished");

            if changed && self.verify_each {
                let report = verify_module(module);
                if !report.is_valid() {
                    return Err(PassError::VerificationFailed {
                        pass: name,
                        errors: report.errors,
                    });
                }
            }
            modified |= changed;
        }
        Ok(modified)
    }
}
