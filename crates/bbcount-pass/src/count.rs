//! The `count-bb` module pass.

use bbcount_ir::Module;
use tracing::info;

use crate::Result;
use crate::config::InstrumentConfig;
use crate::inject::{InitOutcome, initialize};
use crate::instrument::instrument_function;
use crate::manager::ModulePass;

/// Registered pass name.
pub const PASS_NAME: &str = "count-bb";

/// Counts executed basic blocks at runtime.
///
/// Runs [`initialize`] once, then instruments every block of every function
/// in module order. The module is reported as modified if any step changed
/// it.
#[derive(Clone, Debug, Default)]
pub struct CountBasicBlocks {
    config: InstrumentConfig,
}

impl CountBasicBlocks {
    /// Create the pass with the given settings.
    #[must_use]
    pub const fn new(config: InstrumentConfig) -> Self {
        Self { config }
    }

    /// Get the settings.
    #[must_use]
    pub const fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    /// Instrument `module`.
    pub fn run(&self, module: &mut Module) -> Result<bool> {
        let counter = match initialize(module, &self.config)? {
            InitOutcome::Injected(handle) => handle,
            InitOutcome::AlreadyInstrumented => return Ok(false),
        };

        let mut modified = true;
        let mut blocks = 0usize;
        for func in module.functions_mut() {
            blocks += func.block_count();
            modified |= instrument_function(func, counter)?;
        }

        info!(
            functions = module.functions().len(),
            blocks,
            counter = %self.config.counter,
            "module instrumented"
        );
        Ok(modified)
    }
}

impl ModulePass for CountBasicBlocks {
    fn name(&self) -> &'static str {
        PASS_NAME
    }

    fn run_on_module(&mut self, module: &mut Module) -> Result<bool> {
        self.run(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OnExisting, PassError};
    use bbcount_ir::{parse_module, verify_module};

    const SCENARIO: &str = "declare void @foo()

define void @main() {
entry:
  %x = alloca i64
  call void @foo()
  ret void
}
";

    fn opcodes(module: &Module, func: &str) -> Vec<Vec<&'static str>> {
        let func = module.function(module.function_by_name(func).unwrap());
        func.blocks()
            .iter()
            .map(|b| b.iter().map(|i| i.opcode()).collect())
            .collect()
    }

    #[test]
    fn test_single_block_main() {
        let mut module = parse_module(SCENARIO, "test").unwrap();
        assert!(CountBasicBlocks::default().run(&mut module).unwrap());
        assert_eq!(
            opcodes(&module, "main"),
            [["call", "alloca", "call", "load", "add", "store", "ret"]]
        );
        assert!(verify_module(&module).is_valid());
    }

    #[test]
    fn test_every_block_in_every_function() {
        let mut module = parse_module(
            "define i32 @helper(i1 %c) {
entry:
  br i1 %c, label %yes, label %no

yes:
  ret i32 1

no:
  ret i32 0
}

define i32 @main() {
  %r = call i32 @helper(i1 true)
  ret i32 %r
}
",
            "test",
        )
        .unwrap();
        let blocks = module.block_count();
        let before = module.instruction_count();
        assert!(CountBasicBlocks::default().run(&mut module).unwrap());
        // Three per block, plus the hook call.
        assert_eq!(module.instruction_count(), before + 3 * blocks + 1);
        for block in module.functions().iter().flat_map(|f| f.blocks()) {
            let n = block.len();
            assert!(block.instructions()[n - 1].is_terminator());
            assert!(block.instructions()[n - 2].is_store());
            assert!(block.instructions()[n - 4].is_load());
        }
        assert!(verify_module(&module).is_valid());
    }

    #[test]
    fn test_missing_main_aborts() {
        let mut module = parse_module("define void @f() {\n  ret void\n}\n", "test").unwrap();
        let err = CountBasicBlocks::default().run(&mut module).unwrap_err();
        assert!(matches!(err, PassError::MissingEntryFunction(_)));
        assert_eq!(module.instruction_count(), 1);
    }

    #[test]
    fn test_declarations_only_module() {
        let mut module = parse_module("declare i32 @main()\ndeclare void @foo()\n", "test").unwrap();
        assert!(CountBasicBlocks::default().run(&mut module).unwrap());
        assert_eq!(module.globals().len(), 1);
        assert_eq!(module.globals()[0].name, "bbCounter");
        assert_eq!(module.functions().len(), 3);
        let hook = module.function(module.function_by_name("setupAtExit").unwrap());
        assert!(hook.is_declaration());
        assert!(module.functions().iter().all(|f| f.is_declaration()));
        assert_eq!(module.instruction_count(), 0);
        assert!(verify_module(&module).is_valid());
    }

    #[test]
    fn test_rerun_with_skip_reports_unmodified() {
        let mut module = parse_module(SCENARIO, "test").unwrap();
        let pass = CountBasicBlocks::new(InstrumentConfig::default().with_on_existing(OnExisting::Skip));
        assert!(pass.run(&mut module).unwrap());
        let count = module.instruction_count();
        assert!(!pass.run(&mut module).unwrap());
        assert_eq!(module.instruction_count(), count);
    }

    #[test]
    fn test_pass_name() {
        assert_eq!(CountBasicBlocks::default().name(), "count-bb");
    }
}
