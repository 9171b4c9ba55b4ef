//! One-time module setup: counter global, hook declaration and hook call.

use bbcount_ir::{
    CallSite, Constant, GlobalId, GlobalVariable, InstBuilder, Linkage, Module, Signature, Symbol, Type,
};
use tracing::{debug, warn};

use crate::config::{InstrumentConfig, OnExisting};
use crate::{PassError, Result};

/// Handle to the injected counter, passed to the per-block instrumenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterHandle {
    pub global: GlobalId,
    pub ty: Type,
}

/// Result of [`initialize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    /// Counter and hook were added.
    Injected(CounterHandle),
    /// The counter already existed and the policy was [`OnExisting::Skip`].
    AlreadyInstrumented,
}

/// Add the counter global and hook call to `module`.
///
/// The counter is an `i64` with common linkage initialized to zero. The hook
/// is declared as `void ()` (or an existing matching declaration is reused)
/// and called as the first instruction of the entry function's entry block.
///
/// Every check runs before the first mutation, so a failed call leaves the
/// module as it was.
pub fn initialize(module: &mut Module, config: &InstrumentConfig) -> Result<InitOutcome> {
    let entry = module
        .function_by_name(&config.entry)
        .ok_or_else(|| PassError::MissingEntryFunction(config.entry.clone()))?;

    // The hook must stay a distinct callee.
    if config.hook == config.counter || config.hook == config.entry {
        return Err(PassError::SymbolConflict(config.hook.clone()));
    }

    match module.symbol(&config.counter) {
        Some(Symbol::Global(_)) => {
            return match config.on_existing {
                OnExisting::Fail => Err(PassError::AlreadyInstrumented(config.counter.clone())),
                OnExisting::Skip => {
                    debug!(counter = %config.counter, "counter exists, skipping");
                    Ok(InitOutcome::AlreadyInstrumented)
                }
            };
        }
        Some(Symbol::Function(_)) => return Err(PassError::SymbolConflict(config.counter.clone())),
        None => {}
    }

    let hook = module.get_or_insert_function(&config.hook, &Signature::void())?;

    let counter = GlobalVariable::new(config.counter.as_str(), Type::I64)
        .with_linkage(Linkage::Common)
        .with_initializer(Constant::int(64, 0))
        .with_align(8);
    let global = module.add_global(counter)?;

    let func = module.function_mut(entry);
    match func.entry_block() {
        Some(block) => {
            InstBuilder::at_start(func, block).call(CallSite::direct(hook, Type::Void, Vec::new()), "")?;
        }
        None => warn!(
            function = %config.entry,
            "entry function is only declared, hook call not inserted"
        ),
    }

    debug!(
        counter = %config.counter,
        hook = %config.hook,
        entry = %config.entry,
        "injected counter and setup hook"
    );
    Ok(InitOutcome::Injected(CounterHandle {
        global,
        ty: Type::I64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbcount_ir::{InstKind, parse_module};

    const MAIN: &str = "define i32 @main() {
entry:
  %x = alloca i64
  ret i32 0
}
";

    fn parse(source: &str) -> Module {
        parse_module(source, "test").unwrap()
    }

    #[test]
    fn test_initialize_adds_counter_hook_and_call() {
        let mut module = parse(MAIN);
        let outcome = initialize(&mut module, &InstrumentConfig::default()).unwrap();
        let InitOutcome::Injected(handle) = outcome else {
            panic!("expected injection");
        };

        let counter = module.global(handle.global);
        assert_eq!(counter.name, "bbCounter");
        assert_eq!(counter.linkage, Linkage::Common);
        assert_eq!(counter.initializer, Some(Constant::int(64, 0)));
        assert_eq!(handle.ty, Type::I64);

        let hook = module.function_by_name("setupAtExit").unwrap();
        assert!(module.function(hook).is_declaration());
        assert_eq!(module.function(hook).signature(), Signature::void());

        let main = module.function(module.function_by_name("main").unwrap());
        let first = &main.blocks()[0].instructions()[0];
        assert_eq!(first.as_call().unwrap().called_function(), Some(hook));
        assert_eq!(main.blocks()[0].len(), 3);
    }

    #[test]
    fn test_hook_call_precedes_existing_instructions() {
        let mut module = parse(MAIN);
        initialize(&mut module, &InstrumentConfig::default()).unwrap();
        let main = module.function(module.function_by_name("main").unwrap());
        let ops: Vec<_> = main.blocks()[0].iter().map(|i| i.opcode()).collect();
        assert_eq!(ops, ["call", "alloca", "ret"]);
    }

    #[test]
    fn test_missing_main_is_error() {
        let mut module = parse("define void @helper() {\n  ret void\n}\n");
        let err = initialize(&mut module, &InstrumentConfig::default()).unwrap_err();
        assert!(matches!(err, PassError::MissingEntryFunction(ref name) if name == "main"));
        assert_eq!(err.to_string(), "count-bb requires a `main` function");
        assert!(module.globals().is_empty());
        assert_eq!(module.functions().len(), 1);
    }

    #[test]
    fn test_existing_hook_declaration_is_reused() {
        let mut module = parse(&format!("declare void @setupAtExit()\n{MAIN}"));
        initialize(&mut module, &InstrumentConfig::default()).unwrap();
        assert_eq!(module.functions().len(), 2);
    }

    #[test]
    fn test_hook_signature_mismatch_leaves_module_untouched() {
        let mut module = parse(&format!("declare i32 @setupAtExit(i32)\n{MAIN}"));
        let err = initialize(&mut module, &InstrumentConfig::default()).unwrap_err();
        assert!(matches!(err, PassError::Ir(_)));
        assert!(module.globals().is_empty());
    }

    #[test]
    fn test_second_initialize_fails_by_default() {
        let mut module = parse(MAIN);
        initialize(&mut module, &InstrumentConfig::default()).unwrap();
        let err = initialize(&mut module, &InstrumentConfig::default()).unwrap_err();
        assert!(matches!(err, PassError::AlreadyInstrumented(_)));
    }

    #[test]
    fn test_second_initialize_can_skip() {
        let mut module = parse(MAIN);
        let config = InstrumentConfig::default().with_on_existing(OnExisting::Skip);
        initialize(&mut module, &config).unwrap();
        let before = module.instruction_count();
        assert_eq!(initialize(&mut module, &config).unwrap(), InitOutcome::AlreadyInstrumented);
        assert_eq!(module.instruction_count(), before);
    }

    #[test]
    fn test_counter_name_taken_by_function() {
        let mut module = parse(&format!("declare void @bbCounter()\n{MAIN}"));
        let err = initialize(&mut module, &InstrumentConfig::default()).unwrap_err();
        assert!(matches!(err, PassError::SymbolConflict(_)));
    }

    #[test]
    fn test_hook_named_like_counter_is_rejected() {
        let mut module = parse(MAIN);
        let config = InstrumentConfig::default().with_hook("bbCounter");
        let err = initialize(&mut module, &config).unwrap_err();
        assert!(matches!(err, PassError::SymbolConflict(ref name) if name == "bbCounter"));
        assert_eq!(module.functions().len(), 1);
        assert!(module.globals().is_empty());
    }

    #[test]
    fn test_hook_named_like_entry_is_rejected() {
        let mut module = parse(MAIN);
        let before = module.instruction_count();
        let config = InstrumentConfig::default().with_hook("main");
        let err = initialize(&mut module, &config).unwrap_err();
        assert!(matches!(err, PassError::SymbolConflict(ref name) if name == "main"));
        assert_eq!(module.instruction_count(), before);
        assert!(module.globals().is_empty());
    }

    #[test]
    fn test_declared_entry_gets_counter_without_call() {
        let mut module = parse("declare i32 @main()\n");
        let outcome = initialize(&mut module, &InstrumentConfig::default()).unwrap();
        assert!(matches!(outcome, InitOutcome::Injected(_)));
        assert!(module.global_by_name("bbCounter").is_some());
        assert_eq!(module.instruction_count(), 0);
    }

    #[test]
    fn test_custom_names() {
        let mut module = parse("define void @start() {\n  ret void\n}\n");
        let config = InstrumentConfig::default()
            .with_entry("start")
            .with_counter("hits")
            .with_hook("init_hits");
        initialize(&mut module, &config).unwrap();
        assert!(module.global_by_name("hits").is_some());
        let start = module.function(module.function_by_name("start").unwrap());
        assert!(matches!(
            &start.blocks()[0].instructions()[0].kind,
            InstKind::Call(site) if site.called_function() == module.function_by_name("init_hits")
        ));
    }
}
