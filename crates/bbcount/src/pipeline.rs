//! Load → verify → instrument → write.

use std::fs;
use std::path::Path;

use bbcount_ir::{Module, VerifyWarning, parse_bytes, verify_module};
use bbcount_pass::{CountBasicBlocks, InstrumentConfig, PassManager};
use tracing::{debug, info};

use crate::{Error, Result};

/// A parsed module that passed verification.
#[derive(Debug)]
pub struct LoadedModule {
    pub module: Module,
    /// Non-fatal verifier findings.
    pub warnings: Vec<VerifyWarning>,
}

impl LoadedModule {
    /// Whether the verifier found broken debug metadata.
    #[must_use]
    pub fn debug_info_broken(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, VerifyWarning::BrokenDebugInfo { .. }))
    }
}

/// Read, parse and verify the module at `path`.
pub fn load_module(path: impl AsRef<Path>) -> Result<LoadedModule> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    load_module_from_bytes(&bytes, &name)
}

/// Parse and verify a module from raw file contents.
pub fn load_module_from_bytes(bytes: &[u8], name: &str) -> Result<LoadedModule> {
    let module = parse_bytes(bytes, name)?;
    let report = verify_module(&module);
    if !report.is_valid() {
        return Err(Error::InvalidModule(report.errors));
    }
    info!(
        module = name,
        functions = module.functions().len(),
        blocks = module.block_count(),
        "loaded module"
    );
    Ok(LoadedModule {
        module,
        warnings: report.warnings,
    })
}

/// Run the `count-bb` pass over `module`, verifying the result.
pub fn instrument_module(module: &mut Module, config: &InstrumentConfig) -> Result<bool> {
    let mut manager = PassManager::new().with_verify_each(true);
    manager.add_pass(Box::new(CountBasicBlocks::new(config.clone())));
    let modified = manager.run(module)?;
    debug!(modified, "instrumentation finished");
    Ok(modified)
}

/// Print `module` as textual IR to `path`.
pub fn write_module(module: &Module, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, module.to_string())?;
    info!(output = %path.display(), "wrote module");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbcount_pass::PassError;

    const HELLO: &str = "declare void @foo()

define void @main() {
entry:
  %x = alloca i64
  call void @foo()
  ret void
}
";

    #[test]
    fn test_load_valid_module() {
        let loaded = load_module_from_bytes(HELLO.as_bytes(), "hello.ll").unwrap();
        assert_eq!(loaded.module.functions().len(), 2);
        assert!(!loaded.debug_info_broken());
    }

    #[test]
    fn test_load_rejects_unverifiable_module() {
        let source = "define i32 @main() {\n  ret void\n}\n";
        let err = load_module_from_bytes(source.as_bytes(), "bad.ll").unwrap_err();
        assert!(matches!(err, Error::InvalidModule(ref errors) if errors.len() == 1));
        assert!(err.is_invalid_module());
    }

    #[test]
    fn test_load_rejects_bitcode() {
        let err = load_module_from_bytes(b"BC\xC0\xDE\x35\x14", "a.bc").unwrap_err();
        assert!(matches!(err, Error::Parse(bbcount_ir::ParseError::Bitcode)));
    }

    #[test]
    fn test_broken_debug_info_is_a_warning() {
        let source = "define void @main() {\n  ret void, !dbg !7\n}\n";
        let loaded = load_module_from_bytes(source.as_bytes(), "dbg.ll").unwrap();
        assert!(loaded.debug_info_broken());
    }

    #[test]
    fn test_instrument_module() {
        let mut loaded = load_module_from_bytes(HELLO.as_bytes(), "hello.ll").unwrap();
        assert!(instrument_module(&mut loaded.module, &InstrumentConfig::default()).unwrap());
        assert!(loaded.module.global_by_name("bbCounter").is_some());

        let err = instrument_module(&mut loaded.module, &InstrumentConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Pass(PassError::AlreadyInstrumented(_))));
        assert!(!err.is_invalid_module());
    }
}
