//! Structural well-formedness checks.
//!
//! The verifier never panics on malformed ids: everything a builder or the
//! parser could get wrong is reported as a [`VerifyError`]. Problems that do
//! not make the module unusable (dangling debug locations) are reported as
//! [`VerifyWarning`]s.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, debug_span};

use crate::function::Function;
use crate::instr::{InstKind, Instruction};
use crate::module::Module;
use crate::types::Type;
use crate::value::{BlockId, Constant, Operand, ValueDef, ValueId};

/// Structural defect that makes a module invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("block `%{block}` in `@{function}` is empty")]
    EmptyBlock { function: String, block: String },
    #[error("block `%{block}` in `@{function}` does not end in a terminator")]
    MissingTerminator { function: String, block: String },
    #[error("terminator before the end of block `%{block}` in `@{function}`")]
    TerminatorNotLast { function: String, block: String },
    #[error("block `%{block}` in `@{function}` refers to an unknown block")]
    UnknownBlock { function: String, block: String },
    #[error("block `%{block}` in `@{function}` uses an undefined value")]
    UndefinedValue { function: String, block: String },
    #[error("`%{value}` is used before its definition in `@{function}`")]
    UseBeforeDef { function: String, value: String },
    #[error("phi after a non-phi instruction in block `%{block}` of `@{function}`")]
    PhiNotAtStart { function: String, block: String },
    #[error("call to `@{callee}` in `@{function}` passes {found} arguments, expected {expected}")]
    CallArity {
        function: String,
        callee: String,
        expected: usize,
        found: usize,
    },
    #[error("`ret` in `@{function}` does not match return type `{expected}`")]
    ReturnMismatch { function: String, expected: Type },
    #[error("{opcode} through a non-pointer operand in `@{function}`")]
    NonPointerAccess {
        function: String,
        opcode: &'static str,
    },
    #[error("`@{function}` refers to an unknown global or function")]
    UnknownSymbol { function: String },
}

/// Defect that leaves the module usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyWarning {
    #[error("`@{function}` attaches undefined debug location `!{node}`")]
    BrokenDebugInfo { function: String, node: u32 },
}

/// Result of verifying a module.
#[derive(Clone, Debug, Default)]
pub struct VerifyReport {
    pub errors: Vec<VerifyError>,
    pub warnings: Vec<VerifyWarning>,
}

impl VerifyReport {
    /// Check if the module is structurally valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if any debug metadata is broken.
    #[must_use]
    pub fn broken_debug_info(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, VerifyWarning::BrokenDebugInfo { .. }))
    }
}

/// Verify every function definition in `module`.
#[must_use]
pub fn verify_module(module: &Module) -> VerifyReport {
    let _span = debug_span!("verify", module = module.name()).entered();
    let mut report = VerifyReport::default();
    for func in module.functions().iter().filter(|f| !f.is_declaration()) {
        FunctionVerifier::new(module, func, &mut report).run();
    }
    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "verified module"
    );
    report
}

struct FunctionVerifier<'a> {
    module: &'a Module,
    func: &'a Function,
    report: &'a mut VerifyReport,
    /// Defining block and position of each instruction result.
    defs: FxHashMap<ValueId, (BlockId, usize)>,
    broken_nodes: FxHashSet<u32>,
}

impl<'a> FunctionVerifier<'a> {
    fn new(module: &'a Module, func: &'a Function, report: &'a mut VerifyReport) -> Self {
        let mut defs = FxHashMap::default();
        for (b, block) in func.blocks().iter().enumerate() {
            for (i, inst) in block.iter().enumerate() {
                if let Some(id) = inst.result {
                    defs.insert(id, (BlockId::new(b), i));
                }
            }
        }
        Self {
            module,
            func,
            report,
            defs,
            broken_nodes: FxHashSet::default(),
        }
    }

    fn name(&self) -> String {
        self.func.name().to_string()
    }

    fn error(&mut self, error: VerifyError) {
        self.report.errors.push(error);
    }

    fn run(mut self) {
        let func = self.func;
        for (b, block) in func.blocks().iter().enumerate() {
            let id = BlockId::new(b);
            let label = block.name().to_string();
            let Some(last) = block.len().checked_sub(1) else {
                self.error(VerifyError::EmptyBlock {
                    function: self.name(),
                    block: label,
                });
                continue;
            };

            if !block.instructions()[last].is_terminator() {
                self.error(VerifyError::MissingTerminator {
                    function: self.name(),
                    block: label.clone(),
                });
            }
            if block.instructions()[..last].iter().any(Instruction::is_terminator) {
                self.error(VerifyError::TerminatorNotLast {
                    function: self.name(),
                    block: label.clone(),
                });
            }

            let mut past_phis = false;
            for (index, inst) in block.iter().enumerate() {
                if inst.is_phi() {
                    if past_phis {
                        self.error(VerifyError::PhiNotAtStart {
                            function: self.name(),
                            block: label.clone(),
                        });
                    }
                } else {
                    past_phis = true;
                }
                self.check_inst(id, &label, index, inst);
            }
        }
    }

    fn check_inst(&mut self, block: BlockId, label: &str, index: usize, inst: &Instruction) {
        let module = self.module;
        let mut targets = inst.successors();
        if let InstKind::Phi { incoming, .. } = &inst.kind {
            targets.extend(incoming.iter().map(|&(_, b)| b));
        }
        if targets.iter().any(|&t| !self.func.has_block(t)) {
            self.error(VerifyError::UnknownBlock {
                function: self.name(),
                block: label.to_string(),
            });
        }

        for op in inst.operands() {
            self.check_operand(block, label, index, inst.is_phi(), op);
        }

        match &inst.kind {
            InstKind::Call(site) | InstKind::Invoke { site, .. } => {
                if let Some(callee) = site
                    .called_function()
                    .filter(|&id| module.has_function(id))
                    .map(|id| module.function(id))
                {
                    let expected = callee.params().len();
                    let found = site.args.len();
                    let arity_ok = if callee.is_variadic() {
                        found >= expected
                    } else {
                        found == expected
                    };
                    if !arity_ok {
                        self.error(VerifyError::CallArity {
                            function: self.name(),
                            callee: callee.name().to_string(),
                            expected,
                            found,
                        });
                    }
                }
            }
            InstKind::Ret { ty, value } => {
                let expected = self.func.ret_ty();
                let matches = *ty == expected && value.is_some() != expected.is_void();
                if !matches {
                    self.error(VerifyError::ReturnMismatch {
                        function: self.name(),
                        expected,
                    });
                }
            }
            InstKind::Load { ptr, .. } | InstKind::Store { ptr, .. } => {
                if !self.is_pointer(ptr) {
                    self.error(VerifyError::NonPointerAccess {
                        function: self.name(),
                        opcode: inst.opcode(),
                    });
                }
            }
            _ => {}
        }

        if let Some(node) = inst.dbg {
            if !module.has_metadata(node) && self.broken_nodes.insert(node) {
                self.report.warnings.push(VerifyWarning::BrokenDebugInfo {
                    function: self.name(),
                    node,
                });
            }
        }
    }

    fn check_operand(&mut self, block: BlockId, label: &str, index: usize, in_phi: bool, op: &Operand) {
        match *op {
            Operand::Local(id) => {
                if id.index() >= self.func.value_count() {
                    self.error(VerifyError::UndefinedValue {
                        function: self.name(),
                        block: label.to_string(),
                    });
                    return;
                }
                if self.func.value(id).def != ValueDef::Inst {
                    return;
                }
                match self.defs.get(&id).copied() {
                    None => self.error(VerifyError::UndefinedValue {
                        function: self.name(),
                        block: label.to_string(),
                    }),
                    // Phi operands flow in from predecessors.
                    Some((def_block, def_index)) if !in_phi && def_block == block && def_index >= index => {
                        self.error(VerifyError::UseBeforeDef {
                            function: self.name(),
                            value: self.func.value(id).name.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
            Operand::Global(id) if !self.module.has_global(id) => {
                self.error(VerifyError::UnknownSymbol { function: self.name() });
            }
            Operand::Function(id) if !self.module.has_function(id) => {
                self.error(VerifyError::UnknownSymbol { function: self.name() });
            }
            _ => {}
        }
    }

    fn is_pointer(&self, op: &Operand) -> bool {
        match *op {
            Operand::Local(id) => {
                id.index() < self.func.value_count() && self.func.value(id).ty.is_ptr()
            }
            Operand::Global(_) | Operand::Function(_) => true,
            Operand::Const(c) => !matches!(c, Constant::Int { .. }),
        }
    }
}
