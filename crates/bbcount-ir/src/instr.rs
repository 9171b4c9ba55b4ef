//! Instruction IR.

use crate::types::Type;
use crate::value::{BlockId, FuncId, Operand, ValueId};

/// Two-operand integer arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Textual opcode.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        }
    }

    /// Parse a textual opcode.
    #[must_use]
    pub fn from_mnemonic(word: &str) -> Option<Self> {
        Some(match word {
            "add" => Self::Add,
            "sub" => Self::Sub,
            "mul" => Self::Mul,
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            _ => return None,
        })
    }
}

/// Integer comparison predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntPredicate {
    /// Textual predicate.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Ugt => "ugt",
            Self::Uge => "uge",
            Self::Ult => "ult",
            Self::Ule => "ule",
            Self::Sgt => "sgt",
            Self::Sge => "sge",
            Self::Slt => "slt",
            Self::Sle => "sle",
        }
    }

    /// Parse a textual predicate.
    #[must_use]
    pub fn from_mnemonic(word: &str) -> Option<Self> {
        Some(match word {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "ugt" => Self::Ugt,
            "uge" => Self::Uge,
            "ult" => Self::Ult,
            "ule" => Self::Ule,
            "sgt" => Self::Sgt,
            "sge" => Self::Sge,
            "slt" => Self::Slt,
            "sle" => Self::Sle,
            _ => return None,
        })
    }
}

/// Conversion between integer widths and pointers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
    BitCast,
}

impl CastOp {
    /// Textual opcode.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Trunc => "trunc",
            Self::ZExt => "zext",
            Self::SExt => "sext",
            Self::PtrToInt => "ptrtoint",
            Self::IntToPtr => "inttoptr",
            Self::BitCast => "bitcast",
        }
    }

    /// Parse a textual opcode.
    #[must_use]
    pub fn from_mnemonic(word: &str) -> Option<Self> {
        Some(match word {
            "trunc" => Self::Trunc,
            "zext" => Self::ZExt,
            "sext" => Self::SExt,
            "ptrtoint" => Self::PtrToInt,
            "inttoptr" => Self::IntToPtr,
            "bitcast" => Self::BitCast,
            _ => return None,
        })
    }
}

/// Callee and arguments shared by `call` and `invoke`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    pub ret_ty: Type,
    pub callee: Operand,
    pub args: Vec<(Type, Operand)>,
}

impl CallSite {
    /// Direct call to a function.
    #[must_use]
    pub const fn direct(callee: FuncId, ret_ty: Type, args: Vec<(Type, Operand)>) -> Self {
        Self {
            ret_ty,
            callee: Operand::Function(callee),
            args,
        }
    }

    /// Statically known callee, `None` for indirect calls.
    #[must_use]
    pub const fn called_function(&self) -> Option<FuncId> {
        self.callee.as_function()
    }
}

/// Instruction kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstKind {
    /// Stack allocation of one `ty`.
    Alloca { ty: Type, align: Option<u32> },
    /// Memory read.
    Load {
        ty: Type,
        ptr: Operand,
        align: Option<u32>,
    },
    /// Memory write.
    Store {
        ty: Type,
        value: Operand,
        ptr: Operand,
        align: Option<u32>,
    },
    /// Integer arithmetic.
    Binary {
        op: BinaryOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
        nuw: bool,
        nsw: bool,
    },
    /// Integer comparison producing `i1`.
    ICmp {
        pred: IntPredicate,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    /// Width or representation conversion.
    Cast {
        op: CastOp,
        from: Type,
        value: Operand,
        to: Type,
    },
    /// SSA merge at block entry.
    Phi {
        ty: Type,
        incoming: Vec<(Operand, BlockId)>,
    },
    /// Function call.
    Call(CallSite),
    /// Function call with exceptional successor (terminator).
    Invoke {
        site: CallSite,
        normal: BlockId,
        unwind: BlockId,
    },
    /// Unconditional branch (terminator).
    Br { dest: BlockId },
    /// Conditional branch (terminator).
    CondBr {
        cond: Operand,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    /// Function return (terminator). `ty` is `void` when `value` is `None`.
    Ret { ty: Type, value: Option<Operand> },
    /// Unreachable (terminator).
    Unreachable,
}

/// Typed view of a call site (`call` or `invoke`).
#[derive(Clone, Copy, Debug)]
pub struct CallView<'a> {
    pub site: &'a CallSite,
    pub is_invoke: bool,
}

impl CallView<'_> {
    /// Statically known callee, `None` for indirect calls.
    #[must_use]
    pub const fn called_function(&self) -> Option<FuncId> {
        self.site.called_function()
    }
}

/// Typed view of a stack allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocaView {
    pub ty: Type,
    pub align: Option<u32>,
}

/// A single instruction: optional result value, operation and debug location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Value defined by this instruction.
    pub result: Option<ValueId>,
    pub kind: InstKind,
    /// `!dbg` attachment (metadata node id).
    pub dbg: Option<u32>,
}

impl Instruction {
    /// Create an instruction without a result.
    #[must_use]
    pub const fn new(kind: InstKind) -> Self {
        Self {
            result: None,
            kind,
            dbg: None,
        }
    }

    /// Set the result value.
    #[must_use]
    pub const fn with_result(mut self, result: ValueId) -> Self {
        self.result = Some(result);
        self
    }

    /// Textual opcode.
    #[must_use]
    pub const fn opcode(&self) -> &'static str {
        match &self.kind {
            InstKind::Alloca { .. } => "alloca",
            InstKind::Load { .. } => "load",
            InstKind::Store { .. } => "store",
            InstKind::Binary { op, .. } => op.mnemonic(),
            InstKind::ICmp { .. } => "icmp",
            InstKind::Cast { op, .. } => op.mnemonic(),
            InstKind::Phi { .. } => "phi",
            InstKind::Call(_) => "call",
            InstKind::Invoke { .. } => "invoke",
            InstKind::Br { .. } | InstKind::CondBr { .. } => "br",
            InstKind::Ret { .. } => "ret",
            InstKind::Unreachable => "unreachable",
        }
    }

    /// View as a call site, if this is a `call` or `invoke`.
    #[must_use]
    pub const fn as_call(&self) -> Option<CallView<'_>> {
        match &self.kind {
            InstKind::Call(site) => Some(CallView {
                site,
                is_invoke: false,
            }),
            InstKind::Invoke { site, .. } => Some(CallView {
                site,
                is_invoke: true,
            }),
            _ => None,
        }
    }

    /// View as a stack allocation, if this is an `alloca`.
    #[must_use]
    pub const fn as_alloca(&self) -> Option<AllocaView> {
        match &self.kind {
            InstKind::Alloca { ty, align } => Some(AllocaView {
                ty: *ty,
                align: *align,
            }),
            _ => None,
        }
    }

    /// Check if this is a `load`.
    #[must_use]
    pub const fn is_load(&self) -> bool {
        matches!(self.kind, InstKind::Load { .. })
    }

    /// Check if this is a `store`.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self.kind, InstKind::Store { .. })
    }

    /// Check if this is an `icmp`.
    #[must_use]
    pub const fn is_compare(&self) -> bool {
        matches!(self.kind, InstKind::ICmp { .. })
    }

    /// Check if this is a `phi`.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self.kind, InstKind::Phi { .. })
    }

    /// All value operands, in textual order. Block targets are not included.
    #[must_use]
    pub fn operands(&self) -> Vec<&Operand> {
        match &self.kind {
            InstKind::Alloca { .. } | InstKind::Br { .. } | InstKind::Unreachable => Vec::new(),
            InstKind::Load { ptr, .. } => vec![ptr],
            InstKind::Store { value, ptr, .. } => vec![value, ptr],
            InstKind::Binary { lhs, rhs, .. } | InstKind::ICmp { lhs, rhs, .. } => vec![lhs, rhs],
            InstKind::Cast { value, .. } => vec![value],
            InstKind::Phi { incoming, .. } => incoming.iter().map(|(value, _)| value).collect(),
            InstKind::Call(site) | InstKind::Invoke { site, .. } => std::iter::once(&site.callee)
                .chain(site.args.iter().map(|(_, arg)| arg))
                .collect(),
            InstKind::CondBr { cond, .. } => vec![cond],
            InstKind::Ret { value, .. } => value.iter().collect(),
        }
    }
}
