//! Block terminator queries.

use crate::instr::{InstKind, Instruction};
use crate::value::BlockId;

impl InstKind {
    /// Check if this kind ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Br { .. }
                | Self::CondBr { .. }
                | Self::Ret { .. }
                | Self::Unreachable
                | Self::Invoke { .. }
        )
    }

    /// Check if this is any kind of branch.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Br { .. } | Self::CondBr { .. })
    }

    /// Check if this terminator leaves the function.
    #[must_use]
    pub const fn is_exit(&self) -> bool {
        matches!(self, Self::Ret { .. } | Self::Unreachable)
    }

    /// Successor blocks of a terminator, in operand order.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Br { dest } => vec![*dest],
            Self::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Self::Invoke { normal, unwind, .. } => vec![*normal, *unwind],
            _ => Vec::new(),
        }
    }
}

impl Instruction {
    /// Check if this instruction ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    /// Successor blocks of a terminator.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        self.kind.successors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Operand, Type};

    #[test]
    fn test_terminator_kinds() {
        assert!(InstKind::Unreachable.is_terminator());
        assert!(InstKind::Ret {
            ty: Type::Void,
            value: None
        }
        .is_exit());
        assert!(!InstKind::Alloca {
            ty: Type::I64,
            align: None
        }
        .is_terminator());
    }

    #[test]
    fn test_successors() {
        let br = InstKind::CondBr {
            cond: Operand::int(1, 1),
            then_dest: BlockId::new(1),
            else_dest: BlockId::new(2),
        };
        assert!(br.is_branch());
        assert_eq!(br.successors(), vec![BlockId::new(1), BlockId::new(2)]);
        assert!(InstKind::Unreachable.successors().is_empty());
    }
}
