//! Basic block IR.

use crate::IrError;
use crate::instr::Instruction;

/// IR for a basic block (straight-line instructions ending in one terminator).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BasicBlock {
    /// Label; empty for an unnamed entry block.
    name: String,
    /// Instructions in the block.
    instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Create an empty block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    /// Block label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Append an instruction.
    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    /// Insert a non-terminator before position `index`.
    ///
    /// Once the block has a terminator, `index` must not be past it, so the
    /// terminator stays last.
    pub fn insert(&mut self, index: usize, inst: Instruction) -> Result<(), IrError> {
        let limit = self.terminator_index().unwrap_or(self.instructions.len());
        if index > limit || inst.is_terminator() {
            return Err(IrError::InvalidInsertion {
                block: self.name.clone(),
                index,
            });
        }
        self.instructions.insert(index, inst);
        Ok(())
    }

    /// Get the terminator, if the block is complete.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    /// Index of the terminator, if the block is complete.
    #[must_use]
    pub fn terminator_index(&self) -> Option<usize> {
        self.terminator().map(|_| self.instructions.len() - 1)
    }

    /// Get number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterate over instructions.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }
}

impl<'a> IntoIterator for &'a BasicBlock {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InstKind, Type};

    fn alloca() -> Instruction {
        Instruction::new(InstKind::Alloca {
            ty: Type::I64,
            align: None,
        })
    }

    fn ret() -> Instruction {
        Instruction::new(InstKind::Ret {
            ty: Type::Void,
            value: None,
        })
    }

    #[test]
    fn test_insert_before_terminator() {
        let mut block = BasicBlock::new("entry");
        block.push(ret());
        block.insert(0, alloca()).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block.terminator_index(), Some(1));
        assert!(block.terminator().unwrap().is_terminator());
    }

    #[test]
    fn test_insert_past_terminator_rejected() {
        let mut block = BasicBlock::new("entry");
        block.push(ret());
        let err = block.insert(1, alloca()).unwrap_err();
        assert!(matches!(err, IrError::InvalidInsertion { index: 1, .. }));
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn test_insert_terminator_rejected() {
        let mut block = BasicBlock::new("entry");
        block.push(alloca());
        assert!(block.insert(0, ret()).is_err());
    }

    #[test]
    fn test_open_block_has_no_terminator() {
        let mut block = BasicBlock::new("bb");
        assert!(block.terminator().is_none());
        block.push(alloca());
        assert!(block.terminator().is_none());
        assert_eq!(block.terminator_index(), None);
    }
}
