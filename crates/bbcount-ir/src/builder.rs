//! Instruction builder with an explicit insertion point.

use crate::IrError;
use crate::function::Function;
use crate::instr::{BinaryOp, CallSite, InstKind, Instruction};
use crate::types::Type;
use crate::value::{BlockId, Operand, ValueDef, ValueId};

/// Inserts instructions into one block at a fixed position.
///
/// Each insertion advances the position, so a sequence of calls lands in
/// program order ahead of whatever followed the original position.
pub struct InstBuilder<'f> {
    func: &'f mut Function,
    block: BlockId,
    index: usize,
}

impl<'f> InstBuilder<'f> {
    /// Insert before position `index` of `block`.
    pub const fn at(func: &'f mut Function, block: BlockId, index: usize) -> Self {
        Self { func, block, index }
    }

    /// Insert at the start of `block`.
    pub const fn at_start(func: &'f mut Function, block: BlockId) -> Self {
        Self::at(func, block, 0)
    }

    /// Insert immediately before the terminator of `block`.
    pub fn before_terminator(func: &'f mut Function, block: BlockId) -> Result<Self, IrError> {
        let Some(index) = func.block(block).terminator_index() else {
            return Err(IrError::MissingTerminator {
                function: func.name().to_string(),
                block: func.block(block).name().to_string(),
            });
        };
        Ok(Self::at(func, block, index))
    }

    /// Current insertion index.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.index
    }

    /// Insert a raw instruction.
    pub fn insert(&mut self, inst: Instruction) -> Result<(), IrError> {
        self.func.block_mut(self.block).insert(self.index, inst)?;
        self.index += 1;
        Ok(())
    }

    fn insert_with_result(&mut self, kind: InstKind, ty: Type, name: &str) -> Result<ValueId, IrError> {
        let id = self.func.add_value(name, ty, ValueDef::Inst);
        self.insert(Instruction::new(kind).with_result(id))?;
        Ok(id)
    }

    /// `%name = load ty, ptr <ptr>`
    pub fn load(&mut self, ty: Type, ptr: Operand, name: &str) -> Result<ValueId, IrError> {
        self.insert_with_result(InstKind::Load { ty, ptr, align: None }, ty, name)
    }

    /// `store ty <value>, ptr <ptr>`
    pub fn store(&mut self, ty: Type, value: Operand, ptr: Operand) -> Result<(), IrError> {
        self.insert(Instruction::new(InstKind::Store {
            ty,
            value,
            ptr,
            align: None,
        }))
    }

    /// `%name = <op> ty <lhs>, <rhs>`
    pub fn binary(
        &mut self,
        op: BinaryOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let kind = InstKind::Binary {
            op,
            ty,
            lhs,
            rhs,
            nuw: false,
            nsw: false,
        };
        self.insert_with_result(kind, ty, name)
    }

    /// `%name = add ty <lhs>, <rhs>`
    pub fn add(&mut self, ty: Type, lhs: Operand, rhs: Operand, name: &str) -> Result<ValueId, IrError> {
        self.binary(BinaryOp::Add, ty, lhs, rhs, name)
    }

    /// `[%name =] call <site>`. Void calls define no value.
    pub fn call(&mut self, site: CallSite, name: &str) -> Result<Option<ValueId>, IrError> {
        if site.ret_ty.is_void() {
            self.insert(Instruction::new(InstKind::Call(site)))?;
            return Ok(None);
        }
        let ty = site.ret_ty;
        self.insert_with_result(InstKind::Call(site), ty, name).map(Some)
    }
}
