//! Function IR.

use rustc_hash::FxHashMap;

use crate::IrError;
use crate::block::BasicBlock;
use crate::module::Linkage;
use crate::types::{Signature, Type};
use crate::value::{BlockId, ValueData, ValueDef, ValueId};

/// Function and parameter attributes, carried through as source text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionAttrs {
    /// Between the linkage and the return type (`dso_local`, `noundef`).
    pub prefix: String,
    /// After each parameter type, indexed like the parameters.
    pub params: Vec<String>,
    /// After the parameter list (`#0`, `!dbg !5`, `personality ...`).
    pub suffix: String,
}

impl FunctionAttrs {
    /// Attributes of parameter `index`, empty if none were given.
    #[must_use]
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map_or("", String::as_str)
    }
}

/// A function: signature, blocks and the table of local values.
///
/// A function without blocks is a declaration.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    linkage: Linkage,
    ret_ty: Type,
    params: Vec<ValueId>,
    variadic: bool,
    blocks: Vec<BasicBlock>,
    values: Vec<ValueData>,
    value_names: FxHashMap<String, ValueId>,
    attrs: FunctionAttrs,
}

impl Function {
    /// Create a function with no parameters and no body.
    pub fn new(name: impl Into<String>, ret_ty: Type) -> Self {
        Self {
            name: name.into(),
            linkage: Linkage::External,
            ret_ty,
            params: Vec::new(),
            variadic: false,
            blocks: Vec::new(),
            values: Vec::new(),
            value_names: FxHashMap::default(),
            attrs: FunctionAttrs::default(),
        }
    }

    /// Create a declaration with unnamed parameters.
    pub fn declaration(name: impl Into<String>, sig: &Signature) -> Self {
        let mut func = Self::new(name, sig.ret);
        for &ty in &sig.params {
            func.add_param(ty, "");
        }
        func.variadic = sig.variadic;
        func
    }

    /// Function name (without `@`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Linkage.
    #[must_use]
    pub const fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Set the linkage.
    pub const fn set_linkage(&mut self, linkage: Linkage) {
        self.linkage = linkage;
    }

    /// Attribute text.
    #[must_use]
    pub const fn attrs(&self) -> &FunctionAttrs {
        &self.attrs
    }

    /// Replace the attribute text.
    pub fn set_attrs(&mut self, attrs: FunctionAttrs) {
        self.attrs = attrs;
    }

    /// Return type.
    #[must_use]
    pub const fn ret_ty(&self) -> Type {
        self.ret_ty
    }

    /// Parameter values in order.
    #[must_use]
    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Check if the function takes variadic arguments.
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Mark the function as variadic.
    pub const fn set_variadic(&mut self, variadic: bool) {
        self.variadic = variadic;
    }

    /// Signature of this function.
    #[must_use]
    pub fn signature(&self) -> Signature {
        Signature {
            ret: self.ret_ty,
            params: self.params.iter().map(|&p| self.value(p).ty).collect(),
            variadic: self.variadic,
        }
    }

    /// Check if this function has no body.
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append a parameter. An empty name gets a numeric one.
    pub fn add_param(&mut self, ty: Type, name: &str) -> ValueId {
        let index = self.params.len();
        let id = self.add_value(name, ty, ValueDef::Param(index));
        self.params.push(id);
        id
    }

    /// Add a local value, making `hint` unique within the function.
    pub fn add_value(&mut self, hint: &str, ty: Type, def: ValueDef) -> ValueId {
        let name = self.unique_name(hint);
        self.insert_value(name, ty, def)
    }

    /// Add a local value with exactly this name.
    pub fn add_named_value(
        &mut self,
        name: &str,
        ty: Type,
        def: ValueDef,
    ) -> Result<ValueId, IrError> {
        if self.value_names.contains_key(name) {
            return Err(IrError::DuplicateValue {
                function: self.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(self.insert_value(name.to_string(), ty, def))
    }

    fn insert_value(&mut self, name: String, ty: Type, def: ValueDef) -> ValueId {
        let id = ValueId::new(self.values.len());
        self.value_names.insert(name.clone(), id);
        self.values.push(ValueData { name, ty, def });
        id
    }

    fn unique_name(&self, hint: &str) -> String {
        if hint.is_empty() {
            let mut slot = self.values.len();
            while self.value_names.contains_key(&slot.to_string()) {
                slot += 1;
            }
            return slot.to_string();
        }
        if !self.value_names.contains_key(hint) {
            return hint.to_string();
        }
        (1..)
            .map(|n| format!("{hint}{n}"))
            .find(|candidate| !self.value_names.contains_key(candidate))
            .unwrap_or_default()
    }

    /// Get a local value.
    #[must_use]
    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id.index()]
    }

    /// Mutable access to a local value's type.
    pub fn set_value_type(&mut self, id: ValueId, ty: Type) {
        self.values[id.index()].ty = ty;
    }

    /// Look up a local value by name.
    #[must_use]
    pub fn value_by_name(&self, name: &str) -> Option<ValueId> {
        self.value_names.get(name).copied()
    }

    /// Number of local values.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Append an empty block.
    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(name));
        id
    }

    /// Get a block.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Get a block mutably.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Blocks in layout order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check if a block id belongs to this function.
    #[must_use]
    pub fn has_block(&self, id: BlockId) -> bool {
        id.index() < self.blocks.len()
    }

    /// The entry block, if the function has a body.
    #[must_use]
    pub fn entry_block(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then(|| BlockId::new(0))
    }

    /// Look up a block by label.
    #[must_use]
    pub fn block_by_name(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.name() == name)
            .map(BlockId::new)
    }

    /// Total instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let mut func = Function::new("f", Type::Void);
        let a = func.add_value("old.bb.count", Type::I64, ValueDef::Inst);
        let b = func.add_value("old.bb.count", Type::I64, ValueDef::Inst);
        let c = func.add_value("old.bb.count", Type::I64, ValueDef::Inst);
        assert_eq!(func.value(a).name, "old.bb.count");
        assert_eq!(func.value(b).name, "old.bb.count1");
        assert_eq!(func.value(c).name, "old.bb.count2");
        assert_eq!(func.value_by_name("old.bb.count1"), Some(b));
    }

    #[test]
    fn test_numeric_names_skip_taken() {
        let mut func = Function::new("f", Type::Void);
        func.add_named_value("1", Type::I64, ValueDef::Inst).unwrap();
        let p = func.add_param(Type::I32, "");
        assert_eq!(func.value(p).name, "2");
    }

    #[test]
    fn test_duplicate_named_value() {
        let mut func = Function::new("f", Type::Void);
        func.add_named_value("x", Type::I64, ValueDef::Inst).unwrap();
        let err = func.add_named_value("x", Type::I64, ValueDef::Inst).unwrap_err();
        assert!(matches!(err, IrError::DuplicateValue { .. }));
    }

    #[test]
    fn test_declaration_signature() {
        let sig = Signature::new(Type::I32, vec![Type::Ptr, Type::I64]);
        let func = Function::declaration("g", &sig);
        assert!(func.is_declaration());
        assert_eq!(func.signature(), sig);
        assert_eq!(func.entry_block(), None);
    }
}
