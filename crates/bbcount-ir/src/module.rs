//! Module IR: globals, functions and the symbol table.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::IrError;
use crate::function::Function;
use crate::types::{Signature, Type};
use crate::value::{Constant, FuncId, GlobalId};

/// Symbol linkage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Linkage {
    #[default]
    External,
    Internal,
    Private,
    /// Tentative definition; duplicates across translation units merge at link time.
    Common,
    Weak,
    LinkOnce,
}

impl Linkage {
    /// Textual keyword; empty for the default external linkage.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::External => "",
            Self::Internal => "internal",
            Self::Private => "private",
            Self::Common => "common",
            Self::Weak => "weak",
            Self::LinkOnce => "linkonce",
        }
    }

    /// Parse a linkage keyword.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "external" => Self::External,
            "internal" => Self::Internal,
            "private" => Self::Private,
            "common" => Self::Common,
            "weak" => Self::Weak,
            "linkonce" | "linkonce_odr" => Self::LinkOnce,
            _ => return None,
        })
    }
}

/// Module-level variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalVariable {
    pub name: String,
    pub ty: Type,
    pub linkage: Linkage,
    pub is_constant: bool,
    /// Words between the linkage and `global` (`dso_local`, `unnamed_addr`).
    pub qualifiers: String,
    /// `None` for an external declaration.
    pub initializer: Option<Constant>,
    pub align: Option<u32>,
    /// Trailing `section`, `comdat` and metadata attachments as source text.
    pub attachments: String,
}

impl GlobalVariable {
    /// Create a mutable, externally-linked global with no initializer.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            linkage: Linkage::External,
            is_constant: false,
            qualifiers: String::new(),
            initializer: None,
            align: None,
            attachments: String::new(),
        }
    }

    /// Set the linkage.
    #[must_use]
    pub const fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set the initializer.
    #[must_use]
    pub const fn with_initializer(mut self, init: Constant) -> Self {
        self.initializer = Some(init);
        self
    }

    /// Set the alignment.
    #[must_use]
    pub const fn with_align(mut self, align: u32) -> Self {
        self.align = Some(align);
        self
    }
}

/// Entry in the module's `@`-namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Global(GlobalId),
    Function(FuncId),
}

/// Top-level IR container.
#[derive(Clone, Debug, Default)]
pub struct Module {
    name: String,
    pub source_filename: Option<String>,
    pub target_datalayout: Option<String>,
    pub target_triple: Option<String>,
    globals: Vec<GlobalVariable>,
    functions: Vec<Function>,
    symbols: FxHashMap<String, Symbol>,
    /// Numbered metadata nodes (`!N = ...`), kept as source text.
    metadata: BTreeMap<u32, String>,
    /// Named metadata (`!name = ...`), kept as source text.
    named_metadata: Vec<(String, String)>,
    /// Comdat definitions (`$name = comdat any`), kept as source text.
    comdats: Vec<String>,
    /// Attribute groups (`attributes #N = { ... }`), kept as source text.
    attribute_groups: Vec<String>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Module identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up any `@`-symbol.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    fn claim_symbol(&mut self, name: &str, symbol: Symbol) -> Result<(), IrError> {
        if self.symbols.contains_key(name) {
            return Err(IrError::DuplicateSymbol(name.to_string()));
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Add a global variable. Fails if the name is taken.
    pub fn add_global(&mut self, global: GlobalVariable) -> Result<GlobalId, IrError> {
        let id = GlobalId::new(self.globals.len());
        self.claim_symbol(&global.name, Symbol::Global(id))?;
        self.globals.push(global);
        Ok(id)
    }

    /// Get a global variable.
    #[must_use]
    pub fn global(&self, id: GlobalId) -> &GlobalVariable {
        &self.globals[id.index()]
    }

    /// Look up a global variable by name.
    #[must_use]
    pub fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        match self.symbol(name)? {
            Symbol::Global(id) => Some(id),
            Symbol::Function(_) => None,
        }
    }

    /// Check if a global id belongs to this module.
    #[must_use]
    pub fn has_global(&self, id: GlobalId) -> bool {
        id.index() < self.globals.len()
    }

    /// Global variables in declaration order.
    #[must_use]
    pub fn globals(&self) -> &[GlobalVariable] {
        &self.globals
    }

    /// Add a function. Fails if the name is taken.
    pub fn add_function(&mut self, func: Function) -> Result<FuncId, IrError> {
        let id = FuncId::new(self.functions.len());
        self.claim_symbol(func.name(), Symbol::Function(id))?;
        self.functions.push(func);
        Ok(id)
    }

    /// Return the function `name`, declaring it with `sig` if absent.
    ///
    /// An existing function is reused only if its signature matches.
    pub fn get_or_insert_function(&mut self, name: &str, sig: &Signature) -> Result<FuncId, IrError> {
        match self.symbol(name) {
            Some(Symbol::Function(id)) => {
                let found = self.function(id).signature();
                if found == *sig {
                    Ok(id)
                } else {
                    Err(IrError::SignatureMismatch {
                        name: name.to_string(),
                        expected: sig.to_string(),
                        found: found.to_string(),
                    })
                }
            }
            Some(Symbol::Global(_)) => Err(IrError::DuplicateSymbol(name.to_string())),
            None => self.add_function(Function::declaration(name, sig)),
        }
    }

    /// Get a function.
    #[must_use]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    /// Get a function mutably.
    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    /// Look up a function by name.
    #[must_use]
    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        match self.symbol(name)? {
            Symbol::Function(id) => Some(id),
            Symbol::Global(_) => None,
        }
    }

    /// Check if a function id belongs to this module.
    #[must_use]
    pub fn has_function(&self, id: FuncId) -> bool {
        id.index() < self.functions.len()
    }

    /// Functions in declaration order.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Functions in declaration order, mutably. The list itself is fixed.
    pub fn functions_mut(&mut self) -> std::slice::IterMut<'_, Function> {
        self.functions.iter_mut()
    }

    /// Record a numbered metadata node.
    pub fn add_metadata(&mut self, id: u32, text: impl Into<String>) {
        self.metadata.insert(id, text.into());
    }

    /// Record a named metadata entry.
    pub fn add_named_metadata(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.named_metadata.push((name.into(), text.into()));
    }

    /// Record a comdat definition line.
    pub fn add_comdat(&mut self, text: impl Into<String>) {
        self.comdats.push(text.into());
    }

    /// Comdat definition lines in declaration order.
    pub fn comdats(&self) -> impl Iterator<Item = &str> {
        self.comdats.iter().map(String::as_str)
    }

    /// Record an attribute group line.
    pub fn add_attribute_group(&mut self, text: impl Into<String>) {
        self.attribute_groups.push(text.into());
    }

    /// Attribute group lines in declaration order.
    pub fn attribute_groups(&self) -> impl Iterator<Item = &str> {
        self.attribute_groups.iter().map(String::as_str)
    }

    /// Check if numbered metadata node `id` is defined.
    #[must_use]
    pub fn has_metadata(&self, id: u32) -> bool {
        self.metadata.contains_key(&id)
    }

    /// Numbered metadata nodes in id order.
    pub fn metadata(&self) -> impl Iterator<Item = (u32, &str)> {
        self.metadata.iter().map(|(&id, text)| (id, text.as_str()))
    }

    /// Named metadata in declaration order.
    pub fn named_metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named_metadata
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    /// Total basic blocks across all functions.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.functions.iter().map(Function::block_count).sum()
    }

    /// Total instructions across all functions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(Function::instruction_count).sum()
    }
}
