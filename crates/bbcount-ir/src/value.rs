//! Entity ids, constants and operands.

use std::fmt;

use crate::types::Type;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a table index.
            #[must_use]
            #[allow(clippy::cast_possible_truncation)]
            pub const fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Table index of this id.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(
    /// Function in a module's function table.
    FuncId
);
entity_id!(
    /// Global variable in a module's global table.
    GlobalId
);
entity_id!(
    /// Basic block within a function.
    BlockId
);
entity_id!(
    /// SSA value (parameter or instruction result) within a function.
    ValueId
);

/// How a local value is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueDef {
    /// Function parameter at the given position.
    Param(usize),
    /// Result of an instruction.
    Inst,
}

/// Entry in a function's value table.
#[derive(Clone, Debug)]
pub struct ValueData {
    pub name: String,
    pub ty: Type,
    pub def: ValueDef,
}

/// Constant operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constant {
    /// Integer constant of the given bit width.
    Int { width: u32, value: i64 },
    /// Null pointer.
    Null,
    /// Undefined value.
    Undef,
    /// Poison value.
    Poison,
}

impl Constant {
    /// Create an integer constant.
    #[must_use]
    pub const fn int(width: u32, value: i64) -> Self {
        Self::Int { width, value }
    }

    /// Zero of the given type (`0`, `false` or `null`).
    #[must_use]
    pub const fn zero(ty: Type) -> Option<Self> {
        match ty {
            Type::Int(width) => Some(Self::Int { width, value: 0 }),
            Type::Ptr => Some(Self::Null),
            Type::Void => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { width: 1, value } => f.write_str(if *value == 0 { "false" } else { "true" }),
            Self::Int { value, .. } => write!(f, "{value}"),
            Self::Null => f.write_str("null"),
            Self::Undef => f.write_str("undef"),
            Self::Poison => f.write_str("poison"),
        }
    }
}

/// Instruction operand. Values are referenced by identity, never copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Parameter or instruction result of the enclosing function.
    Local(ValueId),
    /// Address of a global variable.
    Global(GlobalId),
    /// Address of a function.
    Function(FuncId),
    /// Constant.
    Const(Constant),
}

impl Operand {
    /// Integer constant operand.
    #[must_use]
    pub const fn int(width: u32, value: i64) -> Self {
        Self::Const(Constant::int(width, value))
    }

    /// Local value referenced by this operand, if any.
    #[must_use]
    pub const fn as_local(&self) -> Option<ValueId> {
        match self {
            Self::Local(id) => Some(*id),
            _ => None,
        }
    }

    /// Function referenced by this operand, if any.
    #[must_use]
    pub const fn as_function(&self) -> Option<FuncId> {
        match self {
            Self::Function(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<ValueId> for Operand {
    fn from(id: ValueId) -> Self {
        Self::Local(id)
    }
}

impl From<GlobalId> for Operand {
    fn from(id: GlobalId) -> Self {
        Self::Global(id)
    }
}

impl From<FuncId> for Operand {
    fn from(id: FuncId) -> Self {
        Self::Function(id)
    }
}
