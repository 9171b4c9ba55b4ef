//! IR value types.

use std::fmt;

/// First-class type of an IR value.
///
/// Pointers are opaque, so `ptr` carries no pointee type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value (`void`).
    Void,
    /// Integer of the given bit width (`iN`).
    Int(u32),
    /// Opaque pointer (`ptr`).
    Ptr,
}

impl Type {
    /// `i1`, the type of comparison results.
    pub const I1: Self = Self::Int(1);
    /// `i32`.
    pub const I32: Self = Self::Int(32);
    /// `i64`.
    pub const I64: Self = Self::Int(64);

    /// Check if this is `void`.
    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self, Self::Void)
    }

    /// Check if this is an integer type.
    #[must_use]
    pub const fn is_int(self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Check if this is a pointer type.
    #[must_use]
    pub const fn is_ptr(self) -> bool {
        matches!(self, Self::Ptr)
    }

    /// Bit width of an integer type.
    #[must_use]
    pub const fn int_width(self) -> Option<u32> {
        match self {
            Self::Int(bits) => Some(bits),
            _ => None,
        }
    }

    /// Parse a type keyword (`void`, `ptr`, `i64`, ...).
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "void" => Some(Self::Void),
            "ptr" => Some(Self::Ptr),
            _ => {
                let bits = word.strip_prefix('i')?.parse::<u32>().ok()?;
                (1..=128).contains(&bits).then_some(Self::Int(bits))
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Ptr => f.write_str("ptr"),
        }
    }
}

/// Function signature: return type and parameter types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub ret: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

impl Signature {
    /// Create a non-variadic signature.
    #[must_use]
    pub const fn new(ret: Type, params: Vec<Type>) -> Self {
        Self {
            ret,
            params,
            variadic: false,
        }
    }

    /// `void ()`, the signature of runtime hooks.
    #[must_use]
    pub const fn void() -> Self {
        Self::new(Type::Void, Vec::new())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.ret)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            f.write_str("...")?;
        }
        f.write_str(")")
    }
}
