//! Type descriptors for fact schema validation.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type descriptor for schema validation.
///
/// Used to declare fact field types and validate submitted values at the
/// type-node boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// Either integer or float; compared and combined at double precision.
    Number,
    /// String type.
    String,
}

impl Type {
    /// Checks if a value of `value_type` is accepted by this declared type.
    ///
    /// `Number` accepts both numeric kinds, and `Float` accepts `Int`
    /// (numeric promotion); everything else must match exactly.
    #[must_use]
    pub const fn accepts(self, value_type: Type) -> bool {
        matches!(
            (self, value_type),
            (Self::Bool, Self::Bool)
                | (Self::Int, Self::Int)
                | (Self::Float, Self::Int | Self::Float)
                | (Self::Number, Self::Int | Self::Float | Self::Number)
                | (Self::String, Self::String)
        )
    }

    /// Returns true if this type is numeric.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Number)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
