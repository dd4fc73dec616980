use std::fmt;

use crate::token::TokenKind;

/// The closed set of value types. Both are signed integers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    I32,
    I64,
}

impl Type {
    /// The type literals take when nothing in their context forces another.
    pub const DEFAULT_INT: Type = Type::I32;

    pub const fn from_token(kind: TokenKind) -> Option<Type> {
        match kind {
            TokenKind::I32 => Some(Type::I32),
            TokenKind::I64 => Some(Type::I64),
            _ => None,
        }
    }

    /// Width in bytes. Also the slot alignment inside a stack frame.
    pub const fn size(self) -> u32 {
        match self {
            Type::I32 => 4,
            Type::I64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Type::I32 => "i32",
            Type::I64 => "i64",
        }
    }

    /// Whether `value` is representable in this type.
    pub fn fits(self, value: i64) -> bool {
        match self {
            Type::I32 => i32::try_from(value).is_ok(),
            Type::I64 => true,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
