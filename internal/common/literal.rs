// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Constant values as they appear in binding expressions.

use smol_str::{format_smolstr, SmolStr};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// The type of a [`Literal`].
///
/// `Object` stands for any reference type, its default value is `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralType {
    Object,
    Bool,
    Char,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    String,
}

impl LiteralType {
    /// True for the integer and floating point types
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int32
                | Self::Int64
                | Self::UInt32
                | Self::UInt64
                | Self::Float32
                | Self::Float64
                | Self::Decimal
        )
    }

    /// True if `null` can be assigned to a value of this type
    pub fn is_nullable(self) -> bool {
        matches!(self, Self::Object | Self::String)
    }

    fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::UInt32 | Self::UInt64)
    }

    /// The type named `name` in a binding, either the keyword (`int`) or the
    /// framework name (`Int32`, `System.Int32`)
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("System.").unwrap_or(name);
        Some(match name {
            "object" | "Object" => Self::Object,
            "bool" | "Boolean" => Self::Bool,
            "char" | "Char" => Self::Char,
            "int" | "Int32" => Self::Int32,
            "long" | "Int64" => Self::Int64,
            "uint" | "UInt32" => Self::UInt32,
            "ulong" | "UInt64" => Self::UInt64,
            "float" | "Single" => Self::Float32,
            "double" | "Double" => Self::Float64,
            "decimal" | "Decimal" => Self::Decimal,
            "string" | "String" => Self::String,
            _ => return None,
        })
    }

    /// The type both operands of a numeric operation are converted to
    fn promote(a: Self, b: Self) -> Option<Self> {
        use LiteralType::*;
        if !a.is_numeric() || !b.is_numeric() {
            return None;
        }
        Some(if a == b {
            a
        } else if a == Decimal || b == Decimal {
            Decimal
        } else if a == Float64 || b == Float64 {
            Float64
        } else if a == Float32 || b == Float32 {
            Float32
        } else if matches!((a, b), (UInt32 | UInt64, UInt32 | UInt64)) {
            UInt64
        } else {
            Int64
        })
    }
}

/// Operators of [`Literal::arithmetic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl std::fmt::Display for LiteralType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Int32 => "int",
            Self::Int64 => "long",
            Self::UInt32 => "uint",
            Self::UInt64 => "ulong",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Decimal => "decimal",
            Self::String => "string",
        })
    }
}

/// A constant value.
///
/// Equality and hashing are structural: floating point values compare by their
/// bit pattern, so that `NaN == NaN` and trees holding literals can be used as
/// hash map keys.
#[derive(Debug, Clone, Default)]
pub enum Literal {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// Decimal values are carried as `f64`
    Decimal(f64),
    String(SmolStr),
}

impl Literal {
    pub fn ty(&self) -> LiteralType {
        match self {
            Literal::Null => LiteralType::Object,
            Literal::Bool(_) => LiteralType::Bool,
            Literal::Char(_) => LiteralType::Char,
            Literal::Int32(_) => LiteralType::Int32,
            Literal::Int64(_) => LiteralType::Int64,
            Literal::UInt32(_) => LiteralType::UInt32,
            Literal::UInt64(_) => LiteralType::UInt64,
            Literal::Float32(_) => LiteralType::Float32,
            Literal::Float64(_) => LiteralType::Float64,
            Literal::Decimal(_) => LiteralType::Decimal,
            Literal::String(_) => LiteralType::String,
        }
    }

    /// The value of `default(T)`
    pub fn default_for(ty: LiteralType) -> Literal {
        match ty {
            LiteralType::Object | LiteralType::String => Literal::Null,
            LiteralType::Bool => Literal::Bool(false),
            LiteralType::Char => Literal::Char('\0'),
            LiteralType::Int32 => Literal::Int32(0),
            LiteralType::Int64 => Literal::Int64(0),
            LiteralType::UInt32 => Literal::UInt32(0),
            LiteralType::UInt64 => Literal::UInt64(0),
            LiteralType::Float32 => Literal::Float32(0.),
            LiteralType::Float64 => Literal::Float64(0.),
            LiteralType::Decimal => Literal::Decimal(0.),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// The numeric value widened to `f64`, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        Some(match *self {
            Literal::Int32(v) => v as f64,
            Literal::Int64(v) => v as f64,
            Literal::UInt32(v) => v as f64,
            Literal::UInt64(v) => v as f64,
            Literal::Float32(v) => v as f64,
            Literal::Float64(v) | Literal::Decimal(v) => v,
            _ => return None,
        })
    }

    /// The numeric value as `i64`, if this is an integer that fits
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Literal::Int32(v) => Some(v as i64),
            Literal::Int64(v) => Some(v),
            Literal::UInt32(v) => Some(v as i64),
            Literal::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }
}

/// Operations used both to fold constants and to evaluate bindings
impl Literal {
    fn as_i128(&self) -> Option<i128> {
        match *self {
            Literal::Int32(v) => Some(v.into()),
            Literal::Int64(v) => Some(v.into()),
            Literal::UInt32(v) => Some(v.into()),
            Literal::UInt64(v) => Some(v.into()),
            _ => None,
        }
    }

    fn from_i128(v: i128, ty: LiteralType) -> Option<Literal> {
        Some(match ty {
            LiteralType::Int32 => Literal::Int32(v.try_into().ok()?),
            LiteralType::Int64 => Literal::Int64(v.try_into().ok()?),
            LiteralType::UInt32 => Literal::UInt32(v.try_into().ok()?),
            LiteralType::UInt64 => Literal::UInt64(v.try_into().ok()?),
            _ => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as it is written when concatenated to a string
    pub fn to_text(&self) -> SmolStr {
        match self {
            Literal::Null => SmolStr::default(),
            Literal::String(s) => s.clone(),
            Literal::Char(c) => format_smolstr!("{c}"),
            Literal::Bool(v) => format_smolstr!("{v}"),
            Literal::Int32(v) => format_smolstr!("{v}"),
            Literal::Int64(v) => format_smolstr!("{v}"),
            Literal::UInt32(v) => format_smolstr!("{v}"),
            Literal::UInt64(v) => format_smolstr!("{v}"),
            Literal::Float32(v) => format_smolstr!("{v}"),
            Literal::Float64(v) | Literal::Decimal(v) => format_smolstr!("{v}"),
        }
    }

    /// Apply an arithmetic operator.
    ///
    /// `+` concatenates when one side is a string. Numbers are promoted to a common
    /// type first. Returns `None` when the operands don't support the operator,
    /// on integer overflow and on integer division by zero.
    pub fn arithmetic(&self, op: ArithmeticOp, rhs: &Literal) -> Option<Literal> {
        if op == ArithmeticOp::Add
            && (matches!(self, Literal::String(_)) || matches!(rhs, Literal::String(_)))
        {
            return Some(Literal::String(format_smolstr!("{}{}", self.to_text(), rhs.to_text())));
        }
        let ty = LiteralType::promote(self.ty(), rhs.ty())?;
        if ty.is_integer() {
            let (a, b) = (self.as_i128()?, rhs.as_i128()?);
            let v = match op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Subtract => a.checked_sub(b),
                ArithmeticOp::Multiply => a.checked_mul(b),
                ArithmeticOp::Divide => a.checked_div(b),
                ArithmeticOp::Remainder => a.checked_rem(b),
            }?;
            return Self::from_i128(v, ty);
        }
        let (a, b) = (self.as_f64()?, rhs.as_f64()?);
        let v = match op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => a - b,
            ArithmeticOp::Multiply => a * b,
            ArithmeticOp::Divide => a / b,
            ArithmeticOp::Remainder => a % b,
        };
        Some(match ty {
            LiteralType::Float32 => Literal::Float32(v as f32),
            LiteralType::Decimal => Literal::Decimal(v),
            _ => Literal::Float64(v),
        })
    }

    /// Unary minus
    pub fn negate(&self) -> Option<Literal> {
        match *self {
            Literal::Int32(v) => v.checked_neg().map(Literal::Int32),
            Literal::Int64(v) => v.checked_neg().map(Literal::Int64),
            Literal::UInt32(v) => Some(Literal::Int64(-i64::from(v))),
            Literal::Float32(v) => Some(Literal::Float32(-v)),
            Literal::Float64(v) => Some(Literal::Float64(-v)),
            Literal::Decimal(v) => Some(Literal::Decimal(-v)),
            _ => None,
        }
    }

    /// Order two values: numbers after promotion, strings and chars by their content
    pub fn compare(&self, rhs: &Literal) -> Option<Ordering> {
        match (self, rhs) {
            (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
            (Literal::Char(a), Literal::Char(b)) => Some(a.cmp(b)),
            _ => {
                let ty = LiteralType::promote(self.ty(), rhs.ty())?;
                if ty.is_integer() {
                    Some(self.as_i128()?.cmp(&rhs.as_i128()?))
                } else {
                    self.as_f64()?.partial_cmp(&rhs.as_f64()?)
                }
            }
        }
    }

    /// Equality of `==`: numbers of different types compare by value
    pub fn value_equals(&self, rhs: &Literal) -> bool {
        if self.ty().is_numeric() && rhs.ty().is_numeric() {
            self.compare(rhs) == Some(Ordering::Equal)
        } else {
            self == rhs
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Char(a), Literal::Char(b)) => a == b,
            (Literal::Int32(a), Literal::Int32(b)) => a == b,
            (Literal::Int64(a), Literal::Int64(b)) => a == b,
            (Literal::UInt32(a), Literal::UInt32(b)) => a == b,
            (Literal::UInt64(a), Literal::UInt64(b)) => a == b,
            (Literal::Float32(a), Literal::Float32(b)) => a.to_bits() == b.to_bits(),
            (Literal::Float64(a), Literal::Float64(b)) => a.to_bits() == b.to_bits(),
            (Literal::Decimal(a), Literal::Decimal(b)) => a.to_bits() == b.to_bits(),
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Literal::Null => {}
            Literal::Bool(v) => v.hash(state),
            Literal::Char(v) => v.hash(state),
            Literal::Int32(v) => v.hash(state),
            Literal::Int64(v) => v.hash(state),
            Literal::UInt32(v) => v.hash(state),
            Literal::UInt64(v) => v.hash(state),
            Literal::Float32(v) => v.to_bits().hash(state),
            Literal::Float64(v) | Literal::Decimal(v) => v.to_bits().hash(state),
            Literal::String(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Char(v) => write!(f, "'{}'", v.escape_default()),
            Literal::Int32(v) => write!(f, "{v}"),
            Literal::Int64(v) => write!(f, "{v}L"),
            Literal::UInt32(v) => write!(f, "{v}u"),
            Literal::UInt64(v) => write!(f, "{v}UL"),
            Literal::Float32(v) => write!(f, "{v}f"),
            Literal::Float64(v) => write!(f, "{v}d"),
            Literal::Decimal(v) => write!(f, "{v}m"),
            Literal::String(v) => write!(f, "\"{}\"", v.escape_default()),
        }
    }
}

macro_rules! literal_from {
    ($($ty:ty => $variant:ident,)*) => {
        $(impl From<$ty> for Literal {
            fn from(v: $ty) -> Self {
                Literal::$variant(v.into())
            }
        })*
    };
}

literal_from! {
    bool => Bool,
    char => Char,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    SmolStr => String,
    &str => String,
}
