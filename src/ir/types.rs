// src/ir/types.rs
//! IR type tags ("modes" in the combo literature).

use std::fmt;
use std::sync::Arc;

/// Represents all possible intermediate representation (IR) types used by
/// the host IR. Integer and float variants carry their own bit width;
/// `Memory` and `Control` are the non-data modes the lattice treats
/// specially (memory-mode nodes are never constant-foldable; control-mode
/// nodes live in the Reachable/Unreachable sub-lattice instead of the
/// value sub-lattice); `Tuple` is the mode of multi-output nodes such as
/// `Call` before their individual results are projected out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IrType {
    /// 8-bit signed integer type (`i8`).
    #[default]
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Char,
    /// Pointer to another value (addresses, including `SymConst` entities).
    Ptr,
    /// Void type — represents the absence of a value.
    Void,
    /// Opaque memory/effect mode. Never carries a constant lattice element.
    Memory,
    /// Control-flow mode. Subject to the Reachable/Unreachable sub-lattice.
    Control,
    /// Mode of a multi-output node before its results are projected out.
    Tuple(Vec<IrType>),
}

impl IrType {
    /// Determines whether the IR type represents a signed integer (`i8`, `i16`, `i32`, `i64`).
    pub fn is_signed_integer(&self) -> bool {
        matches!(self, IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64)
    }

    /// Determines whether the IR type represents an unsigned integer (`u8`, `u16`, `u32`, `u64`).
    pub fn is_unsigned_integer(&self) -> bool {
        matches!(self, IrType::U8 | IrType::U16 | IrType::U32 | IrType::U64)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F32 | IrType::F64)
    }

    /// Non-floating modes are exactly the ones for which the `x - x`,
    /// `x xor x`, `Cmp(x = x)` same-partition identities hold: float
    /// self-comparisons/subtractions can disagree in the presence of NaN.
    pub fn allows_strict_algebraic_identity(&self) -> bool {
        !self.is_float()
    }

    /// Returns the bit-width associated with this IR type.
    ///
    /// For integer and floating-point types, this returns their precise
    /// bit-width. Non-scalar modes (`Void`, `Memory`, `Control`, `Tuple`)
    /// have no meaningful width and return `0`.
    pub fn get_bit_width(&self) -> u32 {
        match self {
            IrType::I8 | IrType::U8 => 8,
            IrType::I16 | IrType::U16 => 16,
            IrType::I32 | IrType::U32 => 32,
            IrType::I64 | IrType::U64 => 64,
            IrType::F32 => 32,
            IrType::F64 => 64,
            IrType::Bool => 1,
            IrType::Char => 32,
            IrType::Ptr => 64,
            IrType::Void | IrType::Memory | IrType::Control | IrType::Tuple(_) => 0,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::U8 => write!(f, "u8"),
            IrType::U16 => write!(f, "u16"),
            IrType::U32 => write!(f, "u32"),
            IrType::U64 => write!(f, "u64"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::Bool => write!(f, "bool"),
            IrType::Char => write!(f, "char"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Void => write!(f, "void"),
            IrType::Memory => write!(f, "mem"),
            IrType::Control => write!(f, "ctrl"),
            IrType::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A module-level symbol (`SymConst`'s entity operand).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity(pub Arc<str>);

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_widths() {
        assert_eq!(IrType::I32.get_bit_width(), 32);
        assert_eq!(IrType::Bool.get_bit_width(), 1);
        assert_eq!(IrType::Memory.get_bit_width(), 0);
    }

    #[test]
    fn float_excluded_from_strict_identities() {
        assert!(!IrType::F64.allows_strict_algebraic_identity());
        assert!(IrType::I64.allows_strict_algebraic_identity());
    }

    #[test]
    fn entity_display() {
        let e = Entity(Arc::from("foo"));
        assert_eq!(e.to_string(), "@foo");
    }
}
