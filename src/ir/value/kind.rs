// src/ir/value/kind.rs
use super::literal::IrLiteralValue;
use crate::ir::types::Entity;
use std::hash::{Hash, Hasher};

use super::ValueId;

/// Kind of IR value.
///
/// `Poison` is the host IR's `Unknown` operand — an explicit "no defined
/// value" a front end emits for an uninitialized read. Its lattice
/// element defaults to Bottom and is configurable to Top via
/// `ComboConfig::unknown_is_top`.
///
/// # Hash Implementation
///
/// Manual implementation: discriminant written explicitly as a small
/// integer, `Arc<str>`/`Entity` hashed by content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Literal(IrLiteralValue),
    /// The address of a module-level symbol (`SymConst(entity)`).
    Global(Entity),
    /// A use of an SSA definition, correlated by the defining instruction's `ValueId`.
    Temporary(ValueId),
    Poison,
}

impl Hash for ValueKind {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Literal(lit) => {
                state.write_u8(0);
                lit.hash(state);
            }
            Self::Global(entity) => {
                state.write_u8(1);
                entity.hash(state);
            }
            Self::Temporary(id) => {
                state.write_u8(2);
                id.hash(state);
            }
            Self::Poison => state.write_u8(3),
        }
    }
}
