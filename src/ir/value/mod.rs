// src/ir/value/mod.rs
pub mod kind;
pub mod literal;

pub use self::{kind::ValueKind, literal::IrLiteralValue};

use super::types::{Entity, IrType};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of an SSA definition. A `ValueKind::Temporary(id)` use and the
/// `Value` produced as an instruction's `result` are the same `ValueId` —
/// this is how def-use correlation works without a side-table lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ValueId(Uuid);

impl ValueId {
    #[inline]
    pub fn new() -> Self {
        ValueId(Uuid::new_v4())
    }
}

impl Default for ValueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    pub id: ValueId,
    pub kind: ValueKind,
    pub ty: IrType,
    pub name: Option<Arc<str>>,
}

impl Value {
    fn new_value(kind: ValueKind, ty: IrType) -> Self {
        Value { id: ValueId::new(), kind, ty, name: None }
    }

    /// Creates a new literal value.
    pub fn new_literal(imm: IrLiteralValue) -> Self {
        let ty: IrType = (&imm).into();
        Self::new_value(ValueKind::Literal(imm), ty)
    }

    /// Creates a new global symbol reference (`SymConst`).
    pub fn new_global(entity: impl Into<Arc<str>>, ty: IrType) -> Self {
        Self::new_value(ValueKind::Global(Entity(entity.into())), ty)
    }

    /// Creates a use of the SSA definition identified by `id`.
    pub fn new_temporary(id: ValueId, ty: IrType) -> Self {
        Self::new_value(ValueKind::Temporary(id), ty)
    }

    /// Creates a poison ("unknown") operand.
    pub fn new_poison(ty: IrType) -> Self {
        Self::new_value(ValueKind::Poison, ty)
    }

    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Literal(imm) => imm.fmt(f)?,
            ValueKind::Global(entity) => entity.fmt(f)?,
            ValueKind::Temporary(id) => write!(f, "%{id}")?,
            ValueKind::Poison => f.write_str("poison")?,
        }

        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_infers_type() {
        let v = Value::new_literal(IrLiteralValue::I32(7));
        assert_eq!(v.ty, IrType::I32);
    }

    #[test]
    fn temporary_reuses_producer_id() {
        let producer_id = ValueId::new();
        let use_site = Value::new_temporary(producer_id, IrType::I64);
        assert_eq!(use_site.kind, ValueKind::Temporary(producer_id));
    }
}
