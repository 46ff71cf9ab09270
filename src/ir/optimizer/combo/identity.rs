// src/ir/optimizer/combo/identity.rs
//! Identity functions (spec.md section 4.2): `identity(n)` returns the
//! operand `n` is a no-op copy of, letting the propagation engine fold `n`
//! into that operand's partition instead of computing a fresh lattice
//! element for it. Each rule is gated by `allows_strict_algebraic_identity`
//! so a floating-point mode never takes the purely-structural shortcuts.

use super::node::{NodeRecord, Op, Operand};
use crate::ir::instruction::{IrBinaryOp, Relation};
use crate::ir::value::literal::IrLiteralValue;

/// Resolves `record`'s identity operand, if any, given `same_partition` — a
/// callback answering whether two operands are currently congruent.
#[must_use]
pub fn identity(record: &NodeRecord, same_partition: impl Fn(&Operand, &Operand) -> bool) -> Option<Operand> {
    match &record.op {
        Op::Phi => phi_identity(record, &same_partition),
        Op::Binary(op) => binary_identity(record, op, &same_partition),
        Op::Confirm(relation) => confirm_identity(record, *relation),
        Op::Mux => mux_identity(record, &same_partition),
        _ => None,
    }
}

/// A `Phi` with every input congruent to a single partition is that
/// partition's value, whether or not the inputs are textually identical
/// (spec.md section 4.2's "Phi-of-one-reaching-value" rule).
fn phi_identity(record: &NodeRecord, same_partition: &impl Fn(&Operand, &Operand) -> bool) -> Option<Operand> {
    let mut inputs = record.inputs.iter();
    let first = inputs.next()?;
    if inputs.all(|input| input == first || same_partition(input, first)) { Some(first.clone()) } else { None }
}

fn is_literal(operand: &Operand, value: impl Fn(&IrLiteralValue) -> bool) -> bool {
    matches!(operand, Operand::Literal(lit) if value(lit))
}

fn is_zero(operand: &Operand) -> bool {
    is_literal(operand, |lit| {
        matches!(
            lit,
            IrLiteralValue::I8(0)
                | IrLiteralValue::I16(0)
                | IrLiteralValue::I32(0)
                | IrLiteralValue::I64(0)
                | IrLiteralValue::U8(0)
                | IrLiteralValue::U16(0)
                | IrLiteralValue::U32(0)
                | IrLiteralValue::U64(0)
        )
    })
}

fn is_all_ones(operand: &Operand) -> bool {
    is_literal(
        operand,
        |lit| matches!(lit, IrLiteralValue::I8(-1) | IrLiteralValue::I16(-1) | IrLiteralValue::I32(-1) | IrLiteralValue::I64(-1)),
    )
}

fn binary_identity(record: &NodeRecord, op: &IrBinaryOp, same_partition: &impl Fn(&Operand, &Operand) -> bool) -> Option<Operand> {
    if !record.ty.allows_strict_algebraic_identity() {
        return None;
    }
    let [left, right] = &record.inputs[..] else { return None };

    match op {
        IrBinaryOp::Add | IrBinaryOp::BitwiseOr | IrBinaryOp::BitwiseXor if is_zero(right) => Some(left.clone()),
        IrBinaryOp::Add | IrBinaryOp::BitwiseOr if is_zero(left) => Some(right.clone()),
        IrBinaryOp::Subtract if is_zero(right) => Some(left.clone()),
        IrBinaryOp::Multiply if is_literal(right, |lit| matches!(lit, IrLiteralValue::I32(1) | IrLiteralValue::I64(1))) => {
            Some(left.clone())
        }
        IrBinaryOp::BitwiseAnd if is_all_ones(right) => Some(left.clone()),
        IrBinaryOp::BitwiseAnd if is_all_ones(left) => Some(right.clone()),
        IrBinaryOp::ShiftLeft | IrBinaryOp::ShiftRight if is_zero(right) => Some(left.clone()),
        _ if same_partition(left, right) && matches!(op, IrBinaryOp::BitwiseAnd | IrBinaryOp::Or | IrBinaryOp::And) => {
            Some(left.clone())
        }
        _ => None,
    }
}

/// `Confirm(v, v <relation> bound)` is an identity on `v` unless the
/// constant-narrowing rule in `transfer::confirm` already took over.
fn confirm_identity(record: &NodeRecord, relation: Relation) -> Option<Operand> {
    if relation == Relation::Eq {
        return None;
    }
    record.inputs.first().cloned()
}

/// `Mux(c, a, a)` and `Mux(c, a, b)` where `a` and `b` are congruent both
/// reduce to `a` regardless of `c`.
fn mux_identity(record: &NodeRecord, same_partition: &impl Fn(&Operand, &Operand) -> bool) -> Option<Operand> {
    let [_, a, b] = &record.inputs[..] else { return None };
    if a == b || same_partition(a, b) { Some(a.clone()) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::IrType;
    use crate::ir::value::ValueId;
    use std::sync::Arc;

    fn record(op: Op, ty: IrType, inputs: Vec<Operand>) -> NodeRecord {
        NodeRecord {
            kind: super::super::node::NodeKind::Def(ValueId::new()),
            op,
            ty,
            block: Arc::from("entry"),
            inputs,
            phi_preds: vec![],
            uses: vec![],
        }
    }

    #[test]
    fn add_zero_is_identity_on_the_other_operand() {
        let left = Operand::Node(1);
        let rec = record(Op::Binary(IrBinaryOp::Add), IrType::I32, vec![left.clone(), Operand::Literal(IrLiteralValue::I32(0))]);
        assert_eq!(identity(&rec, |_, _| false), Some(left));
    }

    #[test]
    fn add_zero_is_suppressed_for_floats() {
        let left = Operand::Node(1);
        let rec = record(Op::Binary(IrBinaryOp::Add), IrType::F64, vec![left, Operand::Literal(IrLiteralValue::F64(0.0))]);
        assert_eq!(identity(&rec, |_, _| false), None);
    }

    #[test]
    fn phi_of_one_reaching_partition_is_identity() {
        let a = Operand::Node(3);
        let rec = record(Op::Phi, IrType::I32, vec![a.clone(), a.clone(), a.clone()]);
        assert_eq!(identity(&rec, |_, _| false), Some(a));
    }

    #[test]
    fn mux_with_congruent_arms_is_identity() {
        let cond = Operand::Node(0);
        let a = Operand::Node(1);
        let b = Operand::Node(2);
        let rec = record(Op::Mux, IrType::I32, vec![cond, a.clone(), b]);
        assert_eq!(identity(&rec, |_, _| true), Some(a));
    }
}
