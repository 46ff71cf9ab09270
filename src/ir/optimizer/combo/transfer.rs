// src/ir/optimizer/combo/transfer.rs
//! Per-opcode transfer functions (spec.md section 4.1). Each function is a
//! pure `compute(inputs) -> Lattice`; the caller (`propagate.rs`) is
//! responsible for resolving operands to their current lattice elements
//! and for recomputation scheduling.

use super::ComboConfig;
use super::lattice::Lattice;
use crate::ir::instruction::{IrBinaryOp, IrUnaryOp, Relation};
use crate::ir::types::IrType;
use crate::ir::value::literal::IrLiteralValue;

/// The default transfer function (spec.md section 4.1): `Top` if any data
/// input is `Top`, otherwise `Bottom` — used for opcodes this crate has no
/// folding oracle for but whose result can still track an unresolved
/// input (`Load`, `GetElementPtr`, `Cast`).
#[must_use]
pub fn default_transfer(inputs: &[Lattice]) -> Lattice {
    if inputs.iter().any(Lattice::is_top) { Lattice::Top } else { Lattice::Bottom }
}

/// `Confirm`: a copy of `value`, narrowed to `bound` when the relation is
/// equality and `bound` is a known constant.
#[must_use]
pub fn confirm(value: &Lattice, bound: &Lattice, relation: Relation) -> Lattice {
    if relation == Relation::Eq {
        if let Lattice::Constant(_) = bound {
            return bound.clone();
        }
    }
    value.clone()
}

/// `Mux`: selects `a`/`b` once the condition resolves to a known boolean;
/// otherwise the meet of both arms (matching the framework's "no specific
/// rule beyond a data-driven default" treatment).
#[must_use]
pub fn mux(cond: &Lattice, a: &Lattice, b: &Lattice) -> Lattice {
    match cond.as_constant() {
        Some(IrLiteralValue::Bool(true)) => a.clone(),
        Some(IrLiteralValue::Bool(false)) => b.clone(),
        _ if cond.is_bottom() => a.meet(b),
        _ => Lattice::Top,
    }
}

#[must_use]
pub fn unary(op: IrUnaryOp, operand: &Lattice) -> Lattice {
    if operand.is_top() {
        return Lattice::Top;
    }
    let Some(v) = operand.as_constant() else { return Lattice::Bottom };
    match (op, v) {
        (IrUnaryOp::Negate, IrLiteralValue::I32(n)) => Lattice::Constant(IrLiteralValue::I32(n.wrapping_neg())),
        (IrUnaryOp::Negate, IrLiteralValue::I64(n)) => Lattice::Constant(IrLiteralValue::I64(n.wrapping_neg())),
        (IrUnaryOp::Negate, IrLiteralValue::F32(n)) => Lattice::Constant(IrLiteralValue::F32(-n)),
        (IrUnaryOp::Negate, IrLiteralValue::F64(n)) => Lattice::Constant(IrLiteralValue::F64(-n)),
        (IrUnaryOp::Not, IrLiteralValue::Bool(b)) => Lattice::Constant(IrLiteralValue::Bool(!b)),
        (IrUnaryOp::Not, IrLiteralValue::I32(n)) => Lattice::Constant(IrLiteralValue::I32(!n)),
        (IrUnaryOp::Not, IrLiteralValue::I64(n)) => Lattice::Constant(IrLiteralValue::I64(!n)),
        _ => Lattice::Bottom,
    }
}

/// `Add, Sub, Eor, And, Or, Mul, Shifts, Cmp` (spec.md section 4.1).
///
/// `same_partition` reports whether `left` and `right` are in the same
/// congruence class at the current refinement; when `true` and the mode is
/// non-floating, `x - x`, `x xor x`, and `Cmp(x = x)`-family identities are
/// legal even when neither operand is individually known.
#[must_use]
pub fn binary(op: &IrBinaryOp, ty: &IrType, left: &Lattice, right: &Lattice, same_partition: bool) -> Lattice {
    if op.is_comparison() {
        return compare(op, ty, left, right, same_partition);
    }

    if let (Some(a), Some(b)) = (left.as_constant(), right.as_constant()) {
        if let Some(folded) = fold_arithmetic(op, a, b) {
            return Lattice::Constant(folded);
        }
    }

    if same_partition && ty.allows_strict_algebraic_identity() {
        match op {
            IrBinaryOp::Subtract => return Lattice::Constant(zero_of(ty)),
            IrBinaryOp::BitwiseXor => return Lattice::Constant(zero_of(ty)),
            _ => {}
        }
    }

    if left.is_top() || right.is_top() { Lattice::Top } else { Lattice::Bottom }
}

fn compare(op: &IrBinaryOp, ty: &IrType, left: &Lattice, right: &Lattice, same_partition: bool) -> Lattice {
    if let (Some(a), Some(b)) = (left.as_constant(), right.as_constant()) {
        if let Some(result) = fold_comparison(op, a, b) {
            return Lattice::Constant(IrLiteralValue::Bool(result));
        }
    }

    if same_partition && ty.allows_strict_algebraic_identity() {
        let includes_equality = matches!(op, IrBinaryOp::Equal | IrBinaryOp::LessEqual | IrBinaryOp::GreaterEqual);
        let strict_inequality = matches!(op, IrBinaryOp::Less | IrBinaryOp::Greater | IrBinaryOp::NotEqual);
        if includes_equality {
            return Lattice::Constant(IrLiteralValue::Bool(true));
        }
        if strict_inequality {
            return Lattice::Constant(IrLiteralValue::Bool(false));
        }
    }

    if left.is_top() || right.is_top() { Lattice::Top } else { Lattice::Bottom }
}

fn zero_of(ty: &IrType) -> IrLiteralValue {
    match ty {
        IrType::I8 => IrLiteralValue::I8(0),
        IrType::I16 => IrLiteralValue::I16(0),
        IrType::I32 => IrLiteralValue::I32(0),
        IrType::I64 => IrLiteralValue::I64(0),
        IrType::U8 => IrLiteralValue::U8(0),
        IrType::U16 => IrLiteralValue::U16(0),
        IrType::U32 => IrLiteralValue::U32(0),
        IrType::U64 => IrLiteralValue::U64(0),
        _ => IrLiteralValue::I32(0),
    }
}

fn fold_arithmetic(op: &IrBinaryOp, a: &IrLiteralValue, b: &IrLiteralValue) -> Option<IrLiteralValue> {
    match op {
        IrBinaryOp::Add => match (a, b) {
            (IrLiteralValue::F32(x), IrLiteralValue::F32(y)) => Some(IrLiteralValue::F32(x + y)),
            (IrLiteralValue::F64(x), IrLiteralValue::F64(y)) => Some(IrLiteralValue::F64(x + y)),
            _ => fold_checked(a, b, i32::wrapping_add, i64::wrapping_add),
        },
        IrBinaryOp::Subtract => match (a, b) {
            (IrLiteralValue::F32(x), IrLiteralValue::F32(y)) => Some(IrLiteralValue::F32(x - y)),
            (IrLiteralValue::F64(x), IrLiteralValue::F64(y)) => Some(IrLiteralValue::F64(x - y)),
            _ => fold_checked(a, b, i32::wrapping_sub, i64::wrapping_sub),
        },
        IrBinaryOp::Multiply => fold_checked(a, b, i32::wrapping_mul, i64::wrapping_mul),
        IrBinaryOp::BitwiseAnd => fold_checked(a, b, |x, y| x & y, |x, y| x & y),
        IrBinaryOp::BitwiseOr => fold_checked(a, b, |x, y| x | y, |x, y| x | y),
        IrBinaryOp::BitwiseXor => fold_checked(a, b, |x, y| x ^ y, |x, y| x ^ y),
        IrBinaryOp::And => match (a, b) {
            (IrLiteralValue::Bool(x), IrLiteralValue::Bool(y)) => Some(IrLiteralValue::Bool(*x && *y)),
            _ => None,
        },
        IrBinaryOp::Or => match (a, b) {
            (IrLiteralValue::Bool(x), IrLiteralValue::Bool(y)) => Some(IrLiteralValue::Bool(*x || *y)),
            _ => None,
        },
        IrBinaryOp::Divide if !is_zero(b) => fold_checked(a, b, i32::wrapping_div, i64::wrapping_div),
        IrBinaryOp::Modulo if !is_zero(b) => fold_checked(a, b, i32::wrapping_rem, i64::wrapping_rem),
        IrBinaryOp::ShiftLeft => fold_checked(a, b, |x, y| x.wrapping_shl(y as u32), |x, y| x.wrapping_shl(y as u32)),
        IrBinaryOp::ShiftRight => fold_checked(a, b, |x, y| x.wrapping_shr(y as u32), |x, y| x.wrapping_shr(y as u32)),
        _ => None,
    }
}

fn is_zero(v: &IrLiteralValue) -> bool {
    matches!(
        v,
        IrLiteralValue::I8(0)
            | IrLiteralValue::I16(0)
            | IrLiteralValue::I32(0)
            | IrLiteralValue::I64(0)
            | IrLiteralValue::U8(0)
            | IrLiteralValue::U16(0)
            | IrLiteralValue::U32(0)
            | IrLiteralValue::U64(0)
    )
}

fn fold_checked(
    a: &IrLiteralValue,
    b: &IrLiteralValue,
    op32: impl Fn(i32, i32) -> i32,
    op64: impl Fn(i64, i64) -> i64,
) -> Option<IrLiteralValue> {
    match (a, b) {
        (IrLiteralValue::I32(x), IrLiteralValue::I32(y)) => Some(IrLiteralValue::I32(op32(*x, *y))),
        (IrLiteralValue::I64(x), IrLiteralValue::I64(y)) => Some(IrLiteralValue::I64(op64(*x, *y))),
        (IrLiteralValue::U32(x), IrLiteralValue::U32(y)) => Some(IrLiteralValue::U32(op32(*x as i32, *y as i32) as u32)),
        (IrLiteralValue::U64(x), IrLiteralValue::U64(y)) => Some(IrLiteralValue::U64(op64(*x as i64, *y as i64) as u64)),
        _ => None,
    }
}

fn fold_comparison(op: &IrBinaryOp, a: &IrLiteralValue, b: &IrLiteralValue) -> Option<bool> {
    use std::cmp::Ordering;
    let ord = match (a, b) {
        (IrLiteralValue::I32(x), IrLiteralValue::I32(y)) => x.partial_cmp(y),
        (IrLiteralValue::I64(x), IrLiteralValue::I64(y)) => x.partial_cmp(y),
        (IrLiteralValue::U32(x), IrLiteralValue::U32(y)) => x.partial_cmp(y),
        (IrLiteralValue::U64(x), IrLiteralValue::U64(y)) => x.partial_cmp(y),
        (IrLiteralValue::F32(x), IrLiteralValue::F32(y)) => x.partial_cmp(y),
        (IrLiteralValue::F64(x), IrLiteralValue::F64(y)) => x.partial_cmp(y),
        (IrLiteralValue::Bool(x), IrLiteralValue::Bool(y)) => x.partial_cmp(y),
        (IrLiteralValue::Char(x), IrLiteralValue::Char(y)) => x.partial_cmp(y),
        _ => None,
    }?;
    Some(match op {
        IrBinaryOp::Equal => ord == Ordering::Equal,
        IrBinaryOp::NotEqual => ord != Ordering::Equal,
        IrBinaryOp::Less => ord == Ordering::Less,
        IrBinaryOp::LessEqual => ord != Ordering::Greater,
        IrBinaryOp::Greater => ord == Ordering::Greater,
        IrBinaryOp::GreaterEqual => ord != Ordering::Less,
        _ => return None,
    })
}

/// `Unknown`'s default value (spec.md section 4.1): `Bottom`, configurable to `Top`.
#[must_use]
pub fn poison_value(config: &ComboConfig) -> Lattice {
    if config.unknown_is_top { Lattice::Top } else { Lattice::Bottom }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_subtraction_folds_to_zero_without_concrete_operands() {
        let x = Lattice::Bottom;
        let result = binary(&IrBinaryOp::Subtract, &IrType::I32, &x, &x, true);
        assert_eq!(result, Lattice::Constant(IrLiteralValue::I32(0)));
    }

    #[test]
    fn self_subtraction_is_not_folded_across_partitions() {
        let x = Lattice::Bottom;
        let y = Lattice::Bottom;
        let result = binary(&IrBinaryOp::Subtract, &IrType::I32, &x, &y, false);
        assert_eq!(result, Lattice::Bottom);
    }

    #[test]
    fn constant_add_folds() {
        let a = Lattice::Constant(IrLiteralValue::I32(2));
        let b = Lattice::Constant(IrLiteralValue::I32(3));
        assert_eq!(binary(&IrBinaryOp::Add, &IrType::I32, &a, &b, false), Lattice::Constant(IrLiteralValue::I32(5)));
    }

    #[test]
    fn same_partition_equality_is_true() {
        let x = Lattice::Bottom;
        let result = binary(&IrBinaryOp::Equal, &IrType::I32, &x, &x, true);
        assert_eq!(result, Lattice::Constant(IrLiteralValue::Bool(true)));
    }

    #[test]
    fn float_self_subtraction_is_not_folded() {
        let x = Lattice::Bottom;
        let result = binary(&IrBinaryOp::Subtract, &IrType::F64, &x, &x, true);
        assert_eq!(result, Lattice::Bottom);
    }
}
