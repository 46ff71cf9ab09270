// src/ir/optimizer/combo/opcode_key.rs
//! Keys nodes by "opcode, mode, arity, attribute" for `split_by`'s second
//! pass (spec.md section 4.6): the `lambda_opcode` listmap key.

use super::node::{NodeRecord, Op};
use crate::ir::types::IrType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpcodeKey {
    tag: u32,
    attr: i64,
    ty: String,
    arity: usize,
}

impl OpcodeKey {
    #[must_use]
    pub fn for_node(record: &NodeRecord) -> OpcodeKey {
        let (tag, attr) = match &record.op {
            Op::Block => (0, 0),
            Op::Jmp => (1, 0),
            Op::Cond => (2, 0),
            Op::Switch { case_count } => (3, *case_count as i64),
            Op::Return => (4, 0),
            Op::Phi => (5, 0),
            Op::Binary(op) => (6, op.clone() as i64),
            Op::Unary(op) => (7, op.clone() as i64),
            Op::Cast(kind) => (8, *kind as i64),
            Op::Load => (9, 0),
            Op::Store => (10, 0),
            Op::Alloca => (11, 0),
            Op::Call => (12, 0),
            Op::GetElementPtr => (13, 0),
            Op::Confirm(rel) => (14, *rel as i64),
            Op::Mux => (15, 0),
        };
        OpcodeKey { tag, attr, ty: mode_key(&record.ty), arity: record.inputs.len() }
    }
}

/// Modes compare equal for keying purposes independent of a `Tuple`'s
/// element list identity (two tuples of the same shape key alike).
fn mode_key(ty: &IrType) -> String {
    ty.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::IrBinaryOp;
    use std::sync::Arc;

    #[test]
    fn same_shape_binary_ops_share_a_key() {
        let a = NodeRecord {
            kind: super::super::node::NodeKind::Def(crate::ir::value::ValueId::new()),
            op: Op::Binary(IrBinaryOp::Add),
            ty: IrType::I32,
            block: Arc::from("entry"),
            inputs: vec![],
            phi_preds: vec![],
            uses: vec![],
        };
        let b = NodeRecord { op: Op::Binary(IrBinaryOp::Add), ..a.clone() };
        assert_eq!(OpcodeKey::for_node(&a), OpcodeKey::for_node(&b));
    }
}
