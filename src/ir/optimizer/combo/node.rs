// src/ir/optimizer/combo/node.rs
//! The node table: one record per ordinary dataflow node (spec.md section 3).
//!
//! Per the "Intrusive linkage" design note, node identity is an arena index
//! (`NodeId`) rather than a pointer, with partition/list membership stored
//! in side tables (`partition.rs`) instead of intrusive pointers baked into
//! the record. This keeps the record `Copy`-free but simple, and avoids the
//! aliasing hazards the source's raw intrusive lists are prone to.

use crate::ir::instruction::IrBinaryOp;
use crate::ir::types::{Entity, IrType};
use crate::ir::value::{ValueId, ValueKind, literal::IrLiteralValue};
use crate::ir::Value;
use std::sync::Arc;

pub type NodeId = usize;

/// What an ordinary dataflow node actually is in the host IR (see
/// `SPEC_FULL.md` section 2 for the mapping from spec.md's sea-of-nodes
/// vocabulary onto this basic-block IR).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// One per basic block.
    Block(Arc<str>),
    /// The block's `Cond`/`Switch` terminator, keyed by its selector operand.
    Selector(Arc<str>),
    /// An instruction that defines an SSA value.
    Def(ValueId),
}

/// An operand reference: either another node in the table, or an immediate
/// value that never gets its own node (a literal, a `SymConst` entity, or
/// `Poison`/`Unknown`).
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Node(NodeId),
    Literal(IrLiteralValue),
    Global(Entity),
    Poison,
}

impl Operand {
    pub fn from_value(value: &Value, defs: &std::collections::HashMap<ValueId, NodeId>) -> Operand {
        match &value.kind {
            ValueKind::Literal(lit) => Operand::Literal(lit.clone()),
            ValueKind::Global(entity) => Operand::Global(entity.clone()),
            ValueKind::Poison => Operand::Poison,
            ValueKind::Temporary(id) => {
                defs.get(id).map_or(Operand::Poison, |&node| Operand::Node(node))
            }
        }
    }
}

/// The payload distinguishing one opcode's identity/transfer behavior from
/// another's, independent of its operand *values* (those are inputs).
/// Kept alongside the node so `opcode_key.rs` can key partitions by it.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Block,
    Jmp,
    Cond,
    Switch { case_count: usize },
    Return,
    Phi,
    Binary(IrBinaryOp),
    Unary(crate::ir::instruction::IrUnaryOp),
    Cast(crate::ir::instruction::CastKind),
    Load,
    Store,
    Alloca,
    Call,
    GetElementPtr,
    Confirm(crate::ir::instruction::Relation),
    Mux,
}

#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub kind: NodeKind,
    pub op: Op,
    pub ty: IrType,
    pub block: Arc<str>,
    pub inputs: Vec<Operand>,
    /// For `Op::Phi` only: the predecessor block each `inputs` entry arrives
    /// from, in the same order. Empty for every other opcode. Needed
    /// because a Phi's transfer function must meet only the inputs whose
    /// incoming edge is currently `Reachable`.
    pub phi_preds: Vec<Arc<str>>,
    /// Populated after the table is built: every node that takes this node
    /// as an `Operand::Node` input (spec.md's def-use edges).
    pub uses: Vec<NodeId>,
}
