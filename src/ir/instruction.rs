// src/ir/instruction.rs
use super::{IrType, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    IntToPtr,
    PtrToInt,
    FloatToInt,
    IntToFloat,
    FloatTruncate,
    FloatExtend,
    IntTruncate,
    IntSignExtend,
    IntZeroExtend,
    Bitcast,
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastKind::IntToPtr => "inttoptr",
            CastKind::PtrToInt => "ptrtoint",
            CastKind::FloatToInt => "fptosi",
            CastKind::IntToFloat => "sitofp",
            CastKind::FloatTruncate => "fptrunc",
            CastKind::FloatExtend => "fpext",
            CastKind::IntTruncate => "trunc",
            CastKind::IntSignExtend => "sext",
            CastKind::IntZeroExtend => "zext",
            CastKind::Bitcast => "bitcast",
        };
        f.write_str(s)
    }
}

/// The relation a `Confirm` asserts between its value and its bound.
/// Mirrors libFirm's `pn_Cmp`-derived Confirm relations; only `Eq` feeds
/// the transfer-function shortcut described for `Confirm` (a confirmed
/// equality against a constant bound narrows the value to that constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relation::Eq => "==",
            Relation::Ne => "!=",
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    Alloca { ty: IrType },
    Store { value: Value, dest: Value },
    Load { src: Value, ty: IrType },
    Binary { op: IrBinaryOp, left: Value, right: Value, ty: IrType },
    Unary { op: IrUnaryOp, operand: Value, ty: IrType },
    Call { func: Value, args: Vec<Value>, ty: IrType },
    GetElementPtr { base: Value, index: Value, element_ty: IrType },
    Cast { kind: CastKind, value: Value, from_ty: IrType, to_ty: IrType },
    Phi { ty: IrType, incoming: Vec<(Value, String)> },
    /// Asserts `value <relation> bound` holds on every path reaching this
    /// point; acts as a copy of `value` except when `relation` is `Eq` and
    /// `bound` is a constant, in which case it narrows to `bound`.
    Confirm { value: Value, bound: Value, relation: Relation },
    /// A two-way value-level select: `cond ? a : b` with no control-flow
    /// effect of its own (unlike `ConditionalBranch`).
    Mux { cond: Value, a: Value, b: Value, ty: IrType },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrBinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl IrBinaryOp {
    /// `Cmp`-family opcodes, in spec.md's sense: boolean-producing relations
    /// subject to the same-partition same-operand shortcut in 4.1.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            IrBinaryOp::Equal
                | IrBinaryOp::NotEqual
                | IrBinaryOp::Less
                | IrBinaryOp::LessEqual
                | IrBinaryOp::Greater
                | IrBinaryOp::GreaterEqual
        )
    }

    /// Commutative operands are treated as an unordered pair during
    /// partition refinement (spec.md section 4.5/4.6).
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            IrBinaryOp::Add
                | IrBinaryOp::Multiply
                | IrBinaryOp::Equal
                | IrBinaryOp::NotEqual
                | IrBinaryOp::And
                | IrBinaryOp::Or
                | IrBinaryOp::BitwiseAnd
                | IrBinaryOp::BitwiseOr
                | IrBinaryOp::BitwiseXor
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrUnaryOp {
    Negate,
    Not,
}

impl Instruction {
    pub fn new(kind: InstructionKind) -> Self {
        Instruction { kind, result: None }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result_str = if let Some(result) = &self.result { format!("{result} = ") } else { String::new() };

        match &self.kind {
            InstructionKind::Alloca { ty } => write!(f, "{result_str}alloca {ty}"),
            InstructionKind::Store { value, dest } => write!(f, "store {value} to {dest}"),
            InstructionKind::Load { src, ty } => write!(f, "{result_str}load {ty} from {src}"),
            InstructionKind::Binary { op, left, right, ty } => write!(f, "{result_str}{op} {left} {right}, {ty}"),
            InstructionKind::Unary { op, operand, ty } => write!(f, "{result_str}{op} {operand} {ty}"),
            InstructionKind::Call { func, args, ty } => {
                let args_str = args.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join(", ");
                write!(f, "{result_str}call {func}({args_str}) : {ty}")
            }
            InstructionKind::GetElementPtr { base, index, element_ty } => {
                write!(f, "{result_str}getelementptr {base}, {index} : {element_ty}")
            }
            InstructionKind::Cast { kind, value, from_ty, to_ty } => {
                write!(f, "{result_str}{kind} {value} : {from_ty} to {to_ty}")
            }
            InstructionKind::Phi { ty, incoming } => {
                let incoming_str =
                    incoming.iter().map(|(val, block)| format!("[ {val}, {block} ]")).collect::<Vec<_>>().join(", ");
                write!(f, "{result_str}phi {ty} [ {incoming_str} ]")
            }
            InstructionKind::Confirm { value, bound, relation } => {
                write!(f, "{result_str}confirm {value} {relation} {bound}")
            }
            InstructionKind::Mux { cond, a, b, ty } => {
                write!(f, "{result_str}mux {cond} ? {a} : {b}, {ty}")
            }
        }
    }
}

impl fmt::Display for IrBinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrBinaryOp::Add => f.write_str("add"),
            IrBinaryOp::Subtract => f.write_str("sub"),
            IrBinaryOp::Multiply => f.write_str("mul"),
            IrBinaryOp::Divide => f.write_str("div"),
            IrBinaryOp::Modulo => f.write_str("mod"),
            IrBinaryOp::Equal => f.write_str("eq"),
            IrBinaryOp::NotEqual => f.write_str("ne"),
            IrBinaryOp::Less => f.write_str("lt"),
            IrBinaryOp::LessEqual => f.write_str("le"),
            IrBinaryOp::Greater => f.write_str("gt"),
            IrBinaryOp::GreaterEqual => f.write_str("ge"),
            IrBinaryOp::And => f.write_str("and"),
            IrBinaryOp::Or => f.write_str("or"),
            IrBinaryOp::BitwiseAnd => f.write_str("bitand"),
            IrBinaryOp::BitwiseOr => f.write_str("bitor"),
            IrBinaryOp::BitwiseXor => f.write_str("bitxor"),
            IrBinaryOp::ShiftLeft => f.write_str("shl"),
            IrBinaryOp::ShiftRight => f.write_str("shr"),
        }
    }
}

impl fmt::Display for IrUnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrUnaryOp::Negate => f.write_str("neg"),
            IrUnaryOp::Not => f.write_str("not"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_are_commutative_only_for_eq_ne() {
        assert!(IrBinaryOp::Equal.is_commutative());
        assert!(!IrBinaryOp::Less.is_commutative());
        assert!(IrBinaryOp::Add.is_commutative());
        assert!(!IrBinaryOp::Subtract.is_commutative());
    }
}
