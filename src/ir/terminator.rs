// src/ir/terminator.rs
use super::{IrType, Value};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

/// A control-flow terminator. Corresponds to spec.md's `Jmp`
/// (`Branch`/unconditional), `Cond` (`ConditionalBranch`), `Switch`
/// (`Switch`), and `Return`/`End` (`Return`).
#[derive(Debug, Clone, PartialEq)]
pub struct Terminator {
    pub kind: TerminatorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminatorKind {
    Return { value: Value, ty: IrType },
    Branch { label: Arc<str> },
    ConditionalBranch { condition: Value, true_label: Arc<str>, false_label: Arc<str> },
    Switch { value: Value, ty: IrType, default_label: String, cases: Vec<(Value, String)> },
    Unreachable,
}

impl Terminator {
    pub fn is_terminator(&self) -> bool {
        !matches!(self.kind, TerminatorKind::Unreachable)
    }

    /// All target labels this terminator may transfer control to, in a
    /// fixed order: for `ConditionalBranch`, `[true, false]`; for
    /// `Switch`, each case in declaration order followed by the default.
    /// Edge-reachability flags (see `ir::cfg`) are indexed positionally
    /// into this list.
    pub fn get_targets(&self) -> Vec<String> {
        match &self.kind {
            TerminatorKind::Branch { label } => vec![label.to_string()],
            TerminatorKind::ConditionalBranch { true_label, false_label, .. } => {
                vec![true_label.to_string(), false_label.to_string()]
            }
            TerminatorKind::Switch { cases, default_label, .. } => {
                let mut targets: Vec<String> = cases.iter().map(|(_, label)| label.clone()).collect();
                targets.push(default_label.clone());
                targets
            }
            TerminatorKind::Return { .. } | TerminatorKind::Unreachable => Vec::new(),
        }
    }

    /// The selector operand this terminator's reachability transfer
    /// function depends on, if any (`Cond`'s or `Switch`'s).
    pub fn selector(&self) -> Option<&Value> {
        match &self.kind {
            TerminatorKind::ConditionalBranch { condition, .. } => Some(condition),
            TerminatorKind::Switch { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn get_used_values(&self) -> Vec<&Value> {
        match &self.kind {
            TerminatorKind::Return { value, .. } => vec![value],
            TerminatorKind::ConditionalBranch { condition, .. } => vec![condition],
            TerminatorKind::Switch { value, .. } => vec![value],
            TerminatorKind::Branch { .. } | TerminatorKind::Unreachable => Vec::new(),
        }
    }

    pub fn new(kind: TerminatorKind) -> Self {
        Terminator { kind }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TerminatorKind::Return { value, ty } => write!(f, "ret {value} {ty}"),
            TerminatorKind::Branch { label } => write!(f, "br {label}"),
            TerminatorKind::ConditionalBranch { condition, true_label, false_label } => {
                write!(f, "br {condition} ? {true_label} : {false_label}")
            }
            TerminatorKind::Switch { value, ty, default_label, cases } => {
                let mut cases_str = String::new();
                for (idx, (val, label)) in cases.iter().enumerate() {
                    if idx > 0 {
                        cases_str.push_str(", ");
                    }
                    write!(&mut cases_str, "{val} => {label}")?;
                }
                write!(f, "switch {value} {ty}: {cases_str}, default {default_label}")
            }
            TerminatorKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::value::literal::IrLiteralValue;

    #[test]
    fn conditional_branch_targets_are_true_then_false() {
        let t = Terminator::new(TerminatorKind::ConditionalBranch {
            condition: Value::new_literal(IrLiteralValue::Bool(true)),
            true_label: Arc::from("then"),
            false_label: Arc::from("else"),
        });
        assert_eq!(t.get_targets(), vec!["then".to_string(), "else".to_string()]);
    }
}
