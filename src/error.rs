// src/error.rs
//! Error types for the combo pass.
//!
//! Faults fall into the three categories spec.md section 7 names:
//! precondition violations abort the pass (`MalformedGraph`); monotonicity
//! violations are a transfer-function bug, asserted only in debug builds
//! (`MonotonicityViolation`); upstream anomalies (a `Switch` with a constant
//! selector but more than one reachable successor) are non-fatal and are
//! recorded on [`crate::ir::optimizer::combo::ComboStats`] rather than
//! returned as an error.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ComboError {
    /// The host graph is not in the form the pass requires (missing entry
    /// block, dangling branch target, missing terminator, ...). The pass
    /// refuses to run.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// A transfer function produced an illegal upward lattice transition
    /// (`x -> y` with `x != Top`, `y != Bottom`, `x != y`). Only ever
    /// constructed under `debug_assertions`; indicates a bug in a transfer
    /// function, not a fault in the input graph.
    #[error("monotonicity violation on node {node}: {from} -> {to}")]
    MonotonicityViolation { node: String, from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_graph_message_includes_detail() {
        let err = ComboError::MalformedGraph("no entry block".to_string());
        assert_eq!(err.to_string(), "malformed graph: no entry block");
    }
}
