// src/ir/optimizer/combo/lattice.rs
//! The combined value/reachability lattice (spec.md section 3).

use crate::ir::types::Entity;
use crate::ir::value::literal::IrLiteralValue;
use std::fmt;

/// A single tagged-union lattice element shared by data nodes (`Top` /
/// `Constant` / `SymConst` / `Bottom`) and control-flow nodes (`Reachable`
/// / `Unreachable`). A given node only ever occupies one sub-lattice —
/// which one is determined by its `NodeKind` — but keeping them as one
/// enum matches spec.md's data model directly and lets `meet` be total.
#[derive(Debug, Clone, PartialEq)]
pub enum Lattice {
    /// No information yet; the optimistic initial value of the data sub-lattice.
    Top,
    Constant(IrLiteralValue),
    /// The address of a static entity.
    SymConst(Entity),
    /// Conflicting evidence; the data sub-lattice's bottom element.
    Bottom,
    /// Not yet proven reachable; the optimistic initial value of the
    /// control sub-lattice (spec.md's glossary: "Reachable / Unreachable:
    /// control-flow-lattice analog of Bottom/Top" — i.e. Unreachable ~ Top).
    Unreachable,
    /// Proven reachable; the control sub-lattice's bottom element.
    Reachable,
}

impl Lattice {
    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Lattice::Top)
    }

    #[must_use]
    pub fn is_bottom(&self) -> bool {
        matches!(self, Lattice::Bottom)
    }

    #[must_use]
    pub fn as_constant(&self) -> Option<&IrLiteralValue> {
        match self {
            Lattice::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// `true` if every leader of a partition having this element implies
    /// `type_is_T_or_C` (spec.md invariant 5): Top or a concrete constant,
    /// never `Bottom`/`SymConst`/a control value.
    #[must_use]
    pub fn is_top_or_constant(&self) -> bool {
        matches!(self, Lattice::Top | Lattice::Constant(_))
    }

    /// Meet (greatest lower bound) of the data sub-lattice, per spec.md section 3:
    /// `Top ∧ x = x`; `Bottom ∧ x = Bottom`; equal constants/symconsts meet to
    /// themselves; anything else meets to `Bottom`.
    #[must_use]
    pub fn meet(&self, other: &Lattice) -> Lattice {
        match (self, other) {
            (Lattice::Top, x) | (x, Lattice::Top) => x.clone(),
            (Lattice::Bottom, _) | (_, Lattice::Bottom) => Lattice::Bottom,
            (Lattice::Constant(a), Lattice::Constant(b)) => {
                if a == b { Lattice::Constant(a.clone()) } else { Lattice::Bottom }
            }
            (Lattice::SymConst(a), Lattice::SymConst(b)) => {
                if a == b { Lattice::SymConst(a.clone()) } else { Lattice::Bottom }
            }
            (Lattice::Unreachable, x) | (x, Lattice::Unreachable) => x.clone(),
            (Lattice::Reachable, Lattice::Reachable) => Lattice::Reachable,
            // Mixing a data element with a control element never occurs for a
            // well-typed node; treat conservatively as Bottom rather than panic.
            _ => Lattice::Bottom,
        }
    }

    /// Whether the transition `self -> next` is a legal monotonic descent
    /// (spec.md section 4.1): `x = Top`, or `y = Bottom`, or `x = y`. The
    /// control sub-lattice's `Unreachable -> Reachable` is the analogous
    /// "Top -> Bottom" transition.
    #[must_use]
    pub fn allows_transition_to(&self, next: &Lattice) -> bool {
        if self == next {
            return true;
        }
        matches!(self, Lattice::Top | Lattice::Unreachable) || matches!(next, Lattice::Bottom | Lattice::Reachable)
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lattice::Top => write!(f, "T"),
            Lattice::Constant(v) => write!(f, "{v}"),
            Lattice::SymConst(e) => write!(f, "{e}"),
            Lattice::Bottom => write!(f, "_|_"),
            Lattice::Unreachable => write!(f, "unreachable"),
            Lattice::Reachable => write!(f, "reachable"),
        }
    }
}
