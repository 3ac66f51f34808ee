//! Shared context for a unification session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::term::{Mode, Term};
use crate::types::{SimpleType, TypeHierarchy};

use super::{UnifyFailure, VarKind};

/// Context threaded through unification: the type hierarchy for meets
/// and a counter issuing variable indices unique within this control.
///
/// The counter is atomic, so one control can be shared across threads;
/// independent sessions should use independent controls.
#[derive(Debug)]
pub struct UnifyControl<'a> {
    types: &'a TypeHierarchy,
    next_index: AtomicU32,
}

impl<'a> UnifyControl<'a> {
    pub fn new(types: &'a TypeHierarchy) -> UnifyControl<'a> {
        UnifyControl {
            types,
            next_index: AtomicU32::new(1),
        }
    }

    pub fn types(&self) -> &TypeHierarchy {
        self.types
    }

    /// Issues a fresh variable index.
    pub fn fresh_index(&self) -> u32 {
        self.next_index.fetch_add(1, Ordering::Relaxed)
    }

    /// Most specific common refinement of two types.
    pub fn meet(&self, a: &SimpleType, b: &SimpleType) -> Result<SimpleType, UnifyFailure> {
        self.types
            .meet(a, b)
            .ok_or_else(|| UnifyFailure::TypeClash(a.clone(), b.clone()))
    }

    /// Renames every variable in `term` to a fresh index, keeping
    /// occurrences of the same variable consistent. Used to instantiate
    /// a stored term before unifying against it.
    pub fn reindex(&self, term: &mut Term) {
        let mut assigned: HashMap<(VarKind, String, u32), u32> = HashMap::new();
        term.deep_map(&mut |t| match t {
            Term::Var(v) => {
                let idx = *assigned
                    .entry((VarKind::Hylo, v.name.clone(), v.index))
                    .or_insert_with(|| self.fresh_index());
                v.index = idx;
            }
            Term::Nom(n) if n.is_var() => {
                let idx = *assigned
                    .entry((VarKind::Nominal, n.name.clone(), n.index))
                    .or_insert_with(|| self.fresh_index());
                n.index = idx;
            }
            Term::BoxOp(m) | Term::DiamondOp(m) => {
                if let Mode::Var(mv) = &mut m.mode {
                    let idx = *assigned
                        .entry((VarKind::Mode, mv.name.clone(), mv.index))
                        .or_insert_with(|| self.fresh_index());
                    mv.index = idx;
                }
            }
            _ => {}
        });
    }
}
