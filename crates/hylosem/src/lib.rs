//! Hybrid-logic semantic representations
//!
//! This library implements a hybrid modal logic term language for
//! sentence semantics: flattening nested terms into sorted elementary
//! predications, compacting flat predication lists back into nested
//! terms, unification with a simple type hierarchy, nominal
//! variable/atom conversion, JSON interchange, and scoring against gold
//! representations.

pub mod compact;
pub mod convert;
pub mod eps;
pub mod error;
pub mod flatten;
pub mod json;
pub mod score;
pub mod term;
pub mod types;
pub mod unify;

// Re-export the term model
pub use term::{
    Alt, Chunked, HyloVar, ModalOp, Mode, ModeVar, Nominal, NominalKind, Op, OpKind, Origin,
    Proposition, SatOp, Term,
};

pub use types::{SimpleType, TypeHierarchy};

pub use error::{Result, StructuralError};

// Re-export flattening and compaction
pub use compact::compact;
pub use flatten::{flatten_sorted, flatten_term, Flattener};

pub use convert::{convert_to_atoms, convert_to_vars, AnchorSign, LexEntry};

// Re-export the predication utilities
pub use eps::{
    append, attr_val, check, compact_and_convert, compact_and_convert_with_anchor, compare_preds,
    conj_term, ep_kind, first_ep, get_preds, is_attr_pred, is_elementary_predication, is_lex_pred,
    is_rel_pred, is_root, lex_pred_name, nom_index, principal_nominal, rel_name,
    secondary_nominal, sem_feats_for_head, set_origin, sort, EpKind, RelationIndex,
};

pub use score::{fscore, score, score_eps, Results};

pub use unify::{fill, unify, unify_check, Substitution, UnifyControl, UnifyFailure, VarKey};

pub use json::{from_json, read_lf, to_json, write_lf, LfJson};
