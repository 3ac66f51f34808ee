//! Elementary predications: classification, sorting and list utilities.
//!
//! A flat semantic representation is a sorted list of [`SatOp`]s, each
//! one of three shapes: a lexical predication `@x(prop)`, an attribute
//! predication `@x(<Rel>val)` with a propositional or variable value, or
//! a relational predication `@x(<Rel>y)` linking two nominals.

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::compact;
use crate::convert::{convert_to_atoms, AnchorSign};
use crate::error::Result;
use crate::flatten::Flattener;
use crate::term::{Nominal, Op, OpKind, Origin, SatOp, Term};
use crate::unify::UnifyFailure;

/// The three kinds of elementary predication, in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EpKind {
    Lex = 1,
    Attr = 2,
    Rel = 3,
}

/// Classifies a predication, or returns `None` for a satop that is not
/// an elementary predication.
pub fn ep_kind(pred: &SatOp) -> Option<EpKind> {
    match pred.arg.strip_chunks() {
        Term::Prop(_) => Some(EpKind::Lex),
        Term::DiamondOp(d) => match d.arg.strip_chunks() {
            Term::Nom(_) => Some(EpKind::Rel),
            Term::Prop(_) | Term::Var(_) => Some(EpKind::Attr),
            _ => None,
        },
        _ => None,
    }
}

pub fn is_lex_pred(pred: &SatOp) -> bool {
    ep_kind(pred) == Some(EpKind::Lex)
}

pub fn is_attr_pred(pred: &SatOp) -> bool {
    ep_kind(pred) == Some(EpKind::Attr)
}

pub fn is_rel_pred(pred: &SatOp) -> bool {
    ep_kind(pred) == Some(EpKind::Rel)
}

/// The lexical predicate name of a lexical predication.
pub fn lex_pred_name(pred: &SatOp) -> Option<&str> {
    match pred.arg.strip_chunks() {
        Term::Prop(p) => Some(&p.name),
        _ => None,
    }
}

/// The relation name of an attribute or relational predication.
pub fn rel_name(pred: &SatOp) -> Option<String> {
    match pred.arg.strip_chunks() {
        Term::DiamondOp(d) => Some(d.mode.to_string()),
        _ => None,
    }
}

pub fn principal_nominal(pred: &SatOp) -> &Nominal {
    &pred.nominal
}

/// The nominal argument of a relational predication.
pub fn secondary_nominal(pred: &SatOp) -> Option<&Nominal> {
    match pred.arg.strip_chunks() {
        Term::DiamondOp(d) => d.arg.as_nominal(),
        _ => None,
    }
}

/// Sort positions for relation names. Unlisted relations fall back to
/// the `*` wildcard entry when present, and otherwise to -1, placing
/// them ahead of all listed relations.
#[derive(Debug, Clone)]
pub struct RelationIndex {
    map: IndexMap<String, i32>,
}

impl RelationIndex {
    /// An empty index: all relations share sort position -1 and are
    /// ordered by name alone.
    pub fn new() -> RelationIndex {
        RelationIndex {
            map: IndexMap::new(),
        }
    }

    /// Builds an index from an ordered list of relation names. A `*`
    /// entry positions all unlisted relations.
    pub fn from_order<I, S>(order: I) -> RelationIndex
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = IndexMap::new();
        for (i, name) in order.into_iter().enumerate() {
            map.insert(name.into(), i as i32);
        }
        RelationIndex { map }
    }

    pub fn sort_index(&self, rel: &str) -> i32 {
        if let Some(&i) = self.map.get(rel) {
            return i;
        }
        self.map.get("*").copied().unwrap_or(-1)
    }
}

impl Default for RelationIndex {
    /// The conventional order for scoping and coordination relations.
    fn default() -> RelationIndex {
        RelationIndex::from_order([
            "BoundVar",
            "PairedWith",
            "Restr",
            "Body",
            "Scope",
            "*",
            "GenRel",
            "Coord",
            "Append",
        ])
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Canonical ordering of elementary predications: principal nominal,
/// then predication kind, then lexical predicate or relation, with ties
/// among relational predications broken by the secondary nominal.
pub fn compare_preds(a: &SatOp, b: &SatOp, rels: &RelationIndex) -> Ordering {
    let nom_cmp = a.nominal.compare(&b.nominal);
    if nom_cmp != Ordering::Equal {
        return nom_cmp;
    }
    let ka = ep_kind(a);
    let kb = ep_kind(b);
    let kind_cmp = ka.cmp(&kb);
    if kind_cmp != Ordering::Equal {
        return kind_cmp;
    }
    if ka == Some(EpKind::Lex) {
        if let (Some(l1), Some(l2)) = (lex_pred_name(a), lex_pred_name(b)) {
            return cmp_ignore_case(l1, l2);
        }
        return Ordering::Equal;
    }
    let (r1, r2) = match (rel_name(a), rel_name(b)) {
        (Some(r1), Some(r2)) => (r1, r2),
        _ => return Ordering::Equal,
    };
    let idx_cmp = rels.sort_index(&r1).cmp(&rels.sort_index(&r2));
    if idx_cmp != Ordering::Equal {
        return idx_cmp;
    }
    let rel_cmp = cmp_ignore_case(&r1, &r2);
    if rel_cmp != Ordering::Equal {
        return rel_cmp;
    }
    if ka == Some(EpKind::Rel) {
        if let (Some(n1), Some(n2)) = (secondary_nominal(a), secondary_nominal(b)) {
            return n1.compare(n2);
        }
    }
    Ordering::Equal
}

/// Sorts a predication list into canonical order.
pub fn sort(preds: &mut [SatOp], rels: &RelationIndex) {
    preds.sort_by(|a, b| compare_preds(a, b, rels));
}

/// Checks a sorted predication list for well-formedness: at most one
/// lexical predication per nominal.
pub fn check(preds: &[SatOp]) -> std::result::Result<(), UnifyFailure> {
    for pair in preds.windows(2) {
        if is_lex_pred(&pair[0]) && is_lex_pred(&pair[1]) && pair[0].nominal == pair[1].nominal {
            return Err(UnifyFailure::DuplicateLexPred(pair[0].nominal.clone()));
        }
    }
    Ok(())
}

/// The satops of a term that is a single predication or a conjunction of
/// predications. Other shapes yield an empty list.
pub fn get_preds(lf: &Term) -> Vec<&SatOp> {
    match lf.strip_chunks() {
        Term::Sat(s) => vec![s],
        Term::Op(op) if op.kind == OpKind::Conj => {
            op.args.iter().filter_map(Term::as_satop).collect()
        }
        _ => Vec::new(),
    }
}

/// Joins two optional terms into one, splicing conjunction arguments
/// together rather than nesting.
pub fn append(lf1: Option<Term>, lf2: Option<Term>) -> Option<Term> {
    let mut args = Vec::new();
    for lf in [lf1, lf2].into_iter().flatten() {
        match lf {
            Term::Op(op) if op.kind == OpKind::Conj => args.extend(op.args),
            other => args.push(other),
        }
    }
    match args.len() {
        0 => None,
        1 => args.pop(),
        _ => Some(Term::Op(Op::conj(args))),
    }
}

/// Rebuilds a term from a predication list: a single satop, or a
/// conjunction of them.
pub fn conj_term(preds: Vec<SatOp>) -> Option<Term> {
    let mut args: Vec<Term> = preds.into_iter().map(Term::from).collect();
    match args.len() {
        0 => None,
        1 => args.pop(),
        _ => Some(Term::Op(Op::conj(args))),
    }
}

/// First elementary predication of a nested term.
pub fn first_ep(lf: &Term) -> Result<Option<SatOp>> {
    let mut flattener = Flattener::new();
    let preds = flattener.flatten(lf)?;
    Ok(preds.into_iter().next())
}

/// Whether the satop is one of the three elementary shapes.
pub fn is_elementary_predication(pred: &SatOp) -> bool {
    ep_kind(pred).is_some()
}

/// Value term of an attribute predication: the proposition or variable
/// under the relation.
pub fn attr_val(pred: &SatOp) -> Option<&Term> {
    match pred.arg.strip_chunks() {
        Term::DiamondOp(m) => match m.arg.strip_chunks() {
            val @ (Term::Prop(_) | Term::Var(_)) => Some(val),
            _ => None,
        },
        _ => None,
    }
}

/// Positions of the first predication for each principal nominal in a
/// sorted list.
pub fn nom_index(preds: &[SatOp]) -> IndexMap<Nominal, usize> {
    let mut map = IndexMap::new();
    for (i, pred) in preds.iter().enumerate() {
        map.entry(pred.nominal.clone()).or_insert(i);
    }
    map
}

/// Whether `nom` is a root: not the secondary nominal of any predication.
pub fn is_root(nom: &Nominal, preds: &[SatOp]) -> bool {
    !preds
        .iter()
        .any(|p| secondary_nominal(p) == Some(nom))
}

/// Stamps an origin onto a predication or each predication of a
/// conjunction.
pub fn set_origin(lf: &mut Term, origin: Origin) {
    match lf {
        Term::Sat(s) => s.origin = Some(origin),
        Term::Op(op) if op.kind == OpKind::Conj => {
            for arg in &mut op.args {
                if let Term::Sat(s) = arg {
                    s.origin = Some(origin);
                }
            }
        }
        Term::Chunked(c) => set_origin(&mut c.arg, origin),
        _ => {}
    }
}

/// Attribute predications for the given head nominal.
pub fn sem_feats_for_head<'a>(nominal: &Nominal, preds: &'a [SatOp]) -> Vec<&'a SatOp> {
    preds
        .iter()
        .filter(|p| p.nominal == *nominal && is_attr_pred(p))
        .collect()
}

/// Compacts a predication list into a nested term and renames its
/// variable nominals to atoms.
pub fn compact_and_convert(
    preds: &[SatOp],
    root: Option<&Nominal>,
    rels: &RelationIndex,
) -> Term {
    let mut lf = compact::compact(preds, root, rels);
    convert_to_atoms(&mut lf, None, root);
    lf
}

/// Converts nominals with word positions from the anchor sign first,
/// then compacts under the converted root.
pub fn compact_and_convert_with_anchor(
    preds: &[SatOp],
    root: Option<&Nominal>,
    anchor: &dyn AnchorSign,
    rels: &RelationIndex,
) -> Term {
    let satops: Vec<SatOp> = preds.to_vec();
    let mut flat = match conj_term(satops) {
        Some(t) => t,
        None => return Term::Op(Op::conj(Vec::new())),
    };
    let new_root = convert_to_atoms(&mut flat, Some(anchor), root);
    let converted: Vec<SatOp> = get_preds(&flat).into_iter().cloned().collect();
    compact::compact(&converted, new_root.as_ref().or(root), rels)
}
