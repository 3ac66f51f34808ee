//! Unification over hybrid logic terms.
//!
//! Unification is direction-independent: when two variables of the same
//! kind meet, the tie is broken by name and index rather than by which
//! operand came first. Types are refined to the most specific common
//! subtype as bindings are made.

mod control;
mod substitution;

pub use control::UnifyControl;
pub use substitution::{Substitution, VarKey, VarKind};

#[cfg(test)]
mod proptest_tests;

use std::fmt;

use crate::term::{Mode, ModalOp, Nominal, Op, Proposition, SatOp, Term};
use crate::types::SimpleType;

/// The ordinary, recoverable failure of a unification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifyFailure {
    /// Structural clash between two terms
    Mismatch(String, String),
    /// A variable occurs in the term it would bind to
    OccursCheck(String, String),
    /// Types have no common subtype
    TypeClash(SimpleType, SimpleType),
    /// Mode labels differ
    ModeClash(Mode, Mode),
    /// Adjacent lexical predications share a principal nominal
    DuplicateLexPred(Nominal),
}

impl fmt::Display for UnifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnifyFailure::Mismatch(a, b) => write!(f, "cannot unify {} with {}", a, b),
            UnifyFailure::OccursCheck(v, t) => write!(f, "variable {} occurs in {}", v, t),
            UnifyFailure::TypeClash(a, b) => {
                write!(f, "types {} and {} have no common subtype", a, b)
            }
            UnifyFailure::ModeClash(a, b) => write!(f, "modes {} and {} differ", a, b),
            UnifyFailure::DuplicateLexPred(nom) => {
                write!(f, "duplicate lexical predication for nominal {}", nom)
            }
        }
    }
}

impl std::error::Error for UnifyFailure {}

fn mismatch(a: &Term, b: &Term) -> UnifyFailure {
    UnifyFailure::Mismatch(a.to_string(), b.to_string())
}

/// The declared type of a term, where it has one: nominals and variables
/// always, propositions optionally, everything else never.
fn type_of(term: &Term) -> Option<SimpleType> {
    match term {
        Term::Nom(n) => Some(n.ty.clone()),
        Term::Var(v) => Some(v.ty.clone()),
        Term::Prop(p) => p.ty.clone(),
        _ => None,
    }
}

fn is_nominal_var(term: &Term) -> bool {
    matches!(term, Term::Nom(n) if n.is_var())
}

fn is_var(term: &Term) -> bool {
    matches!(term, Term::Var(_)) || is_nominal_var(term)
}

/// Unifies two terms under an accumulating substitution, returning the
/// unified term. On failure the substitution may hold partial bindings.
pub fn unify(
    t1: &Term,
    t2: &Term,
    sub: &mut Substitution,
    ctl: &UnifyControl,
) -> Result<Term, UnifyFailure> {
    let a = t1.strip_chunks();
    let b = t2.strip_chunks();
    // variables drive unification, with nominal vars taking precedence
    // over plain vars and the second operand's variable checked first
    let (driver, other) = if is_var(b) {
        (b, a)
    } else if is_var(a) {
        (a, b)
    } else {
        return unify_non_var(a, b, sub, ctl);
    };
    match (driver, other) {
        (Term::Nom(nv), _) => unify_nominal_var(nv, other, sub, ctl),
        (Term::Var(_), Term::Nom(on)) if on.is_var() => unify_nominal_var(on, driver, sub, ctl),
        (Term::Var(v), _) => unify_hylo_var_term(driver, v, other, sub, ctl),
        _ => unreachable!("driver is a variable"),
    }
}

fn unify_non_var(
    a: &Term,
    b: &Term,
    sub: &mut Substitution,
    ctl: &UnifyControl,
) -> Result<Term, UnifyFailure> {
    match (a, b) {
        (Term::Nom(n1), Term::Nom(n2)) => {
            if n1 == n2 {
                Ok(Term::Nom(n1.clone()))
            } else {
                Err(mismatch(a, b))
            }
        }
        (Term::Prop(p1), Term::Prop(p2)) => unify_props(p1, p2, ctl).map(Term::Prop),
        (Term::DiamondOp(d1), Term::DiamondOp(d2)) => {
            let mode = unify_modes(&d1.mode, &d2.mode, sub)?;
            let arg = unify(&d1.arg, &d2.arg, sub, ctl)?;
            Ok(Term::DiamondOp(ModalOp::new(mode, arg)))
        }
        (Term::Sat(s1), Term::Sat(s2)) => {
            let nom = unify(
                &Term::Nom(s1.nominal.clone()),
                &Term::Nom(s2.nominal.clone()),
                sub,
                ctl,
            )?;
            let nominal = nom
                .as_nominal()
                .cloned()
                .ok_or_else(|| mismatch(a, b))?;
            let arg = unify(&s1.arg, &s2.arg, sub, ctl)?;
            let mut satop = SatOp::new(nominal, arg);
            satop.origin = s1.origin;
            Ok(Term::Sat(Box::new(satop)))
        }
        // boxes and n-ary ops do not unify
        _ => Err(mismatch(a, b)),
    }
}

fn unify_props(
    p1: &Proposition,
    p2: &Proposition,
    ctl: &UnifyControl,
) -> Result<Proposition, UnifyFailure> {
    if p1 == p2 {
        return Ok(p1.clone());
    }
    // distinct names still unify when both carry types with a common
    // refinement; the result is named after the more specific type
    match (&p1.ty, &p2.ty) {
        (Some(t1), Some(t2)) => {
            let st = ctl.meet(t1, t2)?;
            if st == *t1 {
                Ok(p1.clone())
            } else if st == *t2 {
                Ok(p2.clone())
            } else {
                Ok(Proposition::typed(st.name().to_string(), st))
            }
        }
        _ => Err(UnifyFailure::Mismatch(p1.to_string(), p2.to_string())),
    }
}

fn unify_nominal_var(
    nv: &Nominal,
    other: &Term,
    sub: &mut Substitution,
    ctl: &UnifyControl,
) -> Result<Term, UnifyFailure> {
    debug_assert!(nv.is_var());
    if let Term::Nom(on) = other {
        if on == nv {
            return Ok(Term::Nom(nv.clone()));
        }
    }
    let other_ty = type_of(other).ok_or_else(|| mismatch(&Term::Nom(nv.clone()), other))?;
    let st = ctl.meet(&nv.ty, &other_ty)?;
    let key = VarKey::nominal(nv).ok_or_else(|| mismatch(&Term::Nom(nv.clone()), other))?;
    match other {
        Term::Nom(on) if on.is_atom() => Ok(sub.bind(key, Term::Nom(on.clone()))),
        Term::Nom(on) => {
            let other_key =
                VarKey::nominal(on).ok_or_else(|| mismatch(&Term::Nom(nv.clone()), other))?;
            if nv.ty == on.ty {
                if nv.compare(on) != std::cmp::Ordering::Less {
                    Ok(sub.bind(key, Term::Nom(on.clone())))
                } else {
                    Ok(sub.bind(other_key, Term::Nom(nv.clone())))
                }
            } else if nv.ty == st {
                Ok(sub.bind(other_key, Term::Nom(nv.clone())))
            } else if on.ty == st {
                Ok(sub.bind(key, Term::Nom(on.clone())))
            } else {
                // neither type subsumes the other: introduce a fresh var
                // with the intersection type, named after the lesser one
                let name = if nv.compare(on) != std::cmp::Ordering::Less {
                    format!("{}{}", on.name, on.index)
                } else {
                    format!("{}{}", nv.name, nv.index)
                };
                let fresh = Nominal::var(name, ctl.fresh_index(), st);
                sub.bind(other_key, Term::Nom(fresh.clone()));
                Ok(sub.bind(key, Term::Nom(fresh)))
            }
        }
        Term::Var(hv) => {
            let hv_key = VarKey::hylo(hv);
            if nv.ty == st {
                Ok(sub.bind(hv_key, Term::Nom(nv.clone())))
            } else {
                let fresh = Nominal::var(nv.name.clone(), ctl.fresh_index(), st);
                sub.bind(hv_key, Term::Nom(fresh.clone()));
                Ok(sub.bind(key, Term::Nom(fresh)))
            }
        }
        _ => Err(mismatch(&Term::Nom(nv.clone()), other)),
    }
}

fn unify_hylo_var_term(
    var_term: &Term,
    v: &crate::term::HyloVar,
    other: &Term,
    sub: &mut Substitution,
    ctl: &UnifyControl,
) -> Result<Term, UnifyFailure> {
    if let Term::Var(ov) = other {
        if ov == v {
            return Ok(var_term.clone());
        }
    }
    let st = match type_of(other) {
        Some(ty) => Some(ctl.meet(&v.ty, &ty)?),
        None => None,
    };
    let key = VarKey::hylo(v);
    match other {
        Term::Var(ov) => {
            let st = st.ok_or_else(|| mismatch(var_term, other))?;
            let other_key = VarKey::hylo(ov);
            if v.ty == ov.ty {
                if v.compare(ov) != std::cmp::Ordering::Less {
                    Ok(sub.bind(key, other.clone()))
                } else {
                    Ok(sub.bind(other_key, var_term.clone()))
                }
            } else if v.ty == st {
                Ok(sub.bind(other_key, var_term.clone()))
            } else if ov.ty == st {
                Ok(sub.bind(key, other.clone()))
            } else {
                let name = if v.compare(ov) != std::cmp::Ordering::Less {
                    format!("{}{}", ov.name, ov.index)
                } else {
                    format!("{}{}", v.name, v.index)
                };
                let fresh = Term::Var(crate::term::HyloVar::new(name, ctl.fresh_index(), st));
                sub.bind(other_key, fresh.clone());
                Ok(sub.bind(key, fresh))
            }
        }
        Term::Prop(p) => {
            let refines = match (&st, &p.ty) {
                (None, _) => false,
                (Some(s), Some(t)) => s != t,
                (Some(_), None) => true,
            };
            if !refines {
                Ok(sub.bind(key, other.clone()))
            } else {
                let s = st.unwrap_or_else(SimpleType::top);
                Ok(sub.bind(key, Term::Prop(Proposition::typed(s.name().to_string(), s))))
            }
        }
        _ => {
            if occurs(other, &key) {
                return Err(UnifyFailure::OccursCheck(
                    var_term.to_string(),
                    other.to_string(),
                ));
            }
            Ok(sub.bind(key, other.clone()))
        }
    }
}

/// Unifies two modes, recording mode variable bindings.
pub fn unify_modes(
    m1: &Mode,
    m2: &Mode,
    sub: &mut Substitution,
) -> Result<Mode, UnifyFailure> {
    let (driver, other) = match (m1, m2) {
        (Mode::Label(a), Mode::Label(b)) => {
            return if a == b {
                Ok(m1.clone())
            } else {
                Err(UnifyFailure::ModeClash(m1.clone(), m2.clone()))
            };
        }
        (_, Mode::Var(_)) => (m2, m1),
        (Mode::Var(_), _) => (m1, m2),
    };
    let dv = match driver {
        Mode::Var(v) => v,
        Mode::Label(_) => unreachable!(),
    };
    match other {
        Mode::Label(_) => Ok(sub.bind_mode(VarKey::mode(dv), other.clone())),
        Mode::Var(ov) => {
            if dv == ov {
                Ok(driver.clone())
            } else if dv.compare(ov) != std::cmp::Ordering::Less {
                Ok(sub.bind_mode(VarKey::mode(dv), other.clone()))
            } else {
                Ok(sub.bind_mode(VarKey::mode(ov), driver.clone()))
            }
        }
    }
}

/// Quick structural compatibility test without binding. Modal operators
/// must line up with the same flavor of operator; n-ary ops never pass.
pub fn unify_check(t1: &Term, t2: &Term) -> Result<(), UnifyFailure> {
    let a = t1.strip_chunks();
    let b = t2.strip_chunks();
    match a {
        Term::Op(_) => Err(mismatch(a, b)),
        Term::DiamondOp(d1) => match b {
            Term::DiamondOp(d2) => unify_check(&d1.arg, &d2.arg),
            _ => Err(mismatch(a, b)),
        },
        Term::BoxOp(b1) => match b {
            Term::BoxOp(b2) => unify_check(&b1.arg, &b2.arg),
            _ => Err(mismatch(a, b)),
        },
        _ => Ok(()),
    }
}

/// Whether the variable identified by `key` occurs anywhere in `term`.
pub fn occurs(term: &Term, key: &VarKey) -> bool {
    match term {
        Term::Var(v) => VarKey::hylo(v) == *key,
        Term::Nom(n) => VarKey::nominal(n).as_ref() == Some(key),
        Term::Prop(_) => false,
        Term::BoxOp(m) | Term::DiamondOp(m) => occurs(&m.arg, key),
        Term::Op(op) => op.args.iter().any(|a| occurs(a, key)),
        Term::Sat(s) => {
            VarKey::nominal(&s.nominal).as_ref() == Some(key) || occurs(&s.arg, key)
        }
        Term::Chunked(c) => occurs(&c.arg, key),
    }
}

/// Resolves every bound variable in `term` against `sub`. Chunk wrappers
/// and predication bookkeeping are not carried into the result.
pub fn fill(term: &Term, sub: &Substitution) -> Term {
    match term {
        Term::Var(v) => match sub.get(&VarKey::hylo(v)) {
            Some(val) if val == term => val.clone(),
            Some(val) => fill(val, sub),
            None => term.clone(),
        },
        Term::Nom(n) => match VarKey::nominal(n).and_then(|k| sub.get(&k)) {
            Some(val) if val == term => val.clone(),
            Some(val) => fill(val, sub),
            None => term.clone(),
        },
        Term::Prop(_) => term.clone(),
        Term::BoxOp(m) => Term::BoxOp(ModalOp::new(fill_mode(&m.mode, sub), fill(&m.arg, sub))),
        Term::DiamondOp(m) => {
            Term::DiamondOp(ModalOp::new(fill_mode(&m.mode, sub), fill(&m.arg, sub)))
        }
        Term::Op(op) => Term::Op(Op::new(
            op.kind,
            op.args.iter().map(|a| fill(a, sub)).collect(),
        )),
        Term::Sat(s) => {
            let nominal = match fill(&Term::Nom(s.nominal.clone()), sub) {
                Term::Nom(n) => n,
                _ => s.nominal.clone(),
            };
            let mut satop = SatOp::new(nominal, fill(&s.arg, sub));
            satop.origin = s.origin;
            Term::Sat(Box::new(satop))
        }
        Term::Chunked(c) => fill(&c.arg, sub),
    }
}

/// Resolves a mode against the substitution's mode bindings.
pub fn fill_mode(mode: &Mode, sub: &Substitution) -> Mode {
    match mode {
        Mode::Label(_) => mode.clone(),
        Mode::Var(v) => match sub.get_mode(&VarKey::mode(v)) {
            Some(val) if val == mode => val.clone(),
            Some(val) => fill_mode(val, sub),
            None => mode.clone(),
        },
    }
}
