//! Property-based tests for term unification using proptest.

use proptest::prelude::*;

use super::{unify, Substitution, UnifyControl};
use crate::term::{HyloVar, Mode, Nominal, Term};
use crate::types::{SimpleType, TypeHierarchy};

/// Term description before building against a type hierarchy.
#[derive(Debug, Clone)]
enum TermDesc {
    Prop(u8),
    Atom(u8),
    Var(u8),
    NomVar(u8),
    Diamond(u8, Box<TermDesc>),
    Sat(u8, Box<TermDesc>),
}

fn arb_term_desc(max_depth: u32) -> BoxedStrategy<TermDesc> {
    if max_depth == 0 {
        prop_oneof![
            (0..3u8).prop_map(TermDesc::Prop),
            (0..3u8).prop_map(TermDesc::Atom),
            (0..2u8).prop_map(TermDesc::Var),
            (0..2u8).prop_map(TermDesc::NomVar),
        ]
        .boxed()
    } else {
        prop_oneof![
            3 => (0..3u8).prop_map(TermDesc::Prop),
            2 => (0..3u8).prop_map(TermDesc::Atom),
            2 => (0..2u8).prop_map(TermDesc::Var),
            2 => (0..2u8).prop_map(TermDesc::NomVar),
            2 => (0..2u8, arb_term_desc(max_depth - 1))
                .prop_map(|(m, arg)| TermDesc::Diamond(m, Box::new(arg))),
            1 => (0..2u8, arb_term_desc(max_depth - 1))
                .prop_map(|(n, arg)| TermDesc::Sat(n, Box::new(arg))),
        ]
        .boxed()
    }
}

fn build_term(desc: &TermDesc) -> Term {
    match desc {
        TermDesc::Prop(i) => Term::prop(format!("p{}", i)),
        TermDesc::Atom(i) => Term::nom(Nominal::atom(format!("x{}", i), SimpleType::top())),
        TermDesc::Var(i) => Term::Var(HyloVar::new(format!("V{}", i), 0, SimpleType::top())),
        TermDesc::NomVar(i) => Term::nom(Nominal::var(format!("X{}", i), 0, SimpleType::top())),
        TermDesc::Diamond(m, arg) => {
            Term::diamond(Mode::label(format!("M{}", m)), build_term(arg))
        }
        TermDesc::Sat(n, arg) => Term::satop(
            Nominal::atom(format!("x{}", n), SimpleType::top()),
            build_term(arg),
        ),
    }
}

proptest! {
    /// Unification success does not depend on argument order.
    #[test]
    fn unify_success_is_symmetric(d1 in arb_term_desc(2), d2 in arb_term_desc(2)) {
        let types = TypeHierarchy::new();
        let t1 = build_term(&d1);
        let t2 = build_term(&d2);

        let uc = UnifyControl::new(&types);
        let mut sub = Substitution::new();
        let forward = unify(&t1, &t2, &mut sub, &uc).is_ok();

        let uc = UnifyControl::new(&types);
        let mut sub = Substitution::new();
        let backward = unify(&t2, &t1, &mut sub, &uc).is_ok();

        prop_assert_eq!(forward, backward);
    }

    /// A variable-free term always unifies with itself.
    #[test]
    fn ground_terms_self_unify(d in arb_term_desc(2)) {
        let t = build_term(&d);
        prop_assume!(is_ground(&t));
        let types = TypeHierarchy::new();
        let uc = UnifyControl::new(&types);
        let mut sub = Substitution::new();
        let result = unify(&t, &t.clone(), &mut sub, &uc);
        prop_assert!(result.is_ok());
        prop_assert_eq!(result.ok(), Some(t));
    }

    /// Unifying a bare variable with a ground term binds it to exactly
    /// that term.
    #[test]
    fn variable_binds_to_ground_term(d in arb_term_desc(2)) {
        let t = build_term(&d);
        prop_assume!(is_ground(&t));
        let var = Term::Var(HyloVar::new("W", 0, SimpleType::top()));
        let types = TypeHierarchy::new();
        let uc = UnifyControl::new(&types);
        let mut sub = Substitution::new();
        let result = unify(&t, &var, &mut sub, &uc);
        prop_assert_eq!(result.ok(), Some(t));
    }
}

fn is_ground(term: &Term) -> bool {
    match term {
        Term::Prop(_) => true,
        Term::Nom(n) => n.is_atom(),
        Term::Var(_) => false,
        Term::BoxOp(m) | Term::DiamondOp(m) => is_ground(&m.arg),
        Term::Op(op) => op.args.iter().all(is_ground),
        Term::Sat(s) => s.nominal.is_atom() && is_ground(&s.arg),
        Term::Chunked(c) => is_ground(&c.arg),
    }
}
