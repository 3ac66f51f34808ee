//! Property-based tests over the public API

use proptest::prelude::*;

use hylosem::{compare_preds, score_eps, sort, Mode, Nominal, RelationIndex, SatOp, SimpleType, Term};

#[derive(Debug, Clone)]
enum PredDesc {
    Lex(u8, u8),
    Attr(u8, u8, u8),
    Rel(u8, u8, u8),
}

fn arb_pred() -> impl Strategy<Value = PredDesc> {
    prop_oneof![
        (0..4u8, 0..4u8).prop_map(|(n, p)| PredDesc::Lex(n, p)),
        (0..4u8, 0..3u8, 0..3u8).prop_map(|(n, r, v)| PredDesc::Attr(n, r, v)),
        (0..4u8, 0..3u8, 0..4u8).prop_map(|(n, r, m)| PredDesc::Rel(n, r, m)),
    ]
}

fn build_pred(desc: &PredDesc) -> SatOp {
    let nom = |i: u8| Nominal::atom(format!("x{}", i), SimpleType::top());
    match desc {
        PredDesc::Lex(n, p) => SatOp::new(nom(*n), Term::prop(format!("p{}", p))),
        PredDesc::Attr(n, r, v) => SatOp::new(
            nom(*n),
            Term::diamond(Mode::label(format!("R{}", r)), Term::prop(format!("v{}", v))),
        ),
        PredDesc::Rel(n, r, m) => SatOp::new(
            nom(*n),
            Term::diamond(Mode::label(format!("R{}", r)), Term::nom(nom(*m))),
        ),
    }
}

fn in_range(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

proptest! {
    #[test]
    fn score_metrics_stay_in_unit_range(
        a in proptest::collection::vec(arb_pred(), 1..8),
        b in proptest::collection::vec(arb_pred(), 1..8),
    ) {
        let eps: Vec<SatOp> = a.iter().map(build_pred).collect();
        let gold: Vec<SatOp> = b.iter().map(build_pred).collect();
        let r = score_eps(&eps, &gold);
        for x in [
            r.recall, r.precision, r.fscore,
            r.deps_recall, r.deps_precision, r.deps_fscore,
            r.unlabeled_deps_recall, r.unlabeled_deps_precision, r.unlabeled_deps_fscore,
        ] {
            prop_assert!(in_range(x), "out of range: {}", x);
        }
        prop_assert_eq!(r.fscore == 0.0, r.recall == 0.0 || r.precision == 0.0);
    }

    #[test]
    fn exact_match_scores_one(a in proptest::collection::vec(arb_pred(), 1..8)) {
        let eps: Vec<SatOp> = a.iter().map(build_pred).collect();
        let r = score_eps(&eps, &eps);
        prop_assert_eq!(r.fscore, 1.0);
        prop_assert_eq!(r.deps_fscore, 1.0);
        prop_assert_eq!(r.unlabeled_deps_fscore, 1.0);
    }

    #[test]
    fn sorting_is_idempotent(a in proptest::collection::vec(arb_pred(), 1..10)) {
        let rels = RelationIndex::default();
        let mut once: Vec<SatOp> = a.iter().map(build_pred).collect();
        sort(&mut once, &rels);
        let mut twice = once.clone();
        sort(&mut twice, &rels);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn sorted_lists_are_ordered(a in proptest::collection::vec(arb_pred(), 1..10)) {
        let rels = RelationIndex::default();
        let mut preds: Vec<SatOp> = a.iter().map(build_pred).collect();
        sort(&mut preds, &rels);
        for pair in preds.windows(2) {
            prop_assert_ne!(
                compare_preds(&pair[0], &pair[1], &rels),
                std::cmp::Ordering::Greater
            );
        }
    }
}
