//! Scoring of semantic representations by elementary-predication
//! recall and precision against a gold standard.

use std::collections::HashSet;
use std::fmt;

use crate::eps::{self, RelationIndex};
use crate::error::Result;
use crate::flatten;
use crate::term::{Nominal, SatOp, Term};

/// Match statistics for one scored pair: overall, relational and
/// unlabeled-dependency recall, precision and f-score.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Results {
    pub recall: f64,
    pub precision: f64,
    pub fscore: f64,
    pub deps_recall: f64,
    pub deps_precision: f64,
    pub deps_fscore: f64,
    pub unlabeled_deps_recall: f64,
    pub unlabeled_deps_precision: f64,
    pub unlabeled_deps_fscore: f64,
}

impl fmt::Display for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fscore: {:.4}  recall: {:.4}  precision: {:.4}  \
             deps fscore: {:.4}  deps recall: {:.4}  deps precision: {:.4}  \
             unlabeled deps fscore: {:.4}  unlabeled deps recall: {:.4}  \
             unlabeled deps precision: {:.4}",
            self.fscore,
            self.recall,
            self.precision,
            self.deps_fscore,
            self.deps_recall,
            self.deps_precision,
            self.unlabeled_deps_fscore,
            self.unlabeled_deps_recall,
            self.unlabeled_deps_precision,
        )
    }
}

/// Balanced harmonic mean of recall and precision.
pub fn fscore(recall: f64, precision: f64) -> f64 {
    if recall + precision == 0.0 {
        0.0
    } else {
        2.0 * recall * precision / (recall + precision)
    }
}

/// Flattens both terms and scores the first against the second.
pub fn score(lf: &Term, gold: &Term, rels: &RelationIndex) -> Result<Results> {
    let eps = flatten::flatten_sorted(lf, rels)?;
    let gold_eps = flatten::flatten_sorted(gold, rels)?;
    Ok(score_eps(&eps, &gold_eps))
}

/// Scores one flat predication list against a gold one. Ratios with an
/// empty denominator count as perfect.
pub fn score_eps(eps: &[SatOp], gold_eps: &[SatOp]) -> Results {
    let eps_set: HashSet<&SatOp> = eps.iter().collect();
    let gold_set: HashSet<&SatOp> = gold_eps.iter().collect();
    let deps_set: HashSet<(&Nominal, &Nominal)> = eps.iter().filter_map(dep).collect();
    let gold_deps_set: HashSet<(&Nominal, &Nominal)> = gold_eps.iter().filter_map(dep).collect();

    let mut results = Results::default();

    let mut recalled = 0usize;
    let mut deps_recalled = 0usize;
    let mut unlabeled_recalled = 0usize;
    let gold_deps = gold_deps_set.len();
    for ep in gold_eps {
        let isdep = eps::is_rel_pred(ep);
        if eps_set.contains(ep) {
            recalled += 1;
            if isdep {
                deps_recalled += 1;
            }
        }
        if isdep && dep(ep).map(|d| deps_set.contains(&d)).unwrap_or(false) {
            unlabeled_recalled += 1;
        }
    }
    results.recall = ratio(recalled, gold_eps.len());
    results.deps_recall = ratio(deps_recalled, gold_deps);
    results.unlabeled_deps_recall = ratio(unlabeled_recalled, gold_deps);

    let mut precise = 0usize;
    let mut deps_precise = 0usize;
    let mut unlabeled_precise = 0usize;
    let lf_deps = deps_set.len();
    for ep in eps {
        let isdep = eps::is_rel_pred(ep);
        if gold_set.contains(ep) {
            precise += 1;
            if isdep {
                deps_precise += 1;
            }
        }
        if isdep && dep(ep).map(|d| gold_deps_set.contains(&d)).unwrap_or(false) {
            unlabeled_precise += 1;
        }
    }
    results.precision = ratio(precise, eps.len());
    results.deps_precision = ratio(deps_precise, lf_deps);
    results.unlabeled_deps_precision = ratio(unlabeled_precise, lf_deps);

    results.fscore = fscore(results.recall, results.precision);
    results.deps_fscore = fscore(results.deps_recall, results.deps_precision);
    results.unlabeled_deps_fscore =
        fscore(results.unlabeled_deps_recall, results.unlabeled_deps_precision);

    results
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        1.0
    } else {
        num as f64 / denom as f64
    }
}

// unlabeled dependency of a relational predication, with the nominals
// in canonical order so direction does not matter
fn dep(ep: &SatOp) -> Option<(&Nominal, &Nominal)> {
    if !eps::is_rel_pred(ep) {
        return None;
    }
    let n1 = &ep.nominal;
    let n2 = eps::secondary_nominal(ep)?;
    if n1.compare(n2) != std::cmp::Ordering::Greater {
        Some((n1, n2))
    } else {
        Some((n2, n1))
    }
}
