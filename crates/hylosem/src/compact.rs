//! Compaction of flat predication lists back into nested terms.

use indexmap::IndexMap;

use crate::eps::{self, RelationIndex};
use crate::term::{Nominal, Op, OpKind, SatOp, Term};

/// Rebuilds a nested term from a flat predication list. A root nominal
/// may be given to pin the top of the structure. Nominals with multiple
/// parents are kept separate unless every parent sits below a root, in
/// which case the nominal is attached under the parent closest to one.
/// Duplicate predications are reattached at an alternative site when
/// one exists, and dropped otherwise.
pub fn compact(preds: &[SatOp], root: Option<&Nominal>, rels: &RelationIndex) -> Term {
    let mut preds: Vec<SatOp> = preds.iter().map(|p| p.copy()).collect();
    match preds.len() {
        0 => return Term::Op(Op::conj(Vec::new())),
        1 => return Term::from(preds.remove(0)),
        _ => {}
    }

    // unique parents vs nominals mentioned from several places
    let mut parents: IndexMap<Nominal, Nominal> = IndexMap::new();
    let mut multiple: IndexMap<Nominal, Vec<Nominal>> = IndexMap::new();
    for pred in &preds {
        let nom1 = pred.nominal.clone();
        let nom2 = match eps::secondary_nominal(pred) {
            Some(n) => n.clone(),
            None => continue,
        };
        if root == Some(&nom2) {
            continue;
        }
        if let Some(group) = multiple.get_mut(&nom2) {
            if !group.contains(&nom1) {
                group.push(nom1);
            }
        } else if let Some(existing) = parents.shift_remove(&nom2) {
            let mut group = vec![existing];
            if !group.contains(&nom1) {
                group.push(nom1);
            }
            multiple.insert(nom2, group);
        } else {
            parents.insert(nom2, nom1);
        }
    }

    // drop multiple-parent candidates whose parent chain cycles back;
    // a nominal left with a single candidate becomes uniquely parented
    let mut prev = usize::MAX;
    while multiple.len() != prev {
        prev = multiple.len();
        let noms: Vec<Nominal> = multiple.keys().cloned().collect();
        for nom in noms {
            let mut group = multiple.get(&nom).cloned().unwrap_or_default();
            group.retain(|cand| !leads_back(cand, &nom, &parents));
            if group.len() == 1 {
                let parent = group.remove(0);
                parents.insert(nom.clone(), parent);
                multiple.shift_remove(&nom);
            } else {
                multiple.insert(nom, group);
            }
        }
    }

    // break remaining cycles among unique parents; every edge on a
    // cycle goes, so mutually referring nominals each stay a root
    let cyclic: Vec<Nominal> = parents
        .iter()
        .filter(|(nom, parent)| leads_back(parent, nom, &parents))
        .map(|(nom, _)| nom.clone())
        .collect();
    for nom in cyclic {
        parents.shift_remove(&nom);
    }

    eps::sort(&mut preds, rels);

    // combine consecutive preds on the same nominal, setting aside
    // exact duplicates for reattachment at the end
    let mut combined: Vec<SatOp> = vec![preds[0].clone()];
    let mut dups: Vec<SatOp> = Vec::new();
    for i in 1..preds.len() {
        if preds[i] == preds[i - 1] {
            dups.push(preds[i].clone());
            continue;
        }
        let last = combined
            .last_mut()
            .filter(|last| last.nominal == preds[i].nominal);
        match last {
            Some(last) => combine(last, preds[i].arg.clone()),
            None => combined.push(preds[i].clone()),
        }
    }

    // splice uniquely parented preds into their parents, children first
    let index_of: IndexMap<Nominal, usize> = combined
        .iter()
        .enumerate()
        .map(|(i, p)| (p.nominal.clone(), i))
        .collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); combined.len()];
    for (child, parent) in &parents {
        if let (Some(&ci), Some(&pi)) = (index_of.get(child), index_of.get(parent)) {
            children[pi].push(ci);
        }
    }
    let mut done = vec![false; combined.len()];
    for i in 0..combined.len() {
        assemble(i, &mut combined, &children, &mut done);
    }

    // roots carry no parent of either kind
    let mut roots: Vec<Nominal> = Vec::new();
    let mut root_preds: Vec<usize> = Vec::new();
    let mut multi_preds: Vec<usize> = Vec::new();
    for (i, pred) in combined.iter().enumerate() {
        let nom = &pred.nominal;
        if !parents.contains_key(nom) && !multiple.contains_key(nom) {
            roots.push(nom.clone());
            root_preds.push(i);
        }
        if multiple.contains_key(nom) {
            multi_preds.push(i);
        }
    }

    // attach multiple-parent preds under the parent closest to a root;
    // a pred none of whose parents reaches a root stays separate
    prev = usize::MAX;
    while multi_preds.len() != prev {
        prev = multi_preds.len();
        let mut kept = Vec::new();
        for &mi in &multi_preds {
            let nom = combined[mi].nominal.clone();
            let group = multiple.get(&nom).cloned().unwrap_or_default();
            let mut best: Option<(Nominal, usize, usize)> = None;
            for cand in &group {
                let mut dist = 0usize;
                let mut top = cand.clone();
                while let Some(p) = parents.get(&top) {
                    top = p.clone();
                    dist += 1;
                }
                if let Some(ri) = roots.iter().position(|r| *r == top) {
                    if best.as_ref().map(|(_, d, _)| dist < *d).unwrap_or(true) {
                        best = Some((cand.clone(), dist, ri));
                    }
                }
            }
            match best {
                Some((parent, _, ri)) => {
                    let arg2 = combined[mi].arg.clone();
                    let root_idx = root_preds[ri];
                    subst_into(&mut combined[root_idx], &arg2, &nom, Some(&parent));
                    parents.insert(nom, parent);
                }
                None => kept.push(mi),
            }
        }
        multi_preds = kept;
    }

    let mut ret_preds: Vec<Term> = Vec::new();
    for &i in root_preds.iter().chain(&multi_preds) {
        ret_preds.push(Term::from(combined[i].clone()));
    }
    let mut retval = match ret_preds.len() {
        1 => ret_preds.remove(0),
        _ => Term::Op(Op::conj(ret_preds)),
    };

    for dup in dups {
        if let Some(parent) = find_dup_parent(&retval, None, &dup.arg, &dup.nominal) {
            subst(&mut retval, None, &dup.arg, &dup.nominal, Some(&parent));
        }
    }

    retval
}

// whether walking up from `cand` leads back into the chain seen so far
fn leads_back(cand: &Nominal, nom: &Nominal, parents: &IndexMap<Nominal, Nominal>) -> bool {
    let mut history = vec![nom.clone()];
    let mut current = Some(cand.clone());
    while let Some(c) = current {
        if history.contains(&c) {
            return true;
        }
        current = parents.get(&c).cloned();
        history.push(c);
    }
    false
}

// merges the second arg into the first pred as a conjunction
fn combine(satop: &mut SatOp, arg2: Term) {
    match &mut satop.arg {
        Term::Op(op) if op.kind == OpKind::Conj => op.args.push(arg2),
        _ => {
            let arg1 = satop.arg.clone();
            satop.arg = Term::conj(vec![arg1, arg2]);
        }
    }
}

fn assemble(i: usize, combined: &mut [SatOp], children: &[Vec<usize>], done: &mut [bool]) {
    if done[i] {
        return;
    }
    done[i] = true;
    for &c in &children[i] {
        assemble(c, combined, children, done);
        let child_arg = combined[c].arg.clone();
        let child_nom = combined[c].nominal.clone();
        subst_into(&mut combined[i], &child_arg, &child_nom, None);
    }
}

fn subst_into(satop: &mut SatOp, arg2: &Term, nom2: &Nominal, required: Option<&Nominal>) -> bool {
    let nom = satop.nominal.clone();
    subst(&mut satop.arg, Some(&nom), arg2, nom2, required)
}

// substitutes `arg2` at the first mention of `nom2`, optionally only
// under `required` as the governing nominal
fn subst(
    lf: &mut Term,
    current: Option<&Nominal>,
    arg2: &Term,
    nom2: &Nominal,
    required: Option<&Nominal>,
) -> bool {
    match lf {
        Term::Sat(satop) => {
            let nom = satop.nominal.clone();
            subst(&mut satop.arg, Some(&nom), arg2, nom2, required)
        }
        Term::DiamondOp(d) => {
            let at_target = matches!(&*d.arg, Term::Nom(n) if n == nom2)
                && (required.is_none() || required == current);
            if at_target {
                let old = (*d.arg).clone();
                if let Some(appended) = eps::append(Some(old), Some(arg2.clone())) {
                    *d.arg = appended;
                }
                true
            } else {
                subst(&mut d.arg, current, arg2, nom2, required)
            }
        }
        Term::Op(op) => {
            let mut current = current.cloned();
            for i in 0..op.args.len() {
                if let Term::Nom(n) = &op.args[i] {
                    if n == nom2 && (required.is_none() || required == current.as_ref()) {
                        op.append_arg(arg2.clone());
                        return true;
                    }
                    current = Some(n.clone());
                    continue;
                }
                if subst(&mut op.args[i], current.as_ref(), arg2, nom2, required) {
                    return true;
                }
            }
            false
        }
        Term::Chunked(c) => subst(&mut c.arg, current, arg2, nom2, required),
        _ => false,
    }
}

// locates an alternative attachment site for a duplicate pred: the
// governing nominal of a mention of `dup_nom` whose siblings do not
// already include the duplicate's arg
fn find_dup_parent(
    lf: &Term,
    current: Option<&Nominal>,
    dup_arg: &Term,
    dup_nom: &Nominal,
) -> Option<Nominal> {
    match lf {
        Term::Sat(satop) => find_dup_parent(&satop.arg, Some(&satop.nominal), dup_arg, dup_nom),
        Term::DiamondOp(d) => {
            if matches!(&*d.arg, Term::Nom(n) if n == dup_nom) {
                current.cloned()
            } else {
                find_dup_parent(&d.arg, current, dup_arg, dup_nom)
            }
        }
        Term::Op(op) => {
            let mut current = current.cloned();
            for arg in &op.args {
                if let Term::Nom(n) = arg {
                    if n == dup_nom && !op.args.contains(dup_arg) {
                        return current;
                    }
                    current = Some(n.clone());
                    continue;
                }
                if let Some(found) = find_dup_parent(arg, current.as_ref(), dup_arg, dup_nom) {
                    return Some(found);
                }
            }
            None
        }
        Term::Chunked(c) => find_dup_parent(&c.arg, current, dup_arg, dup_nom),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Mode;
    use crate::types::SimpleType;

    fn nom(name: &str) -> Nominal {
        Nominal::atom(name, SimpleType::top())
    }

    fn lex(n: &str, p: &str) -> SatOp {
        SatOp::new(nom(n), Term::prop(p))
    }

    fn attr(n: &str, rel: &str, val: &str) -> SatOp {
        SatOp::new(nom(n), Term::diamond(Mode::label(rel), Term::prop(val)))
    }

    fn rel(n1: &str, rel: &str, n2: &str) -> SatOp {
        SatOp::new(
            nom(n1),
            Term::diamond(Mode::label(rel), Term::nom(nom(n2))),
        )
    }

    #[test]
    fn rebuilds_nested_term() {
        let preds = vec![
            lex("x1", "run"),
            attr("x1", "Tense", "past"),
            rel("x1", "Subj", "x2"),
            lex("x2", "dog"),
        ];
        let lf = compact(&preds, None, &RelationIndex::default());
        assert_eq!(lf.to_string(), "@x1(run ^ <Tense>past ^ <Subj>(x2 ^ dog))");
    }

    #[test]
    fn single_pred_passes_through() {
        let preds = vec![lex("x1", "run")];
        let lf = compact(&preds, None, &RelationIndex::default());
        assert_eq!(lf.to_string(), "@x1(run)");
    }

    #[test]
    fn multiple_parents_attach_closest_to_root() {
        // x3 is mentioned from both x1 and x2; x1 is the root, so x3's
        // material lands on the x1 mention and the x2 mention stays a
        // bare reference
        let preds = vec![
            lex("x1", "see"),
            rel("x1", "Obj", "x3"),
            rel("x1", "Mod", "x2"),
            lex("x2", "with"),
            rel("x2", "Arg", "x3"),
            lex("x3", "scope"),
        ];
        let lf = compact(&preds, None, &RelationIndex::default());
        let shown = lf.to_string();
        assert!(shown.contains("<Obj>(x3 ^ scope)"), "got {shown}");
        assert!(shown.contains("<Arg>x3"), "got {shown}");
    }

    #[test]
    fn cycle_between_nominals_is_broken() {
        let preds = vec![
            lex("x1", "a"),
            rel("x1", "Arg", "x2"),
            lex("x2", "b"),
            rel("x2", "Arg", "x1"),
        ];
        let lf = compact(&preds, None, &RelationIndex::default());
        // neither side swallows the other; both stay top-level
        assert_eq!(
            lf.to_string(),
            "(@x1(a ^ <Arg>x2) ^ @x2(b ^ <Arg>x1))"
        );
    }

    #[test]
    fn root_nominal_stays_on_top() {
        let preds = vec![
            lex("x1", "run"),
            rel("x1", "Subj", "x2"),
            lex("x2", "dog"),
            rel("x2", "GenOwn", "x1"),
        ];
        let lf = compact(&preds, Some(&nom("x1")), &RelationIndex::default());
        assert!(lf.to_string().starts_with("@x1("), "got {lf}");
    }

    #[test]
    fn duplicate_pred_reattaches_elsewhere() {
        let preds = vec![
            lex("x1", "see"),
            rel("x1", "Obj", "x2"),
            rel("x1", "Mod", "x3"),
            lex("x3", "mod"),
            rel("x3", "Arg", "x2"),
            lex("x2", "dog"),
            lex("x2", "dog"),
        ];
        let lf = compact(&preds, None, &RelationIndex::default());
        let shown = lf.to_string();
        assert_eq!(shown.matches("dog").count(), 2, "got {shown}");
    }

    #[test]
    fn disconnected_pieces_stay_conjoined() {
        let preds = vec![lex("x1", "a"), lex("x2", "b")];
        let lf = compact(&preds, None, &RelationIndex::default());
        assert_eq!(lf.to_string(), "(@x1(a) ^ @x2(b))");
    }
}
