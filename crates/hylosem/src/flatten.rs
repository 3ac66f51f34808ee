//! Flattening of nested terms into elementary predications.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::eps::{self, RelationIndex};
use crate::error::{Result, StructuralError};
use crate::term::{Alt, ModalOp, Nominal, OpKind, Origin, SatOp, Term};

// one flattened node; dummies anchor structure but are not output
struct FlatNode {
    satop: Option<SatOp>,
    nominal: Option<Nominal>,
    alts: Vec<Alt>,
    opts: Vec<u32>,
    chunks: Vec<u32>,
    children: Vec<usize>,
}

/// Flattens a nested term into a list of elementary predications,
/// converting exclusive disjunctions to alternative groups and optional
/// parts to optionality indices, and recording the principal structure
/// of the original expression.
///
/// Alternative, optionality and chunk markers are propagated outward
/// through both structural children and shared-nominal references.
#[derive(Default)]
pub struct Flattener {
    nodes: Vec<FlatNode>,
    roots: Vec<usize>,
    alt_count: u32,
    opt_count: u32,
    nom_map: HashMap<Nominal, usize>,
    depth_map: HashMap<Nominal, usize>,
    parent_map: IndexMap<Nominal, Option<Nominal>>,
}

impl Flattener {
    pub fn new() -> Flattener {
        Flattener::default()
    }

    /// Flattens `lf`, returning the elementary predications in the order
    /// they were encountered.
    pub fn flatten(&mut self, lf: &Term) -> Result<Vec<SatOp>> {
        self.walk(
            lf,
            None,
            None,
            0,
            &mut Vec::new(),
            &mut Vec::new(),
            &mut Vec::new(),
            None,
        )?;
        if self.alt_count > 0 || self.opt_count > 0 {
            self.propagate();
        }
        let mut preds = Vec::new();
        for node in &self.nodes {
            if let Some(satop) = &node.satop {
                let mut satop = satop.clone();
                satop.alts = node.alts.clone();
                satop.opts = node.opts.clone();
                satop.chunks = node.chunks.clone();
                preds.push(satop);
            }
        }
        Ok(preds)
    }

    /// Map from each nominal to its highest parent nominal in the
    /// original expression, or `None` for a root nominal. Populated by
    /// [`Flattener::flatten`].
    pub fn highest_parent_map(&self) -> &IndexMap<Nominal, Option<Nominal>> {
        &self.parent_map
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &mut self,
        lf: &Term,
        current: Option<&Nominal>,
        parent: Option<usize>,
        depth: usize,
        alts: &mut Vec<Alt>,
        opts: &mut Vec<u32>,
        chunks: &mut Vec<u32>,
        origin: Option<Origin>,
    ) -> Result<()> {
        match lf {
            Term::Chunked(c) => {
                let mark = chunks.len();
                chunks.extend_from_slice(&c.chunks);
                self.walk(&c.arg, current, parent, depth, alts, opts, chunks, origin)?;
                chunks.truncate(mark);
                Ok(())
            }
            Term::Sat(satop) => {
                let nominal = satop.nominal.clone();
                let origin = satop.origin.or(origin);
                let mark = chunks.len();
                chunks.extend_from_slice(&satop.chunks);
                let dummy = self.add_node(
                    None,
                    Some(nominal.clone()),
                    parent,
                    depth,
                    alts,
                    opts,
                    chunks,
                );
                self.walk(
                    &satop.arg,
                    Some(&nominal),
                    Some(dummy),
                    depth,
                    alts,
                    opts,
                    chunks,
                    origin,
                )?;
                chunks.truncate(mark);
                Ok(())
            }
            Term::Op(op) => {
                let dummy =
                    self.add_node(None, current.cloned(), parent, depth, alts, opts, chunks);
                match op.kind {
                    OpKind::Xor => {
                        let alt_set = self.alt_count;
                        self.alt_count += 1;
                        for (i, arg) in op.args.iter().enumerate() {
                            alts.push(Alt {
                                alt_set,
                                num_in_set: i as u32,
                            });
                            self.walk(
                                arg,
                                current,
                                Some(dummy),
                                depth + 1,
                                alts,
                                opts,
                                chunks,
                                origin,
                            )?;
                            alts.pop();
                        }
                        Ok(())
                    }
                    OpKind::Opt => {
                        let arg = op
                            .args
                            .first()
                            .ok_or_else(|| StructuralError::Unflattenable(lf.to_string()))?;
                        opts.push(self.opt_count);
                        self.opt_count += 1;
                        self.walk(
                            arg,
                            current,
                            Some(dummy),
                            depth + 1,
                            alts,
                            opts,
                            chunks,
                            origin,
                        )?;
                        opts.pop();
                        Ok(())
                    }
                    _ => {
                        for arg in &op.args {
                            self.walk(
                                arg,
                                current,
                                Some(dummy),
                                depth + 1,
                                alts,
                                opts,
                                chunks,
                                origin,
                            )?;
                        }
                        Ok(())
                    }
                }
            }
            Term::Prop(_) => {
                let nominal = current
                    .ok_or_else(|| StructuralError::Unanchored(lf.to_string()))?
                    .clone();
                let mut satop = SatOp::new(nominal.clone(), lf.clone());
                satop.origin = origin;
                self.add_node(Some(satop), Some(nominal), parent, depth, alts, opts, chunks);
                Ok(())
            }
            Term::Var(_) => Ok(()),
            Term::DiamondOp(diamond) => {
                self.walk_diamond(lf, diamond, current, parent, depth, alts, opts, chunks, origin)
            }
            _ => Err(StructuralError::Unflattenable(lf.to_string())),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_diamond(
        &mut self,
        lf: &Term,
        diamond: &ModalOp,
        current: Option<&Nominal>,
        parent: Option<usize>,
        depth: usize,
        alts: &mut Vec<Alt>,
        opts: &mut Vec<u32>,
        chunks: &mut Vec<u32>,
        origin: Option<Origin>,
    ) -> Result<()> {
        let nominal = current
            .ok_or_else(|| StructuralError::Unanchored(lf.to_string()))?
            .clone();
        match diamond.arg.strip_chunks() {
            Term::Prop(_) | Term::Nom(_) | Term::Var(_) => {
                let mut satop = SatOp::new(nominal.clone(), lf.clone());
                satop.origin = origin;
                self.add_node(Some(satop), Some(nominal), parent, depth, alts, opts, chunks);
                Ok(())
            }
            Term::Op(arg_op) if arg_op.kind == OpKind::Conj => {
                // the first conjunct names the new anchor; the rest are
                // flattened beneath it
                let (first, rest) = arg_op
                    .args
                    .split_first()
                    .ok_or_else(|| StructuralError::IllTypedDiamond(lf.to_string()))?;
                let first_nom = first
                    .as_nominal()
                    .ok_or_else(|| StructuralError::IllTypedDiamond(first.to_string()))?
                    .clone();
                let mut satop = SatOp::new(
                    nominal.clone(),
                    Term::DiamondOp(ModalOp::new(
                        diamond.mode.clone(),
                        Term::Nom(first_nom.clone()),
                    )),
                );
                satop.origin = origin;
                let node = self.add_node(
                    Some(satop),
                    Some(nominal),
                    parent,
                    depth,
                    alts,
                    opts,
                    chunks,
                );
                for arg in rest {
                    self.walk(
                        arg,
                        Some(&first_nom),
                        Some(node),
                        depth + 1,
                        alts,
                        opts,
                        chunks,
                        origin,
                    )?;
                }
                Ok(())
            }
            Term::Op(arg_op) if arg_op.kind == OpKind::Xor => {
                let dummy = self.add_node(
                    None,
                    Some(nominal.clone()),
                    parent,
                    depth,
                    alts,
                    opts,
                    chunks,
                );
                let alt_set = self.alt_count;
                self.alt_count += 1;
                for (i, disjunct) in arg_op.args.iter().enumerate() {
                    alts.push(Alt {
                        alt_set,
                        num_in_set: i as u32,
                    });
                    let result = self.walk_disjunct(
                        diamond, disjunct, &nominal, dummy, depth, alts, opts, chunks, origin,
                    );
                    alts.pop();
                    result?;
                }
                Ok(())
            }
            _ => Err(StructuralError::IllTypedDiamond(lf.to_string())),
        }
    }

    // one disjunct of an exclusive disjunction under a diamond: either a
    // bare nominal or a conjunction led by one
    #[allow(clippy::too_many_arguments)]
    fn walk_disjunct(
        &mut self,
        diamond: &ModalOp,
        disjunct: &Term,
        nominal: &Nominal,
        dummy: usize,
        depth: usize,
        alts: &mut Vec<Alt>,
        opts: &mut Vec<u32>,
        chunks: &mut Vec<u32>,
        origin: Option<Origin>,
    ) -> Result<()> {
        let (disjunct_nom, rest): (Nominal, &[Term]) = match disjunct.strip_chunks() {
            Term::Nom(n) => (n.clone(), &[]),
            Term::Op(op) if op.kind == OpKind::Conj => {
                let (first, rest) = op
                    .args
                    .split_first()
                    .ok_or_else(|| StructuralError::IllTypedDiamond(disjunct.to_string()))?;
                let nom = first
                    .as_nominal()
                    .ok_or_else(|| StructuralError::IllTypedDiamond(first.to_string()))?;
                (nom.clone(), rest)
            }
            _ => return Err(StructuralError::IllTypedDiamond(disjunct.to_string())),
        };
        let mut satop = SatOp::new(
            nominal.clone(),
            Term::DiamondOp(ModalOp::new(
                diamond.mode.clone(),
                Term::Nom(disjunct_nom.clone()),
            )),
        );
        satop.origin = origin;
        let node = self.add_node(
            Some(satop),
            Some(nominal.clone()),
            Some(dummy),
            depth + 1,
            alts,
            opts,
            chunks,
        );
        for arg in rest {
            self.walk(
                arg,
                Some(&disjunct_nom),
                Some(node),
                depth + 2,
                alts,
                opts,
                chunks,
                origin,
            )?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_node(
        &mut self,
        satop: Option<SatOp>,
        nominal: Option<Nominal>,
        parent: Option<usize>,
        depth: usize,
        alts: &[Alt],
        opts: &[u32],
        chunks: &[u32],
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(FlatNode {
            satop,
            nominal: nominal.clone(),
            alts: alts.to_vec(),
            opts: opts.to_vec(),
            chunks: chunks.to_vec(),
            children: Vec::new(),
        });
        match parent {
            None => self.roots.push(idx),
            Some(p) => self.nodes[p].children.push(idx),
        }
        if let Some(nom) = nominal {
            if !nom.shared {
                let known = self
                    .depth_map
                    .get(&nom)
                    .map(|&d| depth < d)
                    .unwrap_or(true);
                if known {
                    self.nom_map.insert(nom.clone(), idx);
                    self.depth_map.insert(nom.clone(), depth);
                    let parent_nom =
                        parent.and_then(|p| self.nodes[p].nominal.clone());
                    self.parent_map.insert(nom, parent_nom);
                }
            }
        }
        idx
    }

    fn propagate(&mut self) {
        let roots = self.roots.clone();
        for root in roots {
            self.prop_node(root, &[], &[], &[]);
        }
    }

    fn prop_node(&mut self, idx: usize, alts: &[Alt], opts: &[u32], chunks: &[u32]) {
        {
            let node = &mut self.nodes[idx];
            for alt in alts {
                if !node.alts.contains(alt) {
                    node.alts.push(*alt);
                }
            }
            node.alts.sort();
            for opt in opts {
                if !node.opts.contains(opt) {
                    node.opts.push(*opt);
                }
            }
            node.opts.sort_unstable();
            for chunk in chunks {
                if !node.chunks.contains(chunk) {
                    node.chunks.push(*chunk);
                }
            }
            node.chunks.sort_unstable();
        }
        let (alts2, opts2, chunks2, children, nominal, secondary) = {
            let node = &self.nodes[idx];
            (
                node.alts.clone(),
                node.opts.clone(),
                node.chunks.clone(),
                node.children.clone(),
                node.nominal.clone(),
                node.satop
                    .as_ref()
                    .and_then(|s| eps::secondary_nominal(s).cloned()),
            )
        };
        for child in children {
            self.prop_node(child, &alts2, &opts2, &chunks2);
        }
        // shared nominals pick up markers from every mention; descend
        // only when something new would arrive, which also bounds the
        // recursion on cyclic references
        for nom in [nominal, secondary].into_iter().flatten() {
            if !nom.shared {
                continue;
            }
            if let Some(&target) = self.nom_map.get(&nom) {
                if target != idx && self.would_gain(target, &alts2, &opts2, &chunks2) {
                    self.prop_node(target, &alts2, &opts2, &chunks2);
                }
            }
        }
    }

    fn would_gain(&self, idx: usize, alts: &[Alt], opts: &[u32], chunks: &[u32]) -> bool {
        let node = &self.nodes[idx];
        alts.iter().any(|a| !node.alts.contains(a))
            || opts.iter().any(|o| !node.opts.contains(o))
            || chunks.iter().any(|c| !node.chunks.contains(c))
    }
}

/// Flattens a term and sorts the predications into canonical order.
pub fn flatten_sorted(lf: &Term, rels: &RelationIndex) -> Result<Vec<SatOp>> {
    let mut preds = Flattener::new().flatten(lf)?;
    eps::sort(&mut preds, rels);
    Ok(preds)
}

/// Flattens a term and rebuilds it as a sorted conjunction of
/// predications.
pub fn flatten_term(lf: &Term, rels: &RelationIndex) -> Result<Term> {
    let preds = flatten_sorted(lf, rels)?;
    eps::conj_term(preds).ok_or_else(|| StructuralError::Unflattenable(lf.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Mode, Op};
    use crate::types::SimpleType;

    fn nom(name: &str) -> Nominal {
        Nominal::atom(name, SimpleType::top())
    }

    fn run_dog_lf() -> Term {
        // @x1(run ^ <Tense>past ^ <Subj>(x2 ^ dog))
        Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::prop("run"),
                Term::diamond(Mode::label("Tense"), Term::prop("past")),
                Term::diamond(
                    Mode::label("Subj"),
                    Term::conj(vec![Term::nom(nom("x2")), Term::prop("dog")]),
                ),
            ]),
        )
    }

    #[test]
    fn flattens_nested_term_to_sorted_eps() {
        let preds = flatten_sorted(&run_dog_lf(), &RelationIndex::default()).unwrap();
        let shown: Vec<String> = preds.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "@x1(run)",
                "@x1(<Tense>past)",
                "@x1(<Subj>x2)",
                "@x2(dog)",
            ]
        );
    }

    #[test]
    fn bare_proposition_fails() {
        let err = Flattener::new().flatten(&Term::prop("run")).unwrap_err();
        assert!(matches!(err, StructuralError::Unanchored(_)));
    }

    #[test]
    fn diamond_conj_without_leading_nominal_fails() {
        let lf = Term::satop(
            nom("x1"),
            Term::diamond(
                Mode::label("Subj"),
                Term::conj(vec![Term::prop("dog"), Term::nom(nom("x2"))]),
            ),
        );
        let err = Flattener::new().flatten(&lf).unwrap_err();
        assert!(matches!(err, StructuralError::IllTypedDiamond(_)));
    }

    #[test]
    fn box_terms_cannot_be_flattened() {
        let lf = Term::satop(nom("x1"), Term::boxed(Mode::label("Mod"), Term::prop("p")));
        let err = Flattener::new().flatten(&lf).unwrap_err();
        assert!(matches!(err, StructuralError::Unflattenable(_)));
    }

    #[test]
    fn hylo_vars_are_skipped() {
        let lf = Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::prop("run"),
                Term::Var(crate::term::HyloVar::new("P", 0, SimpleType::top())),
            ]),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        assert_eq!(preds.len(), 1);
    }

    #[test]
    fn xor_assigns_alts_to_each_alternative() {
        // @x1(run v_ walk)
        let lf = Term::satop(
            nom("x1"),
            Term::Op(Op::new(
                OpKind::Xor,
                vec![Term::prop("run"), Term::prop("walk")],
            )),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(
            preds[0].alts,
            vec![Alt {
                alt_set: 0,
                num_in_set: 0
            }]
        );
        assert_eq!(
            preds[1].alts,
            vec![Alt {
                alt_set: 0,
                num_in_set: 1
            }]
        );
    }

    #[test]
    fn nested_xor_allocates_distinct_alt_sets() {
        let lf = Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::Op(Op::new(
                    OpKind::Xor,
                    vec![Term::prop("a"), Term::prop("b")],
                )),
                Term::Op(Op::new(
                    OpKind::Xor,
                    vec![Term::prop("c"), Term::prop("d")],
                )),
            ]),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        assert_eq!(preds.len(), 4);
        assert_eq!(preds[0].alts[0].alt_set, 0);
        assert_eq!(preds[2].alts[0].alt_set, 1);
    }

    #[test]
    fn opt_marks_optional_parts() {
        let lf = Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::prop("run"),
                Term::Op(Op::new(
                    OpKind::Opt,
                    vec![Term::diamond(Mode::label("Tense"), Term::prop("past"))],
                )),
            ]),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds[0].opts.is_empty());
        assert_eq!(preds[1].opts, vec![0]);
    }

    #[test]
    fn alts_propagate_through_shared_nominals() {
        // the shared mention of x2 inside an alternative pulls the alt
        // marker onto x2's canonical predication
        let mut shared_x2 = nom("x2");
        shared_x2.shared = true;
        let lf = Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::prop("see"),
                Term::diamond(
                    Mode::label("Obj"),
                    Term::conj(vec![Term::nom(nom("x2")), Term::prop("dog")]),
                ),
                Term::Op(Op::new(
                    OpKind::Xor,
                    vec![
                        Term::diamond(Mode::label("Mod"), Term::nom(shared_x2)),
                        Term::prop("here"),
                    ],
                )),
            ]),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        let dog = preds
            .iter()
            .find(|p| eps::lex_pred_name(p) == Some("dog"))
            .unwrap();
        assert!(!dog.alts.is_empty());
    }

    #[test]
    fn chunk_marks_reach_enclosed_predications() {
        let lf = Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::prop("run"),
                Term::chunked(
                    vec![0],
                    Term::diamond(Mode::label("Tense"), Term::prop("past")),
                ),
            ]),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        assert!(preds[0].chunks.is_empty());
        assert_eq!(preds[1].chunks, vec![0]);
    }

    #[test]
    fn origin_threads_from_enclosing_satop() {
        let mut inner = SatOp::new(
            nom("x1"),
            Term::conj(vec![Term::prop("run"), Term::prop("fast")]),
        );
        inner.origin = Some(Origin(2));
        let preds = Flattener::new().flatten(&Term::from(inner)).unwrap();
        assert!(preds.iter().all(|p| p.origin == Some(Origin(2))));
    }

    #[test]
    fn highest_parent_map_records_structure() {
        let mut flattener = Flattener::new();
        flattener.flatten(&run_dog_lf()).unwrap();
        let parents = flattener.highest_parent_map();
        assert_eq!(parents.get(&nom("x1")), Some(&None));
        assert_eq!(parents.get(&nom("x2")), Some(&Some(nom("x1"))));
    }

    #[test]
    fn diamond_xor_over_nominal_disjuncts() {
        // @x1(see ^ <Obj>(x2 v_ (x3 ^ cat)))
        let lf = Term::satop(
            nom("x1"),
            Term::conj(vec![
                Term::prop("see"),
                Term::diamond(
                    Mode::label("Obj"),
                    Term::Op(Op::new(
                        OpKind::Xor,
                        vec![
                            Term::nom(nom("x2")),
                            Term::conj(vec![Term::nom(nom("x3")), Term::prop("cat")]),
                        ],
                    )),
                ),
            ]),
        );
        let preds = Flattener::new().flatten(&lf).unwrap();
        let shown: Vec<String> = preds.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            shown,
            vec!["@x1(see)", "@x1(<Obj>x2)", "@x1(<Obj>x3)", "@x3(cat)"]
        );
        assert_eq!(preds[1].alts[0].num_in_set, 0);
        assert_eq!(preds[2].alts[0].num_in_set, 1);
        assert_eq!(preds[3].alts[0].num_in_set, 1);
    }
}
