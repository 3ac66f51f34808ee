//! Conversion between nominal variables and nominal atoms.

use std::collections::HashMap;

use crate::eps;
use crate::term::{Nominal, Origin, Proposition, SatOp, Term};

/// A lexical entry serving as an anchor for word-position naming: the
/// entry's own flat predications plus its index nominal.
#[derive(Debug, Clone)]
pub struct LexEntry {
    pub preds: Vec<SatOp>,
    pub index_nominal: Nominal,
}

/// Resolves predication origins against a realized sign, giving each
/// lexical origin a word position and its lexical entry.
pub trait AnchorSign {
    fn word_index(&self, origin: Origin) -> Option<usize>;
    fn lex_entry(&self, origin: Origin) -> Option<&LexEntry>;
}

/// Converts nominal variables in `lf` to atoms in place. With an
/// anchor, atoms for lexical predications are named by word position
/// (`w0`, `w1`, ...); otherwise names derive from the first letter of
/// the governing lexical proposition. Returns the conversion of `root`,
/// if one was requested and made.
pub fn convert_to_atoms(
    lf: &mut Term,
    anchor: Option<&dyn AnchorSign>,
    root: Option<&Nominal>,
) -> Option<Nominal> {
    let mut converter = Converter {
        nominal_map: HashMap::new(),
        name_map: HashMap::new(),
        skip_absent_prop: true,
        anchor,
    };
    // two passes: the first skips nominals without a naming prop so a
    // meaningful name can still be picked up from a later predication
    converter.convert_noms(lf);
    converter.skip_absent_prop = false;
    converter.convert_noms(lf);
    root.and_then(|r| converter.nominal_map.get(r).cloned())
}

struct Converter<'a> {
    nominal_map: HashMap<Nominal, Nominal>,
    name_map: HashMap<String, u32>,
    skip_absent_prop: bool,
    anchor: Option<&'a dyn AnchorSign>,
}

impl Converter<'_> {
    fn convert_noms(&mut self, lf: &mut Term) {
        match lf {
            Term::Sat(satop) => {
                let word_index = self.word_index_for(satop);
                let prop = naming_prop(&satop.arg).cloned();
                satop.nominal =
                    self.convert_nominal(&satop.nominal.clone(), prop.as_ref(), word_index);
                self.convert_noms(&mut satop.arg);
            }
            Term::DiamondOp(d) => match &mut *d.arg {
                Term::Nom(n) => {
                    *n = self.convert_nominal(&n.clone(), None, None);
                }
                Term::Op(op) => {
                    if let Some(Term::Nom(first)) = op.args.first() {
                        let first = first.clone();
                        let prop = match op.args.get(1) {
                            Some(Term::Prop(p)) => Some(p.clone()),
                            _ => None,
                        };
                        op.args[0] =
                            Term::Nom(self.convert_nominal(&first, prop.as_ref(), None));
                    }
                    self.convert_noms(&mut d.arg);
                }
                _ => {}
            },
            Term::Op(op) => {
                for arg in &mut op.args {
                    self.convert_noms(arg);
                }
            }
            Term::Chunked(c) => self.convert_noms(&mut c.arg),
            _ => {}
        }
    }

    // word position for a lexical predication whose origin resolves in
    // the anchor sign and whose lex pred is not dominated by another
    fn word_index_for(&self, satop: &SatOp) -> Option<usize> {
        let anchor = self.anchor?;
        let origin = satop.origin?;
        let entry = anchor.lex_entry(origin)?;
        let lex_pred = eps::lex_pred_name(satop)?;
        if lex_pred == "elem" || lex_dominated(lex_pred, entry) {
            return None;
        }
        anchor.word_index(origin)
    }

    fn convert_nominal(
        &mut self,
        old: &Nominal,
        prop: Option<&Proposition>,
        word_index: Option<usize>,
    ) -> Nominal {
        if old.is_atom() {
            return old.clone();
        }
        if let Some(w) = word_index {
            return self.record(old, format!("w{}", w));
        }
        if prop.is_none() && self.skip_absent_prop {
            return old.clone();
        }
        if let Some(converted) = self.nominal_map.get(old) {
            return converted.clone();
        }
        let base = match prop {
            Some(p) => {
                let first = p.name.chars().next().map(|c| c.to_ascii_lowercase());
                match first {
                    Some(c) if c.is_alphabetic() => c.to_string(),
                    _ => "n".to_string(),
                }
            }
            None => "x".to_string(),
        };
        let ext = self.name_map.get(&base).copied().unwrap_or(0) + 1;
        self.name_map.insert(base.clone(), ext);
        self.record(old, format!("{}{}", base, ext))
    }

    fn record(&mut self, old: &Nominal, name: String) -> Nominal {
        let atom = Nominal::atom(name, old.ty.clone());
        self.nominal_map.insert(old.clone(), atom.clone());
        atom
    }
}

// whether the predication introducing `lex_pred` sits below another
// lexical predication within its own entry
fn lex_dominated(lex_pred: &str, entry: &LexEntry) -> bool {
    let mut lex_ep = None;
    let mut others = Vec::new();
    for pred in &entry.preds {
        if eps::is_lex_pred(pred) {
            if eps::lex_pred_name(pred) == Some(lex_pred) {
                lex_ep = Some(pred);
            } else {
                others.push(pred);
            }
        }
    }
    let lex_ep = match lex_ep {
        Some(ep) => ep,
        // entry does not introduce the pred; treat as dominated so the
        // name falls back to the governing proposition
        None => return true,
    };
    let lex_nom = &lex_ep.nominal;
    for other in others {
        let mut seen = vec![entry.index_nominal.clone()];
        if dominates(&other.nominal, lex_nom, &entry.preds, &mut seen) {
            return true;
        }
    }
    false
}

fn dominates(a: &Nominal, b: &Nominal, preds: &[SatOp], seen: &mut Vec<Nominal>) -> bool {
    if a == b {
        return false;
    }
    seen.push(a.clone());
    for pred in preds {
        if pred.nominal == *a {
            let c = match eps::secondary_nominal(pred) {
                Some(c) => c,
                None => continue,
            };
            if c == b {
                return true;
            }
            if seen.contains(c) {
                continue;
            }
            if dominates(&c.clone(), b, preds, seen) {
                return true;
            }
        }
    }
    seen.pop();
    false
}

/// Converts nominal atoms in a flat predication list back to variables,
/// uppercasing the names. Returns the conversion of `root`, if any.
pub fn convert_to_vars(preds: &mut [SatOp], root: Option<&Nominal>) -> Option<Nominal> {
    let mut retval = None;
    for pred in preds.iter_mut() {
        let nv = nominal_to_var(&pred.nominal);
        if root == Some(&pred.nominal) {
            retval = Some(nv.clone());
        }
        pred.nominal = nv;
        if let Term::DiamondOp(d) = &mut pred.arg {
            if let Term::Nom(n) = &mut *d.arg {
                *n = nominal_to_var(n);
            }
        }
    }
    retval
}

fn nominal_to_var(nom: &Nominal) -> Nominal {
    Nominal::var(nom.name.to_uppercase(), 0, nom.ty.clone())
}

// naming prop for a satop: a bare proposition arg, or the leading
// proposition of a conjunction
fn naming_prop(arg: &Term) -> Option<&Proposition> {
    match arg.strip_chunks() {
        Term::Prop(p) => Some(p),
        Term::Op(op) => match op.args.first().map(Term::strip_chunks) {
            Some(Term::Prop(p)) => Some(p),
            _ => None,
        },
        _ => None,
    }
}
