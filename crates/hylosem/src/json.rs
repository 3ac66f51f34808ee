//! JSON reading and writing of terms.
//!
//! Terms are exchanged as tagged JSON elements. A document is an `lf`
//! element whose children are the top-level predications; several
//! children imply a conjunction. Nominal and variable names may carry a
//! type suffix (`"x1:anim"`), resolved against a [`TypeHierarchy`] on
//! input.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuralError};
use crate::term::{
    Chunked, ModalOp, Mode, ModeVar, Nominal, Op, OpKind, Proposition, SatOp, Term,
};
use crate::types::TypeHierarchy;

/// One serialized term element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "lowercase")]
pub enum LfJson {
    Lf {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LfJson>,
    },
    Satop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nom: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nomvar: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        shared: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LfJson>,
    },
    Op {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LfJson>,
    },
    #[serde(alias = "d")]
    Diamond {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LfJson>,
    },
    #[serde(alias = "b")]
    Box {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<LfJson>,
    },
    Nom {
        name: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        shared: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
    },
    Nomvar {
        name: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        shared: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
    },
    Prop {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
    },
    Var {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        chunks: Vec<u32>,
    },
    Mode {
        name: String,
    },
    Modevar {
        name: String,
    },
}

/// Reads a term from a JSON string, creating any named types in the
/// hierarchy.
pub fn read_lf(json: &str, types: &mut TypeHierarchy) -> Result<Term> {
    let parsed: LfJson = serde_json::from_str(json)?;
    from_json(&parsed, types)
}

/// Writes a term as a JSON string, wrapped in an `lf` element.
pub fn write_lf(lf: &Term) -> Result<String> {
    let json = LfJson::Lf {
        children: top_children(lf),
    };
    Ok(serde_json::to_string(&json)?)
}

/// Builds a term from a parsed element.
pub fn from_json(json: &LfJson, types: &mut TypeHierarchy) -> Result<Term> {
    match json {
        LfJson::Lf { children } => {
            let args = child_terms(children, types)?;
            implicit_conj(args, json)
        }
        LfJson::Satop {
            nom,
            nomvar,
            shared,
            chunks,
            children,
        } => {
            let nominal = match (nom, nomvar) {
                (Some(name), None) => parse_nominal(name, false, *shared, types),
                (None, Some(name)) => parse_nominal(name, true, *shared, types),
                _ => {
                    return Err(StructuralError::InvalidElement(
                        "satop needs exactly one of nom and nomvar".into(),
                    ))
                }
            };
            let arg = implicit_conj(child_terms(children, types)?, json)?;
            let mut satop = SatOp::new(nominal, arg);
            satop.chunks = chunks.clone();
            Ok(Term::Sat(Box::new(satop)))
        }
        LfJson::Op {
            name,
            chunks,
            children,
        } => {
            let kind = OpKind::from_name(name).ok_or_else(|| {
                StructuralError::InvalidElement(format!("unknown op name: {}", name))
            })?;
            let mut args = child_terms(children, types)?;
            // single-argument ops absorb extra children as a conjunction
            if matches!(kind, OpKind::Neg | OpKind::Opt) && args.len() > 1 {
                args = vec![Term::Op(Op::conj(args))];
            }
            with_chunks(Term::Op(Op::new(kind, args)), chunks)
        }
        LfJson::Diamond {
            mode,
            chunks,
            children,
        } => {
            let (mode, args) = parse_modal(mode.as_deref(), children, types)?;
            let arg = implicit_conj(args, json)?;
            with_chunks(Term::DiamondOp(ModalOp::new(mode, arg)), chunks)
        }
        LfJson::Box { .. } => Err(StructuralError::UnsupportedBox),
        LfJson::Nom {
            name,
            shared,
            chunks,
        } => with_chunks(
            Term::Nom(parse_nominal(name, false, *shared, types)),
            chunks,
        ),
        LfJson::Nomvar {
            name,
            shared,
            chunks,
        } => with_chunks(
            Term::Nom(parse_nominal(name, true, *shared, types)),
            chunks,
        ),
        LfJson::Prop { name, chunks } => {
            let (name, ty) = split_type(name);
            let prop = match ty.and_then(|t| types.get(t)) {
                Some(st) => Proposition::typed(name, st),
                None => Proposition::new(name),
            };
            with_chunks(Term::Prop(prop), chunks)
        }
        LfJson::Var { name, chunks } => {
            let (name, ty) = split_type(name);
            let ty = match ty {
                Some(t) => types.get_or_create(t),
                None => types.top(),
            };
            with_chunks(
                Term::Var(crate::term::HyloVar::new(name, 0, ty)),
                chunks,
            )
        }
        LfJson::Mode { .. } | LfJson::Modevar { .. } => Err(StructuralError::InvalidElement(
            "mode element outside a modal operator".into(),
        )),
    }
}

/// Serializes a term as an element.
pub fn to_json(lf: &Term) -> LfJson {
    match lf {
        Term::Prop(p) => LfJson::Prop {
            name: match &p.ty {
                Some(ty) if !ty.is_top() => format!("{}:{}", p.name, ty.name()),
                _ => p.name.clone(),
            },
            chunks: Vec::new(),
        },
        Term::Nom(n) => {
            let name = n.name_with_type();
            if n.is_atom() {
                LfJson::Nom {
                    name,
                    shared: n.shared,
                    chunks: Vec::new(),
                }
            } else {
                LfJson::Nomvar {
                    name,
                    shared: n.shared,
                    chunks: Vec::new(),
                }
            }
        }
        Term::Var(v) => LfJson::Var {
            name: if v.ty.is_top() {
                v.name.clone()
            } else {
                format!("{}:{}", v.name, v.ty.name())
            },
            chunks: Vec::new(),
        },
        Term::DiamondOp(m) => {
            let (mode, mut children) = mode_parts(&m.mode);
            children.extend(arg_children(&m.arg));
            LfJson::Diamond {
                mode,
                chunks: Vec::new(),
                children,
            }
        }
        Term::BoxOp(m) => {
            let (mode, mut children) = mode_parts(&m.mode);
            children.extend(arg_children(&m.arg));
            LfJson::Box {
                mode,
                chunks: Vec::new(),
                children,
            }
        }
        Term::Op(op) => LfJson::Op {
            name: op.kind.name().to_string(),
            chunks: Vec::new(),
            children: op.args.iter().map(to_json).collect(),
        },
        Term::Sat(s) => {
            let name = s.nominal.name_with_type();
            let (nom, nomvar) = if s.nominal.is_atom() {
                (Some(name), None)
            } else {
                (None, Some(name))
            };
            LfJson::Satop {
                nom,
                nomvar,
                shared: s.nominal.shared,
                chunks: s.chunks.clone(),
                children: arg_children(&s.arg),
            }
        }
        Term::Chunked(c) => {
            let mut inner = to_json(&c.arg);
            set_chunks(&mut inner, c.chunks.clone());
            inner
        }
    }
}

// conj children are written flat under conj-implying parents
fn arg_children(arg: &Term) -> Vec<LfJson> {
    match arg.strip_chunks() {
        Term::Op(op) if op.kind == OpKind::Conj => op.args.iter().map(to_json).collect(),
        _ => vec![to_json(arg)],
    }
}

fn top_children(lf: &Term) -> Vec<LfJson> {
    match lf.strip_chunks() {
        Term::Op(op) if op.kind == OpKind::Conj => op.args.iter().map(to_json).collect(),
        _ => vec![to_json(lf)],
    }
}

fn mode_parts(mode: &Mode) -> (Option<String>, Vec<LfJson>) {
    match mode {
        Mode::Label(name) => (Some(name.clone()), Vec::new()),
        Mode::Var(v) => (
            None,
            vec![LfJson::Modevar {
                name: v.name.clone(),
            }],
        ),
    }
}

fn set_chunks(json: &mut LfJson, marks: Vec<u32>) {
    match json {
        LfJson::Satop { chunks, .. }
        | LfJson::Op { chunks, .. }
        | LfJson::Diamond { chunks, .. }
        | LfJson::Box { chunks, .. }
        | LfJson::Nom { chunks, .. }
        | LfJson::Nomvar { chunks, .. }
        | LfJson::Prop { chunks, .. }
        | LfJson::Var { chunks, .. } => *chunks = marks,
        LfJson::Lf { .. } | LfJson::Mode { .. } | LfJson::Modevar { .. } => {}
    }
}

fn child_terms(children: &[LfJson], types: &mut TypeHierarchy) -> Result<Vec<Term>> {
    children.iter().map(|c| from_json(c, types)).collect()
}

fn implicit_conj(mut args: Vec<Term>, json: &LfJson) -> Result<Term> {
    match args.len() {
        0 => Err(StructuralError::InvalidElement(format!(
            "{} element with no children",
            element_name(json)
        ))),
        1 => Ok(args.remove(0)),
        _ => Ok(Term::Op(Op::conj(args))),
    }
}

fn element_name(json: &LfJson) -> &'static str {
    match json {
        LfJson::Lf { .. } => "lf",
        LfJson::Satop { .. } => "satop",
        LfJson::Op { .. } => "op",
        LfJson::Diamond { .. } => "diamond",
        LfJson::Box { .. } => "box",
        LfJson::Nom { .. } => "nom",
        LfJson::Nomvar { .. } => "nomvar",
        LfJson::Prop { .. } => "prop",
        LfJson::Var { .. } => "var",
        LfJson::Mode { .. } => "mode",
        LfJson::Modevar { .. } => "modevar",
    }
}

// a modal operator takes its mode from the attribute or from a leading
// modevar child
fn parse_modal(
    mode: Option<&str>,
    children: &[LfJson],
    types: &mut TypeHierarchy,
) -> Result<(Mode, Vec<Term>)> {
    if let Some(label) = mode {
        return Ok((Mode::label(label), child_terms(children, types)?));
    }
    match children.split_first() {
        Some((LfJson::Modevar { name }, rest)) => Ok((
            Mode::Var(ModeVar::new(name.clone(), 0)),
            child_terms(rest, types)?,
        )),
        _ => Err(StructuralError::InvalidElement(
            "modal operator without a mode".into(),
        )),
    }
}

fn parse_nominal(name: &str, var: bool, shared: bool, types: &mut TypeHierarchy) -> Nominal {
    let (name, ty) = split_type(name);
    let ty = match ty {
        Some(t) => types.get_or_create(t),
        None => types.top(),
    };
    let mut nominal = if var {
        Nominal::var(name, 0, ty)
    } else {
        Nominal::atom(name, ty)
    };
    nominal.shared = shared;
    nominal
}

fn split_type(name: &str) -> (&str, Option<&str>) {
    match name.split_once(':') {
        Some((n, t)) => (n, Some(t)),
        None => (name, None),
    }
}

// a chunk attribute wraps the parsed term
fn with_chunks(term: Term, chunks: &[u32]) -> Result<Term> {
    if chunks.is_empty() {
        Ok(term)
    } else {
        Ok(Term::Chunked(Chunked {
            chunks: chunks.to_vec(),
            arg: Box::new(term),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SimpleType;

    fn read(json: &str) -> Term {
        let mut types = TypeHierarchy::new();
        read_lf(json, &mut types).unwrap()
    }

    #[test]
    fn reads_a_nested_term() {
        let lf = read(
            r#"{"element":"lf","children":[
                {"element":"satop","nom":"x1","children":[
                    {"element":"prop","name":"run"},
                    {"element":"diamond","mode":"Subj","children":[
                        {"element":"nom","name":"x2"},
                        {"element":"prop","name":"dog"}]}]}]}"#,
        );
        assert_eq!(lf.to_string(), "@x1(run ^ <Subj>(x2 ^ dog))");
    }

    #[test]
    fn multiple_lf_children_imply_a_conjunction() {
        let lf = read(
            r#"{"element":"lf","children":[
                {"element":"satop","nom":"x1","children":[{"element":"prop","name":"a"}]},
                {"element":"satop","nom":"x2","children":[{"element":"prop","name":"b"}]}]}"#,
        );
        assert_eq!(lf.to_string(), "(@x1(a) ^ @x2(b))");
    }

    #[test]
    fn typed_names_resolve_against_the_hierarchy() {
        let mut types = TypeHierarchy::new();
        let lf = read_lf(
            r#"{"element":"lf","children":[
                {"element":"satop","nomvar":"X1:anim","children":[
                    {"element":"prop","name":"dog"}]}]}"#,
            &mut types,
        )
        .unwrap();
        assert!(types.get("anim").is_some());
        assert_eq!(lf.to_string(), "@X1_0:anim(dog)");
    }

    #[test]
    fn prop_types_are_not_created() {
        let mut types = TypeHierarchy::new();
        let lf = read_lf(
            r#"{"element":"lf","children":[
                {"element":"satop","nom":"x1","children":[
                    {"element":"prop","name":"dog:anim"}]}]}"#,
            &mut types,
        )
        .unwrap();
        assert!(types.get("anim").is_none());
        assert_eq!(lf.to_string(), "@x1(dog)");
    }

    #[test]
    fn diamond_alias_and_modevar_child() {
        let lf = read(
            r#"{"element":"lf","children":[
                {"element":"satop","nom":"x1","children":[
                    {"element":"d","children":[
                        {"element":"modevar","name":"M"},
                        {"element":"prop","name":"p"}]}]}]}"#,
        );
        assert_eq!(lf.to_string(), "@x1(<M_0>p)");
    }

    #[test]
    fn box_elements_do_not_deserialize() {
        let mut types = TypeHierarchy::new();
        let err = read_lf(
            r#"{"element":"b","mode":"Mod","children":[{"element":"prop","name":"p"}]}"#,
            &mut types,
        )
        .unwrap_err();
        assert!(matches!(err, StructuralError::UnsupportedBox));
    }

    #[test]
    fn box_terms_still_serialize() {
        let lf = Term::boxed(Mode::label("Mod"), Term::prop("p"));
        let json = serde_json::to_string(&to_json(&lf)).unwrap();
        assert!(json.contains(r#""element":"box""#), "got {json}");
    }

    #[test]
    fn chunk_attribute_wraps_the_term() {
        let lf = read(
            r#"{"element":"lf","children":[
                {"element":"satop","nom":"x1","children":[
                    {"element":"prop","name":"run","chunks":[0,1]}]}]}"#,
        );
        match lf {
            Term::Sat(s) => match &s.arg {
                Term::Chunked(c) => assert_eq!(c.chunks, vec![0, 1]),
                other => panic!("expected chunked arg, got {other}"),
            },
            other => panic!("expected satop, got {other}"),
        }
    }

    #[test]
    fn opt_with_several_children_gets_an_implicit_conj() {
        let lf = read(
            r#"{"element":"lf","children":[
                {"element":"satop","nom":"x1","children":[
                    {"element":"op","name":"opt","children":[
                        {"element":"prop","name":"a"},
                        {"element":"prop","name":"b"}]}]}]}"#,
        );
        match lf {
            Term::Sat(s) => match &s.arg {
                Term::Op(op) => {
                    assert_eq!(op.kind, OpKind::Opt);
                    assert_eq!(op.args.len(), 1);
                    assert!(matches!(&op.args[0], Term::Op(inner) if inner.kind == OpKind::Conj));
                }
                other => panic!("expected op arg, got {other}"),
            },
            other => panic!("expected satop, got {other}"),
        }
    }

    #[test]
    fn round_trips_through_json() {
        let original = Term::satop(
            Nominal::atom("x1", SimpleType::top()),
            Term::conj(vec![
                Term::prop("run"),
                Term::diamond(
                    Mode::label("Subj"),
                    Term::conj(vec![
                        Term::nom(Nominal::atom("x2", SimpleType::top())),
                        Term::prop("dog"),
                    ]),
                ),
            ]),
        );
        let json = write_lf(&original).unwrap();
        let mut types = TypeHierarchy::new();
        let reread = read_lf(&json, &mut types).unwrap();
        assert_eq!(reread, original);
    }

    #[test]
    fn shared_flag_round_trips() {
        let mut nom = Nominal::atom("x2", SimpleType::top());
        nom.shared = true;
        let original = Term::satop(
            Nominal::atom("x1", SimpleType::top()),
            Term::diamond(Mode::label("Mod"), Term::nom(nom)),
        );
        let json = write_lf(&original).unwrap();
        assert!(json.contains(r#""shared":true"#), "got {json}");
        let mut types = TypeHierarchy::new();
        let reread = read_lf(&json, &mut types).unwrap();
        match reread.strip_chunks() {
            Term::Sat(s) => match s.arg.strip_chunks() {
                Term::DiamondOp(d) => match d.arg.strip_chunks() {
                    Term::Nom(n) => assert!(n.shared),
                    other => panic!("expected nominal, got {other}"),
                },
                other => panic!("expected diamond, got {other}"),
            },
            other => panic!("expected satop, got {other}"),
        }
    }
}
