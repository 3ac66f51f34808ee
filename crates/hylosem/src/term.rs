//! Hybrid modal logic terms: nominals, propositions, modal operators and
//! satisfaction operators.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::types::SimpleType;

/// Opaque provenance token tying a predication back to the lexical item
/// that introduced it. Passed through the pipeline unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin(pub u32);

/// Membership of one exclusive-disjunction alternative: the predication
/// belongs to alternative `num_in_set` of group `alt_set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Alt {
    pub alt_set: u32,
    pub num_in_set: u32,
}

/// Whether a nominal is a concrete atom or an unbound variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NominalKind {
    Atom,
    Var,
}

/// A nominal: the name of a state in the underlying model.
///
/// Equality covers name, index, kind and type; the `shared` flag is
/// bookkeeping and does not participate. Atoms always carry index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nominal {
    pub name: String,
    pub index: u32,
    pub ty: SimpleType,
    pub kind: NominalKind,
    pub shared: bool,
}

impl Nominal {
    pub fn atom(name: impl Into<String>, ty: SimpleType) -> Nominal {
        Nominal {
            name: name.into(),
            index: 0,
            ty,
            kind: NominalKind::Atom,
            shared: false,
        }
    }

    pub fn var(name: impl Into<String>, index: u32, ty: SimpleType) -> Nominal {
        Nominal {
            name: name.into(),
            index,
            ty,
            kind: NominalKind::Var,
            shared: false,
        }
    }

    pub fn is_atom(&self) -> bool {
        self.kind == NominalKind::Atom
    }

    pub fn is_var(&self) -> bool {
        self.kind == NominalKind::Var
    }

    /// Ordering by name, with atoms preceding variables on a name tie and
    /// variables of the same name ordered by index. Types are ignored, so
    /// this ordering is coarser than equality.
    pub fn compare(&self, other: &Nominal) -> Ordering {
        self.name.cmp(&other.name).then_with(|| {
            match (self.kind, other.kind) {
                (NominalKind::Atom, NominalKind::Atom) => Ordering::Equal,
                (NominalKind::Atom, NominalKind::Var) => Ordering::Less,
                (NominalKind::Var, NominalKind::Atom) => Ordering::Greater,
                (NominalKind::Var, NominalKind::Var) => self.index.cmp(&other.index),
            }
        })
    }

    /// Name with the type appended after a colon, unless the type is `top`.
    pub fn name_with_type(&self) -> String {
        if self.ty.is_top() {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, self.ty.name())
        }
    }
}

impl PartialEq for Nominal {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.index == other.index
            && self.name == other.name
            && self.ty == other.ty
    }
}

impl Eq for Nominal {}

impl Hash for Nominal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.index.hash(state);
        self.name.hash(state);
        self.ty.hash(state);
    }
}

impl fmt::Display for Nominal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NominalKind::Atom => write!(f, "{}", self.name)?,
            NominalKind::Var => write!(f, "{}_{}", self.name, self.index)?,
        }
        if !self.ty.is_top() {
            write!(f, ":{}", self.ty.name())?;
        }
        Ok(())
    }
}

/// A formula variable that may bind to any term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyloVar {
    pub name: String,
    pub index: u32,
    pub ty: SimpleType,
}

impl HyloVar {
    pub fn new(name: impl Into<String>, index: u32, ty: SimpleType) -> HyloVar {
        HyloVar {
            name: name.into(),
            index,
            ty,
        }
    }

    pub fn compare(&self, other: &HyloVar) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialEq for HyloVar {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.index == other.index && self.ty == other.ty
    }
}

impl Eq for HyloVar {}

impl Hash for HyloVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.index.hash(state);
        self.ty.hash(state);
    }
}

impl fmt::Display for HyloVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.index)?;
        if !self.ty.is_top() {
            write!(f, ":{}", self.ty.name())?;
        }
        Ok(())
    }
}

/// A proposition naming a predicate or feature value.
///
/// Equality is by name alone; the optional type is a refinement carried
/// along for unification and does not distinguish propositions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposition {
    pub name: String,
    pub ty: Option<SimpleType>,
}

impl Proposition {
    pub fn new(name: impl Into<String>) -> Proposition {
        Proposition {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: SimpleType) -> Proposition {
        Proposition {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

impl PartialEq for Proposition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Proposition {}

impl Hash for Proposition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A mode variable, standing in for an as-yet-unknown relation label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModeVar {
    pub name: String,
    pub index: u32,
}

impl ModeVar {
    pub fn new(name: impl Into<String>, index: u32) -> ModeVar {
        ModeVar {
            name: name.into(),
            index,
        }
    }

    pub fn compare(&self, other: &ModeVar) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl fmt::Display for ModeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.index)
    }
}

/// The mode (relation label) of a modal operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Label(String),
    Var(ModeVar),
}

impl Mode {
    pub fn label(name: impl Into<String>) -> Mode {
        Mode::Label(name.into())
    }

    /// The label name, if this mode is not a variable.
    pub fn name(&self) -> Option<&str> {
        match self {
            Mode::Label(name) => Some(name),
            Mode::Var(_) => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Label(name) => write!(f, "{}", name),
            Mode::Var(v) => write!(f, "{}", v),
        }
    }
}

/// A modal operator applied to an argument: `<mode>arg` or `[mode]arg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalOp {
    pub mode: Mode,
    pub arg: Box<Term>,
}

impl ModalOp {
    pub fn new(mode: Mode, arg: Term) -> ModalOp {
        ModalOp {
            mode,
            arg: Box::new(arg),
        }
    }
}

/// The connective of an n-ary [`Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Conj,
    Disj,
    Xor,
    Neg,
    Opt,
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Conj => "conj",
            OpKind::Disj => "disj",
            OpKind::Xor => "xor",
            OpKind::Neg => "neg",
            OpKind::Opt => "opt",
        }
    }

    pub fn from_name(name: &str) -> Option<OpKind> {
        match name {
            "conj" => Some(OpKind::Conj),
            "disj" => Some(OpKind::Disj),
            "xor" => Some(OpKind::Xor),
            "neg" => Some(OpKind::Neg),
            "opt" => Some(OpKind::Opt),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            OpKind::Conj => "^",
            OpKind::Disj => "v",
            OpKind::Xor => "v_",
            OpKind::Neg => "~",
            OpKind::Opt => "?",
        }
    }
}

/// An n-ary logical operation.
///
/// Equality requires the same connective and argument count, with every
/// argument of the left operand contained in the right; argument order is
/// not significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Op {
    pub kind: OpKind,
    pub args: Vec<Term>,
}

impl Op {
    pub fn new(kind: OpKind, args: Vec<Term>) -> Op {
        Op { kind, args }
    }

    pub fn conj(args: Vec<Term>) -> Op {
        Op::new(OpKind::Conj, args)
    }

    /// Appends `arg` to this operation, splicing in the arguments of a
    /// conjunction rather than nesting it.
    pub fn append_arg(&mut self, arg: Term) {
        match arg {
            Term::Op(op) if op.kind == OpKind::Conj => self.args.extend(op.args),
            other => self.args.push(other),
        }
    }
}

impl PartialEq for Op {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.args.len() == other.args.len()
            && self.args.iter().all(|a| other.args.contains(a))
    }
}

impl Eq for Op {}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.len() == 1 {
            write!(f, "{}{}", self.kind.symbol(), self.args[0])
        } else {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", self.kind.symbol())?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")
        }
    }
}

/// A satisfaction operator `@nom(arg)`: the formula `arg` holds at the
/// state named by `nom`.
///
/// Equality and hashing cover the nominal and the argument only; the
/// alternative, optionality, chunk and origin bookkeeping is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatOp {
    pub nominal: Nominal,
    pub arg: Term,
    pub alts: Vec<Alt>,
    pub opts: Vec<u32>,
    pub chunks: Vec<u32>,
    pub origin: Option<Origin>,
}

impl SatOp {
    pub fn new(nominal: Nominal, arg: Term) -> SatOp {
        SatOp {
            nominal,
            arg,
            alts: Vec::new(),
            opts: Vec::new(),
            chunks: Vec::new(),
            origin: None,
        }
    }

    /// Deep copy preserving the origin but dropping the alternative,
    /// optionality and chunk bookkeeping.
    pub fn copy(&self) -> SatOp {
        SatOp {
            nominal: self.nominal.clone(),
            arg: self.arg.copy(),
            alts: Vec::new(),
            opts: Vec::new(),
            chunks: Vec::new(),
            origin: self.origin,
        }
    }
}

impl PartialEq for SatOp {
    fn eq(&self, other: &Self) -> bool {
        self.nominal == other.nominal && self.arg == other.arg
    }
}

impl Eq for SatOp {}

impl Hash for SatOp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nominal.hash(state);
        self.arg.hash(state);
    }
}

impl fmt::Display for SatOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if matches!(self.arg.strip_chunks(), Term::Op(_)) {
            write!(f, "@{}{}", self.nominal, self.arg)
        } else {
            write!(f, "@{}({})", self.nominal, self.arg)
        }
    }
}

/// A chunk annotation wrapping a sub-term; transparent to equality,
/// unification and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunked {
    pub chunks: Vec<u32>,
    pub arg: Box<Term>,
}

/// A hybrid logic term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Term {
    Prop(Proposition),
    Nom(Nominal),
    Var(HyloVar),
    BoxOp(ModalOp),
    DiamondOp(ModalOp),
    Op(Op),
    Sat(Box<SatOp>),
    Chunked(Chunked),
}

impl Term {
    pub fn prop(name: impl Into<String>) -> Term {
        Term::Prop(Proposition::new(name))
    }

    pub fn nom(nominal: Nominal) -> Term {
        Term::Nom(nominal)
    }

    pub fn diamond(mode: Mode, arg: Term) -> Term {
        Term::DiamondOp(ModalOp::new(mode, arg))
    }

    pub fn boxed(mode: Mode, arg: Term) -> Term {
        Term::BoxOp(ModalOp::new(mode, arg))
    }

    pub fn conj(args: Vec<Term>) -> Term {
        Term::Op(Op::conj(args))
    }

    pub fn satop(nominal: Nominal, arg: Term) -> Term {
        Term::Sat(Box::new(SatOp::new(nominal, arg)))
    }

    pub fn chunked(chunks: Vec<u32>, arg: Term) -> Term {
        Term::Chunked(Chunked {
            chunks,
            arg: Box::new(arg),
        })
    }

    /// The term beneath any chunk annotations.
    pub fn strip_chunks(&self) -> &Term {
        let mut t = self;
        while let Term::Chunked(c) = t {
            t = &c.arg;
        }
        t
    }

    /// Deep copy with all chunk, alternative and optionality bookkeeping
    /// dropped; origins are preserved.
    pub fn copy(&self) -> Term {
        match self {
            Term::Prop(p) => Term::Prop(p.clone()),
            Term::Nom(n) => Term::Nom(n.clone()),
            Term::Var(v) => Term::Var(v.clone()),
            Term::BoxOp(m) => Term::BoxOp(ModalOp::new(m.mode.clone(), m.arg.copy())),
            Term::DiamondOp(m) => Term::DiamondOp(ModalOp::new(m.mode.clone(), m.arg.copy())),
            Term::Op(op) => Term::Op(Op::new(
                op.kind,
                op.args.iter().map(Term::copy).collect(),
            )),
            Term::Sat(s) => Term::Sat(Box::new(s.copy())),
            Term::Chunked(c) => c.arg.copy(),
        }
    }

    /// Applies `f` to every sub-term in post-order, children first.
    pub fn deep_map(&mut self, f: &mut dyn FnMut(&mut Term)) {
        match self {
            Term::Prop(_) | Term::Nom(_) | Term::Var(_) => {}
            Term::BoxOp(m) | Term::DiamondOp(m) => m.arg.deep_map(f),
            Term::Op(op) => {
                for arg in &mut op.args {
                    arg.deep_map(f);
                }
            }
            Term::Sat(s) => s.arg.deep_map(f),
            Term::Chunked(c) => c.arg.deep_map(f),
        }
        f(self);
    }

    pub fn as_nominal(&self) -> Option<&Nominal> {
        match self.strip_chunks() {
            Term::Nom(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_satop(&self) -> Option<&SatOp> {
        match self.strip_chunks() {
            Term::Sat(s) => Some(s),
            _ => None,
        }
    }
}

impl From<SatOp> for Term {
    fn from(satop: SatOp) -> Term {
        Term::Sat(Box::new(satop))
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self.strip_chunks(), other.strip_chunks()) {
            (Term::Prop(a), Term::Prop(b)) => a == b,
            (Term::Nom(a), Term::Nom(b)) => a == b,
            (Term::Var(a), Term::Var(b)) => a == b,
            (Term::BoxOp(a), Term::BoxOp(b)) => a == b,
            (Term::DiamondOp(a), Term::DiamondOp(b)) => a == b,
            (Term::Op(a), Term::Op(b)) => a == b,
            (Term::Sat(a), Term::Sat(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Term {}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.strip_chunks() {
            Term::Prop(p) => {
                0u8.hash(state);
                p.hash(state);
            }
            Term::Nom(n) => {
                1u8.hash(state);
                n.hash(state);
            }
            Term::Var(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Term::BoxOp(m) => {
                3u8.hash(state);
                m.mode.hash(state);
                m.arg.hash(state);
            }
            Term::DiamondOp(m) => {
                4u8.hash(state);
                m.mode.hash(state);
                m.arg.hash(state);
            }
            Term::Op(op) => {
                // order-insensitive over args, matching Op equality
                5u8.hash(state);
                op.kind.hash(state);
                let sum = op
                    .args
                    .iter()
                    .fold(0u64, |acc, a| acc.wrapping_add(hash_of(a)));
                sum.hash(state);
            }
            Term::Sat(s) => {
                6u8.hash(state);
                s.hash(state);
            }
            Term::Chunked(_) => unreachable!("strip_chunks returned a chunked term"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Prop(p) => write!(f, "{}", p),
            Term::Nom(n) => write!(f, "{}", n),
            Term::Var(v) => write!(f, "{}", v),
            Term::BoxOp(m) => write!(f, "[{}]{}", m.mode, m.arg),
            Term::DiamondOp(m) => write!(f, "<{}>{}", m.mode, m.arg),
            Term::Op(op) => write!(f, "{}", op),
            Term::Sat(s) => write!(f, "{}", s),
            Term::Chunked(c) => write!(f, "{}", c.arg),
        }
    }
}
