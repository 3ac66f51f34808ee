//! Variable substitutions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::term::{HyloVar, Mode, ModeVar, Nominal, NominalKind, Term};

use super::{fill, fill_mode};

/// Which family of variables a [`VarKey`] identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Hylo,
    Nominal,
    Mode,
}

/// Identity of a variable for substitution lookup: kind, name, index and
/// type. Two variables that differ in any component are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarKey {
    pub kind: VarKind,
    pub name: String,
    pub index: u32,
    pub ty: u32,
}

impl VarKey {
    pub fn hylo(var: &HyloVar) -> VarKey {
        VarKey {
            kind: VarKind::Hylo,
            name: var.name.clone(),
            index: var.index,
            ty: var.ty.index(),
        }
    }

    /// Key for a nominal variable. Nominal atoms are constants and have
    /// no key.
    pub fn nominal(nom: &Nominal) -> Option<VarKey> {
        match nom.kind {
            NominalKind::Var => Some(VarKey {
                kind: VarKind::Nominal,
                name: nom.name.clone(),
                index: nom.index,
                ty: nom.ty.index(),
            }),
            NominalKind::Atom => None,
        }
    }

    pub fn mode(var: &ModeVar) -> VarKey {
        VarKey {
            kind: VarKind::Mode,
            name: var.name.clone(),
            index: var.index,
            ty: 0,
        }
    }
}

/// A self-condensing substitution: values are filled against the current
/// bindings as they are inserted, so stored values never mention a
/// variable that already has a binding at insertion time.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    terms: IndexMap<VarKey, Term>,
    modes: IndexMap<VarKey, Mode>,
}

impl Substitution {
    pub fn new() -> Substitution {
        Substitution::default()
    }

    pub fn get(&self, key: &VarKey) -> Option<&Term> {
        self.terms.get(key)
    }

    pub fn get_mode(&self, key: &VarKey) -> Option<&Mode> {
        self.modes.get(key)
    }

    /// Binds `key` to `value`, condensing the value against the current
    /// bindings first, and returns the stored value.
    pub fn bind(&mut self, key: VarKey, value: Term) -> Term {
        let value = fill(&value, self);
        self.terms.insert(key, value.clone());
        value
    }

    pub fn bind_mode(&mut self, key: VarKey, value: Mode) -> Mode {
        let value = fill_mode(&value, self);
        self.modes.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.terms.len() + self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarKey, &Term)> {
        self.terms.iter()
    }
}
