//! Simple type hierarchy with greatest-lower-bound lookup.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the universal type at the root of every hierarchy.
pub const TOP_TYPE: &str = "top";

/// An atomic semantic type.
///
/// Types are identified by their insertion index in the owning
/// [`TypeHierarchy`]; the name travels along for display and
/// serialization. Index 0 is always the universal type `top`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleType {
    index: u32,
    name: String,
}

impl SimpleType {
    /// The universal type, present in every hierarchy at index 0.
    pub fn top() -> SimpleType {
        SimpleType {
            index: 0,
            name: TOP_TYPE.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_top(&self) -> bool {
        self.index == 0
    }
}

impl PartialEq for SimpleType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for SimpleType {}

impl std::hash::Hash for SimpleType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A hierarchy of [`SimpleType`]s ordered by declaration.
///
/// Declaration order matters: a type declared earlier is considered more
/// general than one declared later, and [`TypeHierarchy::meet`] resolves
/// ties by picking the earliest-declared common member. Parents must be
/// declared before their children.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    types: Vec<SimpleType>,
    lookup: HashMap<String, u32>,
    // per type: indices of the type itself plus all (transitive) subtypes
    closures: Vec<HashSet<u32>>,
    parents: Vec<Vec<u32>>,
}

impl TypeHierarchy {
    /// Creates a hierarchy containing only `top`.
    pub fn new() -> TypeHierarchy {
        let mut hier = TypeHierarchy {
            types: Vec::new(),
            lookup: HashMap::new(),
            closures: Vec::new(),
            parents: Vec::new(),
        };
        hier.push(TOP_TYPE.to_string(), Vec::new());
        hier
    }

    fn push(&mut self, name: String, parent_ids: Vec<u32>) -> u32 {
        let index = self.types.len() as u32;
        self.lookup.insert(name.clone(), index);
        self.types.push(SimpleType { index, name });
        let mut closure = HashSet::new();
        closure.insert(index);
        self.closures.push(closure);
        // record in every ancestor's closure, top included
        let mut queue: Vec<u32> = parent_ids.clone();
        if index != 0 {
            queue.push(0);
        }
        let mut seen = HashSet::new();
        while let Some(p) = queue.pop() {
            if !seen.insert(p) {
                continue;
            }
            self.closures[p as usize].insert(index);
            queue.extend(self.parents[p as usize].iter().copied());
        }
        self.parents.push(parent_ids);
        index
    }

    /// Declares `name` as a subtype of each named parent. Unknown parents
    /// are created directly under `top`. Redeclaring an existing type
    /// returns it unchanged.
    pub fn declare(&mut self, name: &str, parent_names: &[&str]) -> SimpleType {
        if let Some(&i) = self.lookup.get(name) {
            return self.types[i as usize].clone();
        }
        let mut parent_ids = Vec::with_capacity(parent_names.len());
        for p in parent_names {
            let pid = match self.lookup.get(*p) {
                Some(&i) => i,
                None => self.push((*p).to_string(), Vec::new()),
            };
            parent_ids.push(pid);
        }
        let index = self.push(name.to_string(), parent_ids);
        self.types[index as usize].clone()
    }

    /// Looks up a type by name.
    pub fn get(&self, name: &str) -> Option<SimpleType> {
        self.lookup.get(name).map(|&i| self.types[i as usize].clone())
    }

    /// Looks up a type by name, creating it under `top` if absent.
    pub fn get_or_create(&mut self, name: &str) -> SimpleType {
        self.declare(name, &[])
    }

    pub fn top(&self) -> SimpleType {
        self.types[0].clone()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Most general common subtype of `a` and `b`, or `None` when their
    /// subtype closures are disjoint. When one type subsumes the other
    /// the more specific of the two is returned.
    pub fn meet(&self, a: &SimpleType, b: &SimpleType) -> Option<SimpleType> {
        if a == b {
            return Some(a.clone());
        }
        let ca = self.closures.get(a.index as usize)?;
        let cb = self.closures.get(b.index as usize)?;
        ca.intersection(cb)
            .min()
            .map(|&i| self.types[i as usize].clone())
    }
}
