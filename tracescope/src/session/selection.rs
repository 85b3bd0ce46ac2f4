//! Function and tracepoint descriptors and the identity-keyed sets the data
//! manager selects them into.

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use crate::domain::TracepointKind;

/// A function of a loaded module, as reported by the symbol layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub pretty_name: String,
    pub module_path: String,
    /// Address relative to the module's load base. Doubles as the function id.
    pub address: u64,
    pub size: u64,
    pub file: String,
    pub line: u32,
}

impl FunctionInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, module_path: impl Into<String>, address: u64) -> Self {
        let name = name.into();
        Self {
            pretty_name: name.clone(),
            name,
            module_path: module_path.into(),
            address,
            size: 0,
            file: String::new(),
            line: 0,
        }
    }

    /// Name for display: the demangled name when known
    pub fn display_name(&self) -> &str {
        if self.pretty_name.is_empty() {
            &self.name
        } else {
            &self.pretty_name
        }
    }

    fn key(&self) -> FunctionKey {
        FunctionKey { module_path: self.module_path.clone(), address: self.address }
    }
}

/// Two `FunctionInfo`s name the same function when module and address match,
/// whatever their symbol metadata says.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct FunctionKey {
    module_path: String,
    address: u64,
}

/// Set of functions unique by identity (module path + address)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionInfoSet {
    functions: HashMap<FunctionKey, FunctionInfo>,
}

impl FunctionInfoSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a function with the same identity was already present.
    /// The stored descriptor is kept as first inserted.
    pub fn insert(&mut self, function: &FunctionInfo) -> bool {
        let mut inserted = false;
        self.functions.entry(function.key()).or_insert_with(|| {
            inserted = true;
            function.clone()
        });
        inserted
    }

    pub fn remove(&mut self, function: &FunctionInfo) -> bool {
        self.functions.remove(&function.key()).is_some()
    }

    pub fn contains(&self, function: &FunctionInfo) -> bool {
        self.functions.contains_key(&function.key())
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.functions.values()
    }

    /// Copies of the members, ordered by module path then address
    pub fn to_sorted_vec(&self) -> Vec<FunctionInfo> {
        let mut keys: Vec<&FunctionKey> = self.functions.keys().collect();
        keys.sort_unstable();
        keys.into_iter().filter_map(|key| self.functions.get(key)).cloned().collect()
    }
}

/// A kernel tracepoint, identified by `category:name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TracepointInfo {
    pub category: String,
    pub name: String,
}

impl TracepointInfo {
    #[must_use]
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self { category: category.into(), name: name.into() }
    }

    /// The handle capture threads stamp on events of this tracepoint
    #[must_use]
    pub fn kind(&self) -> TracepointKind {
        let mut hasher = FnvHasher::default();
        hasher.write(self.category.as_bytes());
        hasher.write(b":");
        hasher.write(self.name.as_bytes());
        TracepointKind(hasher.finish())
    }
}

pub type TracepointInfoSet = HashSet<TracepointInfo>;
