//! Supertype closure over declared supertype edges.
//!
//! A [`TypeHierarchy`] maps a class name to its direct supertypes. Edges come
//! from the module being scanned and, optionally, from the flattened hierarchy
//! each dependency published in its metadata. Closure is a plain reachability
//! walk; unlike a method resolution order there is no linearization, because
//! matching only needs set membership.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use tugreflect_core::hierarchy::TypeHierarchy;
//!
//! let mut hierarchy = TypeHierarchy::new();
//! hierarchy.add_edges("a.C", ["a.B"]);
//! hierarchy.add_edges("a.B", ["a.A"]);
//!
//! let closed = hierarchy.supertypes_of("a.C");
//! assert_eq!(closed, BTreeSet::from(["a.A".to_string(), "a.B".to_string()]));
//! ```
//!
//! # Limitations
//!
//! - Type arguments are erased: `List<Int>` and `List<String>` are the same edge.
//! - A dependency's supertypes are only as deep as that dependency flattened them.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::Name;

/// Declared supertype edges with transitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHierarchy {
    edges: BTreeMap<Name, BTreeSet<Name>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        TypeHierarchy::default()
    }

    /// Add direct supertype edges for `child`, merging with existing ones.
    pub fn add_edges<I>(&mut self, child: &str, supertypes: I)
    where
        I: IntoIterator,
        I::Item: Into<Name>,
    {
        self.edges
            .entry(child.to_string())
            .or_default()
            .extend(supertypes.into_iter().map(Into::into));
    }

    /// Merge a hierarchy published by a dependency.
    ///
    /// Published entries are already flattened, so each becomes a set of edges
    /// from the class straight to every supertype it had in that module.
    pub fn extend_published(&mut self, published: &BTreeMap<Name, BTreeSet<Name>>) {
        for (child, supertypes) in published {
            self.add_edges(child, supertypes.iter().cloned());
        }
    }

    /// Whether any edges are known for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Number of classes with known edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Transitive supertypes of a named class, excluding the class itself.
    pub fn supertypes_of(&self, name: &str) -> BTreeSet<Name> {
        match self.edges.get(name) {
            Some(direct) => self.close(direct),
            None => BTreeSet::new(),
        }
    }

    /// Close a set of direct supertypes: the set plus everything reachable from it.
    ///
    /// Cyclic edges terminate because each name is expanded once.
    pub fn close(&self, direct: &BTreeSet<Name>) -> BTreeSet<Name> {
        let mut closed: BTreeSet<Name> = BTreeSet::new();
        let mut pending: Vec<&Name> = direct.iter().collect();
        while let Some(name) = pending.pop() {
            if !closed.insert(name.clone()) {
                continue;
            }
            if let Some(next) = self.edges.get(name) {
                pending.extend(next.iter().filter(|n| !closed.contains(*n)));
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<Name> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_closure_single_level() {
        let mut h = TypeHierarchy::new();
        h.add_edges("a.C", ["a.I"]);
        assert_eq!(h.supertypes_of("a.C"), set(&["a.I"]));
    }

    #[test]
    fn test_closure_deep_chain() {
        let mut h = TypeHierarchy::new();
        h.add_edges("D", ["C"]);
        h.add_edges("C", ["B"]);
        h.add_edges("B", ["A"]);
        assert_eq!(h.supertypes_of("D"), set(&["A", "B", "C"]));
    }

    #[test]
    fn test_closure_diamond() {
        let mut h = TypeHierarchy::new();
        h.add_edges("D", ["B", "C"]);
        h.add_edges("B", ["A"]);
        h.add_edges("C", ["A"]);
        assert_eq!(h.supertypes_of("D"), set(&["A", "B", "C"]));
    }

    #[test]
    fn test_closure_terminates_on_cycle() {
        let mut h = TypeHierarchy::new();
        h.add_edges("A", ["B"]);
        h.add_edges("B", ["A"]);
        assert_eq!(h.supertypes_of("A"), set(&["A", "B"]));
    }

    #[test]
    fn test_unknown_class_has_no_supertypes() {
        let h = TypeHierarchy::new();
        assert!(h.supertypes_of("Missing").is_empty());
        assert!(!h.contains("Missing"));
    }

    #[test]
    fn test_close_keeps_unknown_direct_names() {
        let mut h = TypeHierarchy::new();
        h.add_edges("lib.B", ["lib.A"]);
        assert_eq!(
            h.close(&set(&["lib.B", "ext.X"])),
            set(&["ext.X", "lib.A", "lib.B"])
        );
    }

    #[test]
    fn test_published_edges_extend_local_closure() {
        let mut published = BTreeMap::new();
        published.insert("lib.B".to_string(), set(&["lib.A", "kotlin.Any"]));

        let mut h = TypeHierarchy::new();
        h.add_edges("app.C", ["lib.B"]);
        assert_eq!(h.supertypes_of("app.C"), set(&["lib.B"]));

        h.extend_published(&published);
        assert_eq!(
            h.supertypes_of("app.C"),
            set(&["kotlin.Any", "lib.A", "lib.B"])
        );
    }

    #[test]
    fn test_add_edges_merges() {
        let mut h = TypeHierarchy::new();
        h.add_edges("C", ["A"]);
        h.add_edges("C", ["B"]);
        assert_eq!(h.supertypes_of("C"), set(&["A", "B"]));
        assert_eq!(h.len(), 1);
    }
}
