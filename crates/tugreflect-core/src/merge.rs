//! Merging local and dependency match results.
//!
//! The local module's uses are inserted first, then each dependency's in
//! declared dependency order. For every `(Kind, Filter)` key the first match
//! set inserted wins; later entries for the same key are discarded whole, never
//! unioned. A module's own matches therefore shadow a dependency's, and earlier
//! dependencies shadow later ones.

use std::collections::btree_map::Entry;

use serde::Serialize;
use tracing::debug;

use crate::model::{Filter, Kind, MatchSet, Query, Uses};

/// Final per-run index from query to matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedIndex {
    uses: Uses,
}

impl MergedIndex {
    /// Matches for a query, if any module recorded it.
    pub fn get(&self, query: &Query) -> Option<&MatchSet> {
        self.uses.get(query)
    }

    pub fn uses(&self) -> &Uses {
        &self.uses
    }

    pub fn into_uses(self) -> Uses {
        self.uses
    }

    pub fn len(&self) -> usize {
        self.uses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Kind, &Filter, &MatchSet)> {
        self.uses.iter()
    }
}

/// Merge local uses with dependency uses, first insertion winning.
pub fn merge<'a, I>(local: &Uses, dependencies: I) -> MergedIndex
where
    I: IntoIterator<Item = &'a Uses>,
{
    let mut merged = local.clone();
    let mut shadowed = 0usize;
    for (position, dependency) in dependencies.into_iter().enumerate() {
        for (kind, filter, matches) in dependency.iter() {
            match merged.of_kind_mut(kind).entry(filter.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(matches.clone());
                }
                Entry::Occupied(_) => {
                    shadowed += 1;
                    debug!(dependency = position, %kind, %filter, "entry shadowed by earlier match set");
                }
            }
        }
    }
    debug!(entries = merged.len(), shadowed, "merged uses");
    MergedIndex { uses: merged }
}
