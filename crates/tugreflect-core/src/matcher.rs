//! Matching queries against scanned candidates.
//!
//! A candidate matches a query when:
//!
//! - its kind equals the query kind,
//! - for a supertype filter, its supertype set contains every required supertype,
//! - for a signature filter, its signature is structurally equal to the required one,
//! - and its annotations satisfy the filter's annotation set (an empty set is a wildcard).
//!
//! Results keep candidate order: files in lexicographic order, then discovery
//! order within each file. A query without matches yields an empty set.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::config::{AnnotationMatch, EngineConfig};
use crate::extractor::ExtractedQueries;
use crate::model::{DeclarationSummary, Filter, MatchSet, Name, Query, Uses};
use crate::scanner::ScannedModule;

/// Whether a candidate's annotations satisfy a filter's annotation set.
pub fn annotations_match(
    required: &BTreeSet<Name>,
    present: &BTreeSet<Name>,
    mode: AnnotationMatch,
) -> bool {
    if required.is_empty() {
        return true;
    }
    match mode {
        AnnotationMatch::All => required.is_subset(present),
        AnnotationMatch::Any => !required.is_disjoint(present),
    }
}

/// Whether `candidate` satisfies `query`.
pub fn matches(query: &Query, candidate: &DeclarationSummary, mode: AnnotationMatch) -> bool {
    if candidate.kind != query.kind {
        return false;
    }
    let shape_ok = match &query.filter {
        Filter::Supertypes(filter) => candidate
            .supertypes()
            .is_some_and(|supertypes| filter.supertypes.is_subset(supertypes)),
        Filter::Signature(filter) => candidate
            .signature()
            .is_some_and(|signature| *signature == filter.signature),
    };
    shape_ok && annotations_match(query.filter.annotations(), &candidate.annotations, mode)
}

/// Match one query against candidates, keeping candidate order.
pub fn match_candidates<'c, I>(query: &Query, candidates: I, mode: AnnotationMatch) -> MatchSet
where
    I: IntoIterator<Item = &'c DeclarationSummary>,
{
    candidates
        .into_iter()
        .filter(|candidate| matches(query, candidate, mode))
        .cloned()
        .collect()
}

/// Matches queries against one module's candidates.
///
/// Results are cached per query, so duplicate call-sites share one computation.
pub struct Matcher<'a> {
    candidates: &'a ScannedModule,
    mode: AnnotationMatch,
    cache: HashMap<Query, MatchSet>,
}

impl<'a> Matcher<'a> {
    pub fn new(candidates: &'a ScannedModule, config: &EngineConfig) -> Self {
        Matcher {
            candidates,
            mode: config.annotation_match,
            cache: HashMap::new(),
        }
    }

    /// Matches for one query.
    pub fn resolve(&mut self, query: &Query) -> &MatchSet {
        let candidates = self.candidates;
        let mode = self.mode;
        self.cache.entry(query.clone()).or_insert_with(|| {
            let found = match_candidates(query, candidates.candidates_of(query.kind), mode);
            debug!(%query, matches = found.len(), "matched query");
            found
        })
    }

    /// Matches for every extracted query, keyed by kind and filter.
    ///
    /// Queries without local matches get no entry, so a dependency's entry for
    /// the same filter is not shadowed when merging.
    pub fn resolve_all(&mut self, queries: &ExtractedQueries) -> Uses {
        let mut uses = Uses::new();
        for query in queries.distinct() {
            let found = self.resolve(query);
            if !found.is_empty() {
                let found = found.clone();
                uses.insert(query, found);
            }
        }
        uses
    }

    /// Number of distinct queries computed so far.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
