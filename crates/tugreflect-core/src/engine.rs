//! One-module resolution pipeline.
//!
//! ```text
//! load dependency artifacts -> scan -> extract -> match -> persist -> merge
//! ```
//!
//! Scanning and extraction both complete before any query is matched, so a
//! query can be satisfied by a declaration discovered later in file order.
//! Every stage runs inside its own `tracing` span.
//!
//! Recoverable problems are collected as diagnostics on the [`Resolution`].
//! A missing or corrupt dependency artifact aborts the pass.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, info_span};

use crate::codec::{read_artifact, write_artifact};
use crate::config::{ClosureMode, EngineConfig};
use crate::diagnostics::Diagnostics;
use crate::error::EngineError;
use crate::extractor::{extract_queries, ExtractedQueries};
use crate::matcher::Matcher;
use crate::merge::{merge, MergedIndex};
use crate::model::{MatchSet, ModuleMetadata, Query};
use crate::scanner::{ScannedModule, Scanner};
use crate::tree::ModuleTree;
use crate::types::{FileId, Location};

// ============================================================================
// Results
// ============================================================================

/// A call-site together with the matches its query resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSite {
    pub file: FileId,
    pub location: Location,
    pub query: Query,
    pub matches: MatchSet,
}

/// Local analysis of one module, before persistence and merge.
#[derive(Debug, Clone)]
pub struct ModuleAnalysis {
    pub scanned: ScannedModule,
    pub queries: ExtractedQueries,
    pub metadata: ModuleMetadata,
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Metadata of the resolved module (local uses only).
    pub metadata: ModuleMetadata,
    /// Local uses merged with dependency uses.
    pub index: MergedIndex,
    /// Call-sites in file, then source order.
    pub sites: Vec<ResolvedSite>,
    pub diagnostics: Diagnostics,
    /// Path of the written artifact, if metadata was saved.
    pub artifact: Option<PathBuf>,
}

impl Resolution {
    /// Empty outcome for a disabled engine.
    fn disabled(module: &str) -> Self {
        Resolution {
            metadata: ModuleMetadata::new(module),
            index: MergedIndex::default(),
            sites: Vec::new(),
            diagnostics: Diagnostics::new(),
            artifact: None,
        }
    }

    pub fn module(&self) -> &str {
        &self.metadata.module
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Resolves modules under one configuration.
pub struct Engine<'a> {
    config: &'a EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Engine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Read every configured dependency artifact, in declared order.
    pub fn load_dependencies(&self) -> Result<Vec<ModuleMetadata>, EngineError> {
        let _span = info_span!("load_dependencies").entered();
        let mut deps = Vec::with_capacity(self.config.dependency_metadata.len());
        for path in &self.config.dependency_metadata {
            deps.push(read_artifact(path)?);
        }
        info!(count = deps.len(), "loaded dependency metadata");
        Ok(deps)
    }

    /// Scan one module, following dependency hierarchies when configured.
    pub fn scan(
        &self,
        tree: &ModuleTree,
        dependencies: &[ModuleMetadata],
        diagnostics: &mut Diagnostics,
    ) -> ScannedModule {
        let _span = info_span!("scan", module = %tree.name).entered();
        let mut scanner = Scanner::new(self.config);
        if self.config.closure == ClosureMode::WithDependencies {
            for dep in dependencies {
                scanner = scanner.with_published_hierarchy(&dep.hierarchy);
            }
        }
        let scanned = scanner.scan(tree, diagnostics);
        info!(
            files = scanned.files().len(),
            candidates = scanned.len(),
            "scanned module"
        );
        scanned
    }

    /// Scan, extract and match one module.
    pub fn analyze(
        &self,
        tree: &ModuleTree,
        dependencies: &[ModuleMetadata],
        diagnostics: &mut Diagnostics,
    ) -> ModuleAnalysis {
        let scanned = self.scan(tree, dependencies, diagnostics);

        let queries = {
            let _span = info_span!("extract", module = %tree.name).entered();
            let queries = extract_queries(tree, self.config, diagnostics);
            info!(sites = queries.len(), "extracted queries");
            queries
        };

        let uses = {
            let _span = info_span!("match", module = %tree.name).entered();
            let mut matcher = Matcher::new(&scanned, self.config);
            let uses = matcher.resolve_all(&queries);
            info!(queries = matcher.cache_len(), "matched queries");
            uses
        };

        let metadata = ModuleMetadata {
            module: tree.name.clone(),
            packages: scanned.packages().clone(),
            uses,
            hierarchy: scanned.hierarchy().clone(),
        };

        ModuleAnalysis {
            scanned,
            queries,
            metadata,
        }
    }

    /// Resolve a module, reading dependency artifacts from the configuration.
    pub fn resolve(&self, tree: &ModuleTree) -> Result<Resolution, EngineError> {
        if !self.config.enabled {
            info!(module = %tree.name, "engine disabled, skipping resolution");
            return Ok(Resolution::disabled(&tree.name));
        }
        let deps = self.load_dependencies()?;
        self.resolve_with(tree, &deps)
    }

    /// Resolve a module against already-loaded dependency metadata.
    pub fn resolve_with(
        &self,
        tree: &ModuleTree,
        dependencies: &[ModuleMetadata],
    ) -> Result<Resolution, EngineError> {
        let _span = info_span!("resolve", module = %tree.name).entered();
        let mut diagnostics = Diagnostics::new();
        let analysis = self.analyze(tree, dependencies, &mut diagnostics);

        let artifact = if self.config.save_metadata {
            let dir = self.config.output_dir.as_deref().ok_or_else(|| {
                EngineError::invalid_args("saving metadata requires an output directory")
            })?;
            Some(write_artifact(dir, &analysis.metadata)?)
        } else {
            None
        };

        let index = {
            let _span = info_span!("merge").entered();
            merge(
                &analysis.metadata.uses,
                dependencies.iter().map(|dep| &dep.uses),
            )
        };

        let sites = analysis
            .queries
            .sites()
            .iter()
            .map(|site| ResolvedSite {
                file: site.file.clone(),
                location: site.location.clone(),
                query: site.query.clone(),
                matches: index.get(&site.query).cloned().unwrap_or_default(),
            })
            .collect();

        info!(
            entries = index.len(),
            diagnostics = diagnostics.len(),
            "resolved module"
        );

        Ok(Resolution {
            metadata: analysis.metadata,
            index,
            sites,
            diagnostics,
            artifact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::parse_call_chain;
    use crate::codec::artifact_path;
    use crate::diagnostics::DiagnosticCode;
    use crate::tree::{Decl, SourceFile};
    use tempfile::TempDir;

    fn chain(text: &str, line: u32) -> crate::tree::CallChain {
        parse_call_chain(text, Location::new("Main.kt", line, 1)).unwrap()
    }

    fn app() -> ModuleTree {
        ModuleTree::new("app").with_file(
            SourceFile::new("Main.kt", "app")
                .with_decl(Decl::object("Impl").with_supertype("lib.Base"))
                .with_call(chain("objects().withSupertype<lib.Base>()", 3))
                .with_call(chain("objects().classes()", 4)),
        )
    }

    mod pipeline {
        use super::*;

        #[test]
        fn resolves_sites_and_collects_diagnostics() {
            let config = EngineConfig::default();
            let resolution = Engine::new(&config).resolve(&app()).unwrap();
            assert_eq!(resolution.module(), "app");
            assert_eq!(resolution.sites.len(), 1);
            assert_eq!(resolution.sites[0].matches.names(), vec!["app.Impl"]);
            assert_eq!(resolution.diagnostics.count(DiagnosticCode::QueryParse), 1);
            assert_eq!(resolution.metadata.packages.len(), 1);
            assert!(resolution.artifact.is_none());
        }

        #[test]
        fn disabled_engine_reads_nothing() {
            let config = EngineConfig::default()
                .with_enabled(false)
                .with_dependency("/nonexistent/tugreflect.meta.json");
            let resolution = Engine::new(&config).resolve(&app()).unwrap();
            assert!(resolution.sites.is_empty());
            assert!(resolution.index.is_empty());
            assert!(resolution.diagnostics.is_empty());
        }

        #[test]
        fn missing_dependency_is_fatal() {
            let temp = TempDir::new().unwrap();
            let config =
                EngineConfig::default().with_dependency(temp.path().join("tugreflect.meta.json"));
            let err = Engine::new(&config).resolve(&app()).unwrap_err();
            assert!(matches!(err, EngineError::MetadataMissing { .. }));
        }

        #[test]
        fn corrupt_dependency_is_fatal() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("tugreflect.meta.json");
            std::fs::write(&path, b"{ not json").unwrap();
            let config = EngineConfig::default().with_dependency(&path);
            let err = Engine::new(&config).resolve(&app()).unwrap_err();
            assert!(matches!(err, EngineError::MetadataCorrupt { .. }));
        }
    }

    mod persistence {
        use super::*;

        #[test]
        fn saves_artifact_into_output_dir() {
            let temp = TempDir::new().unwrap();
            let config = EngineConfig::default()
                .with_save_metadata(true)
                .with_output_dir(temp.path());
            let resolution = Engine::new(&config).resolve(&app()).unwrap();
            let path = resolution.artifact.unwrap();
            assert_eq!(path, artifact_path(temp.path()));
            let back = read_artifact(&path).unwrap();
            assert_eq!(back, resolution.metadata);
        }

        #[test]
        fn save_without_output_dir_is_invalid() {
            let config = EngineConfig::default().with_save_metadata(true);
            let err = Engine::new(&config).resolve(&app()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidArguments { .. }));
        }
    }

    mod closure {
        use super::*;
        use std::collections::{BTreeMap, BTreeSet};

        fn lib_metadata() -> ModuleMetadata {
            let mut meta = ModuleMetadata::new("lib");
            let supers: BTreeSet<String> = ["lib.Root".to_string()].into_iter().collect();
            meta.hierarchy = BTreeMap::from([("lib.Base".to_string(), supers)]);
            meta
        }

        fn root_query_tree() -> ModuleTree {
            ModuleTree::new("app").with_file(
                SourceFile::new("Main.kt", "app")
                    .with_decl(Decl::object("Impl").with_supertype("lib.Base"))
                    .with_call(chain("objects().withSupertype<lib.Root>()", 1)),
            )
        }

        #[test]
        fn dependency_hierarchy_is_followed() {
            let config = EngineConfig::default();
            let resolution = Engine::new(&config)
                .resolve_with(&root_query_tree(), &[lib_metadata()])
                .unwrap();
            assert_eq!(resolution.sites[0].matches.names(), vec!["app.Impl"]);
        }

        #[test]
        fn local_only_closure_ignores_dependency_hierarchy() {
            let config = EngineConfig::default().with_closure(ClosureMode::LocalOnly);
            let resolution = Engine::new(&config)
                .resolve_with(&root_query_tree(), &[lib_metadata()])
                .unwrap();
            assert!(resolution.sites[0].matches.is_empty());
        }
    }
}
