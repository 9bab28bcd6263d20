//! Engine configuration and layered resolution.
//!
//! [`EngineConfig`] is a plain value handed by reference to every pipeline
//! entry point. [`ResolvedConfig`] builds one from layered sources, tracking
//! where each value came from:
//!
//! 1. CLI flags (highest)
//! 2. Environment variables (`TUGREFLECT_ENABLED`, `TUGREFLECT_OUTPUT_DIR`, `TUGREFLECT_SAVE_METADATA`)
//! 3. Config file (`tugreflect.toml`, `[engine]` table)
//! 4. Defaults
//!
//! Dependency lists are not overridden but concatenated: file entries first,
//! then CLI entries, preserving declared order.
//!
//! ## Config File
//!
//! ```toml
//! [engine]
//! enabled = true
//! output_dir = "build/tugreflect"
//! save_metadata = true
//! dependencies = ["../lib/build/tugreflect/tugreflect.meta.json"]
//! entry_points = ["Reflekt", "Reflect"]
//! root_supertype = "kotlin.Any"   # "" disables the implicit root
//! annotation_match = "all"        # or "any"
//! closure = "with_dependencies"   # or "local_only"
//! ```
//!
//! Relative paths in the file are resolved against the file's directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default config file name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "tugreflect.toml";

/// Default DSL entry objects.
pub const DEFAULT_ENTRY_POINTS: &[&str] = &["Reflekt", "Reflect"];

/// Default universal supertype.
pub const DEFAULT_ROOT_SUPERTYPE: &str = "kotlin.Any";

/// Errors resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid config file {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// How a filter's annotation set is compared with a candidate's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationMatch {
    /// Candidate annotations must include every filter annotation.
    #[default]
    All,
    /// Candidate must carry at least one filter annotation.
    Any,
}

/// Which supertype edges are followed when flattening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureMode {
    /// Only edges declared in the module being scanned.
    LocalOnly,
    /// Local edges plus hierarchies published by dependency metadata.
    #[default]
    WithDependencies,
}

/// Configuration for one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// When false, resolution returns empty results without reading anything.
    pub enabled: bool,
    /// Directory the metadata artifact is written into.
    pub output_dir: Option<PathBuf>,
    /// Whether to persist this module's metadata.
    pub save_metadata: bool,
    /// Dependency artifacts in declared dependency order.
    pub dependency_metadata: Vec<PathBuf>,
    /// Receiver names recognized as the DSL entry object.
    pub entry_points: Vec<String>,
    /// Supertype implicitly carried by every class and object.
    pub root_supertype: Option<String>,
    pub annotation_match: AnnotationMatch,
    pub closure: ClosureMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            enabled: true,
            output_dir: None,
            save_metadata: false,
            dependency_metadata: Vec::new(),
            entry_points: DEFAULT_ENTRY_POINTS.iter().map(|e| e.to_string()).collect(),
            root_supertype: Some(DEFAULT_ROOT_SUPERTYPE.to_string()),
            annotation_match: AnnotationMatch::All,
            closure: ClosureMode::WithDependencies,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_save_metadata(mut self, save: bool) -> Self {
        self.save_metadata = save;
        self
    }

    pub fn with_dependency(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependency_metadata.push(path.into());
        self
    }

    pub fn with_entry_points<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry_points = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_root_supertype(mut self, root: Option<&str>) -> Self {
        self.root_supertype = root.map(str::to_string);
        self
    }

    pub fn with_annotation_match(mut self, mode: AnnotationMatch) -> Self {
        self.annotation_match = mode;
        self
    }

    pub fn with_closure(mut self, mode: ClosureMode) -> Self {
        self.closure = mode;
        self
    }

    /// Whether `receiver` names a DSL entry object.
    ///
    /// Matches the bare name (`Reflect`) or any qualified form ending in it
    /// (`org.example.Reflect`).
    pub fn is_entry_point(&self, receiver: &str) -> bool {
        self.entry_points.iter().any(|entry| {
            receiver == entry
                || receiver
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From tugreflect.toml [engine].
    ConfigFile = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

fn apply<T: Clone>(slot: &mut ConfigValue<T>, value: T, source: ConfigSource) {
    *slot = slot.clone().merge(ConfigValue::new(value, source));
}

// ============================================================================
// Config File
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    engine: EngineSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineSection {
    enabled: Option<bool>,
    output_dir: Option<PathBuf>,
    save_metadata: Option<bool>,
    #[serde(default)]
    dependencies: Vec<PathBuf>,
    entry_points: Option<Vec<String>>,
    root_supertype: Option<String>,
    annotation_match: Option<AnnotationMatch>,
    closure: Option<ClosureMode>,
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };
    toml::from_str(&text).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--disabled` flag (as `Some(false)`).
    pub enabled: Option<bool>,
    /// `--output-dir` flag.
    pub output_dir: Option<PathBuf>,
    /// `--save-metadata` flag.
    pub save_metadata: Option<bool>,
    /// `--dep` flags, in order.
    pub dependencies: Vec<PathBuf>,
}

/// Resolved configuration with precedence information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub enabled: ConfigValue<bool>,
    pub output_dir: Option<ConfigValue<PathBuf>>,
    pub save_metadata: ConfigValue<bool>,
    pub dependency_metadata: Vec<ConfigValue<PathBuf>>,
    pub entry_points: ConfigValue<Vec<String>>,
    pub root_supertype: ConfigValue<Option<String>>,
    pub annotation_match: ConfigValue<AnnotationMatch>,
    pub closure: ConfigValue<ClosureMode>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        let source = ConfigSource::Default;
        ResolvedConfig {
            enabled: ConfigValue::new(defaults.enabled, source),
            output_dir: None,
            save_metadata: ConfigValue::new(defaults.save_metadata, source),
            dependency_metadata: Vec::new(),
            entry_points: ConfigValue::new(defaults.entry_points, source),
            root_supertype: ConfigValue::new(defaults.root_supertype, source),
            annotation_match: ConfigValue::new(defaults.annotation_match, source),
            closure: ConfigValue::new(defaults.closure, source),
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from all sources, reading the process environment.
    ///
    /// `config_file` is an explicit file (which must exist); otherwise
    /// `project_dir/tugreflect.toml` is used if present.
    pub fn resolve(
        project_dir: &Path,
        config_file: Option<&Path>,
        cli_overrides: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with_env(project_dir, config_file, cli_overrides, |var| {
            std::env::var(var).ok()
        })
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env<F>(
        project_dir: &Path,
        config_file: Option<&Path>,
        cli_overrides: &CliOverrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ResolvedConfig::default();

        let file = match config_file {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = project_dir.join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };
        if let Some(path) = file {
            debug!(path = %path.display(), "loading config file");
            let parsed = load_file_config(&path)?;
            let base = path.parent().unwrap_or(Path::new("."));
            config.apply_file_config(parsed.engine, base);
        }

        config.apply_env_vars(env)?;
        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn apply_file_config(&mut self, section: EngineSection, base: &Path) {
        let source = ConfigSource::ConfigFile;
        if let Some(enabled) = section.enabled {
            apply(&mut self.enabled, enabled, source);
        }
        if let Some(dir) = section.output_dir {
            self.output_dir = Some(ConfigValue::new(base.join(dir), source));
        }
        if let Some(save) = section.save_metadata {
            apply(&mut self.save_metadata, save, source);
        }
        self.dependency_metadata.extend(
            section
                .dependencies
                .into_iter()
                .map(|dep| ConfigValue::new(base.join(dep), source)),
        );
        if let Some(entries) = section.entry_points {
            apply(&mut self.entry_points, entries, source);
        }
        if let Some(root) = section.root_supertype {
            let root = (!root.is_empty()).then_some(root);
            apply(&mut self.root_supertype, root, source);
        }
        if let Some(mode) = section.annotation_match {
            apply(&mut self.annotation_match, mode, source);
        }
        if let Some(mode) = section.closure {
            apply(&mut self.closure, mode, source);
        }
    }

    fn apply_env_vars<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = ConfigSource::EnvVar;
        if let Some(value) = env("TUGREFLECT_ENABLED") {
            apply(&mut self.enabled, parse_bool("TUGREFLECT_ENABLED", &value)?, source);
        }
        if let Some(value) = env("TUGREFLECT_OUTPUT_DIR") {
            self.output_dir = Some(ConfigValue::new(PathBuf::from(value), source));
        }
        if let Some(value) = env("TUGREFLECT_SAVE_METADATA") {
            apply(
                &mut self.save_metadata,
                parse_bool("TUGREFLECT_SAVE_METADATA", &value)?,
                source,
            );
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let source = ConfigSource::CliFlag;
        if let Some(enabled) = overrides.enabled {
            apply(&mut self.enabled, enabled, source);
        }
        if let Some(ref dir) = overrides.output_dir {
            self.output_dir = Some(ConfigValue::new(dir.clone(), source));
        }
        if let Some(save) = overrides.save_metadata {
            apply(&mut self.save_metadata, save, source);
        }
        self.dependency_metadata.extend(
            overrides
                .dependencies
                .iter()
                .map(|dep| ConfigValue::new(dep.clone(), source)),
        );
    }

    /// Drop source tracking and produce the engine value.
    pub fn into_engine_config(self) -> EngineConfig {
        EngineConfig {
            enabled: self.enabled.value,
            output_dir: self.output_dir.map(|v| v.value),
            save_metadata: self.save_metadata.value,
            dependency_metadata: self
                .dependency_metadata
                .into_iter()
                .map(|v| v.value)
                .collect(),
            entry_points: self.entry_points.value,
            root_supertype: self.root_supertype.value,
            annotation_match: self.annotation_match.value,
            closure: self.closure.value,
        }
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, text).unwrap();
        path
    }

    mod engine_config_tests {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let config = EngineConfig::default();
            assert!(config.enabled);
            assert!(!config.save_metadata);
            assert!(config.output_dir.is_none());
            assert_eq!(
                config.entry_points,
                vec!["Reflekt".to_string(), "Reflect".to_string()]
            );
            assert_eq!(config.root_supertype.as_deref(), Some("kotlin.Any"));
            assert_eq!(config.annotation_match, AnnotationMatch::All);
            assert_eq!(config.closure, ClosureMode::WithDependencies);
        }

        #[test]
        fn entry_point_matches_bare_and_qualified() {
            let config = EngineConfig::default();
            assert!(config.is_entry_point("Reflect"));
            assert!(config.is_entry_point("Reflekt"));
            assert!(config.is_entry_point("org.example.Reflect"));
            assert!(config.is_entry_point("org.jetbrains.reflekt.Reflekt"));
            assert!(!config.is_entry_point("NotReflect"));
            assert!(!config.is_entry_point("Reflector"));
        }
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn config_value_merge_prefers_higher_source() {
            let low = ConfigValue::new(1, ConfigSource::ConfigFile);
            let high = ConfigValue::new(2, ConfigSource::CliFlag);
            assert_eq!(low.clone().merge(high.clone()).value, 2);
            assert_eq!(high.merge(low).value, 2);
        }

        #[test]
        fn no_sources_yields_defaults() {
            let dir = TempDir::new().unwrap();
            let config =
                ResolvedConfig::resolve_with_env(dir.path(), None, &CliOverrides::default(), no_env)
                    .unwrap();
            assert_eq!(config.enabled.source, ConfigSource::Default);
            assert_eq!(config.into_engine_config(), EngineConfig::default());
        }

        #[test]
        fn file_then_env_then_cli() {
            let dir = TempDir::new().unwrap();
            write_config(
                &dir,
                "[engine]\nenabled = false\nsave_metadata = false\noutput_dir = \"out\"\n",
            );
            let env: HashMap<&str, &str> =
                HashMap::from([("TUGREFLECT_ENABLED", "true"), ("TUGREFLECT_SAVE_METADATA", "1")]);
            let cli = CliOverrides {
                output_dir: Some(PathBuf::from("/cli/out")),
                ..Default::default()
            };

            let config = ResolvedConfig::resolve_with_env(dir.path(), None, &cli, |var| {
                env.get(var).map(|v| v.to_string())
            })
            .unwrap();

            assert!(config.enabled.value);
            assert_eq!(config.enabled.source, ConfigSource::EnvVar);
            assert!(config.save_metadata.value);
            let out = config.output_dir.unwrap();
            assert_eq!(out.value, PathBuf::from("/cli/out"));
            assert_eq!(out.source, ConfigSource::CliFlag);
        }

        #[test]
        fn dependencies_concatenate_file_then_cli() {
            let dir = TempDir::new().unwrap();
            write_config(&dir, "[engine]\ndependencies = [\"a.json\", \"b.json\"]\n");
            let cli = CliOverrides {
                dependencies: vec![PathBuf::from("/c.json")],
                ..Default::default()
            };
            let config = ResolvedConfig::resolve_with_env(dir.path(), None, &cli, no_env)
                .unwrap()
                .into_engine_config();
            assert_eq!(
                config.dependency_metadata,
                vec![
                    dir.path().join("a.json"),
                    dir.path().join("b.json"),
                    PathBuf::from("/c.json"),
                ]
            );
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn file_sets_matching_options() {
            let dir = TempDir::new().unwrap();
            write_config(
                &dir,
                "[engine]\nentry_points = [\"Q\"]\nroot_supertype = \"\"\nannotation_match = \"any\"\nclosure = \"local_only\"\n",
            );
            let config = ResolvedConfig::resolve_with_env(
                dir.path(),
                None,
                &CliOverrides::default(),
                no_env,
            )
            .unwrap()
            .into_engine_config();
            assert_eq!(config.entry_points, vec!["Q".to_string()]);
            assert!(config.root_supertype.is_none());
            assert_eq!(config.annotation_match, AnnotationMatch::Any);
            assert_eq!(config.closure, ClosureMode::LocalOnly);
        }

        #[test]
        fn explicit_missing_file_is_an_error() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("nope.toml");
            let err = ResolvedConfig::resolve_with_env(
                dir.path(),
                Some(&missing),
                &CliOverrides::default(),
                no_env,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::NotFound { .. }));
        }

        #[test]
        fn unknown_keys_are_rejected() {
            let dir = TempDir::new().unwrap();
            write_config(&dir, "[engine]\nenable = true\n");
            let err = ResolvedConfig::resolve_with_env(
                dir.path(),
                None,
                &CliOverrides::default(),
                no_env,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }));
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn invalid_bool_env_is_an_error() {
            let dir = TempDir::new().unwrap();
            let err = ResolvedConfig::resolve_with_env(
                dir.path(),
                None,
                &CliOverrides::default(),
                |var| (var == "TUGREFLECT_ENABLED").then(|| "maybe".to_string()),
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnv { .. }));
        }

        #[test]
        fn parse_bool_accepts_common_spellings() {
            assert!(parse_bool("X", "TRUE").unwrap());
            assert!(parse_bool("X", "yes").unwrap());
            assert!(!parse_bool("X", "0").unwrap());
            assert!(!parse_bool("X", "off").unwrap());
        }
    }
}
