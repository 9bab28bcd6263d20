//! Tests for the CLI command bodies.
//!
//! Each test writes a declaration tree to a temp directory, runs a command,
//! and checks the JSON response.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use tugreflect::chain::parse_call_chain;
use tugreflect::cli::{run_inspect, run_query, run_resolve, run_scan};
use tugreflect::codec::{artifact_path, METADATA_FILE_NAME};
use tugreflect::config::EngineConfig;
use tugreflect::error::{EngineError, OutputErrorCode};
use tugreflect::tree::{Decl, ModuleTree, SourceFile};
use tugreflect::types::Location;

// ============================================================================
// Fixtures
// ============================================================================

fn chain(text: &str, file: &str, line: u32) -> tugreflect::tree::CallChain {
    parse_call_chain(text, Location::new(file, line, 9)).unwrap()
}

fn lib_tree() -> ModuleTree {
    ModuleTree::new("lib").with_file(
        SourceFile::new("lib/Plugins.kt", "lib")
            .with_decl(Decl::class("Plugin"))
            .with_decl(Decl::object("Core").with_supertype("lib.Plugin"))
            .with_call(chain(
                "Reflect.objects().withSupertype<lib.Plugin>()",
                "lib/Plugins.kt",
                12,
            )),
    )
}

fn app_tree() -> ModuleTree {
    ModuleTree::new("app").with_file(
        SourceFile::new("app/Main.kt", "app").with_call(chain(
            "Reflect.objects().withSupertype<lib.Plugin>()",
            "app/Main.kt",
            3,
        )),
    )
}

fn write_tree(dir: &Path, tree: &ModuleTree) -> PathBuf {
    let path = dir.join(format!("{}.tree.json", tree.name));
    fs::write(&path, serde_json::to_string_pretty(tree).unwrap()).unwrap();
    path
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

// ============================================================================
// resolve
// ============================================================================

mod resolve {
    use super::*;

    #[test]
    fn lib_then_app_propagates_matches() {
        let temp = TempDir::new().unwrap();
        let lib_out = temp.path().join("lib-out");

        let lib_config = EngineConfig::default()
            .with_save_metadata(true)
            .with_output_dir(&lib_out);
        let lib_json = parse(&run_resolve(&write_tree(temp.path(), &lib_tree()), &lib_config).unwrap());
        assert_eq!(lib_json["status"], "ok");
        assert_eq!(
            lib_json["artifact"],
            artifact_path(&lib_out).display().to_string()
        );

        let app_config = EngineConfig::default().with_dependency(lib_out.join(METADATA_FILE_NAME));
        let app_json = parse(&run_resolve(&write_tree(temp.path(), &app_tree()), &app_config).unwrap());
        let site = &app_json["sites"][0];
        assert_eq!(site["location"]["line"], 3);
        assert_eq!(site["matches"][0]["fq_name"], "lib.Core");
        assert!(app_json.get("artifact").is_none());
    }

    #[test]
    fn missing_dependency_reports_code_3() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::default().with_dependency(temp.path().join("absent.json"));
        let err = run_resolve(&write_tree(temp.path(), &app_tree()), &config).unwrap_err();
        assert_eq!(err.error_code(), OutputErrorCode::MetadataMissing);
    }

    #[test]
    fn unreadable_tree_is_invalid_arguments() {
        let temp = TempDir::new().unwrap();
        let err = run_resolve(&temp.path().join("nope.json"), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArguments { .. }));
    }

    #[test]
    fn disabled_returns_empty_response() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::default().with_enabled(false);
        let json = parse(&run_resolve(&write_tree(temp.path(), &lib_tree()), &config).unwrap());
        assert!(json["sites"].as_array().unwrap().is_empty());
    }
}

// ============================================================================
// scan / inspect / query
// ============================================================================

mod other_commands {
    use super::*;

    #[test]
    fn scan_lists_declarations() {
        let temp = TempDir::new().unwrap();
        let json = parse(&run_scan(&write_tree(temp.path(), &lib_tree()), &EngineConfig::default()).unwrap());
        let decls = json["files"][0]["declarations"].as_array().unwrap();
        let names: Vec<&str> = decls.iter().map(|d| d["fq_name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["lib.Plugin", "lib.Core"]);
    }

    #[test]
    fn inspect_decodes_written_artifact() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::default()
            .with_save_metadata(true)
            .with_output_dir(temp.path());
        run_resolve(&write_tree(temp.path(), &lib_tree()), &config).unwrap();

        let json = parse(&run_inspect(&artifact_path(temp.path())).unwrap());
        assert_eq!(json["metadata"]["module"], "lib");
        assert_eq!(json["metadata"]["packages"][0], "lib");
        assert_eq!(json["metadata"]["uses"]["objects"][0]["matches"][0]["fq_name"], "lib.Core");
    }

    #[test]
    fn inspect_corrupt_artifact_reports_code_4() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(METADATA_FILE_NAME);
        fs::write(&path, "[]").unwrap();
        let err = run_inspect(&path).unwrap_err();
        assert_eq!(err.error_code().code(), 4);
    }

    #[test]
    fn query_resolves_expression() {
        let temp = TempDir::new().unwrap();
        let tree = write_tree(temp.path(), &lib_tree());
        let json = parse(
            &run_query(&tree, "classes().withSupertype<kotlin.Any>()", &EngineConfig::default()).unwrap(),
        );
        assert_eq!(json["query"]["kind"], "class");
        assert_eq!(json["matches"][0]["fq_name"], "lib.Plugin");
    }

    #[test]
    fn disabled_scan_reads_no_dependencies() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::default()
            .with_enabled(false)
            .with_dependency(temp.path().join("absent.json"));
        let json = parse(&run_scan(&write_tree(temp.path(), &lib_tree()), &config).unwrap());
        assert_eq!(json["status"], "ok");
        assert!(json["files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn disabled_query_reports_no_matches() {
        let temp = TempDir::new().unwrap();
        let tree = write_tree(temp.path(), &lib_tree());
        let config = EngineConfig::default()
            .with_enabled(false)
            .with_dependency(temp.path().join("absent.json"));
        let json = parse(&run_query(&tree, "classes().withSupertype<kotlin.Any>()", &config).unwrap());
        assert_eq!(json["query"]["kind"], "class");
        assert!(json["matches"].as_array().unwrap().is_empty());

        let err = run_query(&tree, "functions()", &config).unwrap_err();
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }

    #[test]
    fn query_rejects_non_query_expression() {
        let temp = TempDir::new().unwrap();
        let tree = write_tree(temp.path(), &lib_tree());
        let err = run_query(&tree, "listOf(x)", &EngineConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }

    #[test]
    fn query_rejects_malformed_query() {
        let temp = TempDir::new().unwrap();
        let tree = write_tree(temp.path(), &lib_tree());
        let err = run_query(&tree, "functions()", &EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("signature"));
    }
}
