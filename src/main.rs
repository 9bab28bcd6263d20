//! Binary entry point for the tugr CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Resolve a module against its dependencies and persist its metadata
//! tugr resolve --tree app.tree.json --dep lib/tugreflect.meta.json \
//!     --output-dir build/tugreflect --save-metadata
//!
//! # List declaration summaries
//! tugr scan --tree app.tree.json
//!
//! # Decode a metadata artifact
//! tugr inspect --meta build/tugreflect/tugreflect.meta.json
//!
//! # Try one query against a module
//! tugr query --tree app.tree.json --expr 'objects().withSupertype<app.Plugin>()'
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tugreflect::cli::{run_inspect, run_query, run_resolve, run_scan};
use tugreflect::config::{CliOverrides, EngineConfig, ResolvedConfig};
use tugreflect::error::{EngineError, OutputErrorCode};
use tugreflect::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Compile-time declaration queries.
///
/// All output is JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "tugr", version, about = "Compile-time declaration queries")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Configuration file (default: tugreflect.toml in the current directory, if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every query of a module and merge dependency results.
    Resolve {
        /// Declaration tree of the module (JSON).
        #[arg(long)]
        tree: PathBuf,
        /// Dependency metadata artifact, in declared dependency order (repeatable).
        #[arg(long = "dep")]
        deps: Vec<PathBuf>,
        /// Directory the metadata artifact is written into.
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Persist this module's metadata artifact.
        #[arg(long)]
        save_metadata: bool,
        /// Skip resolution entirely and report empty results.
        #[arg(long)]
        disabled: bool,
    },
    /// List the declaration summaries of a module.
    Scan {
        /// Declaration tree of the module (JSON).
        #[arg(long)]
        tree: PathBuf,
        /// Dependency metadata artifact whose hierarchy is followed (repeatable).
        #[arg(long = "dep")]
        deps: Vec<PathBuf>,
    },
    /// Decode a metadata artifact.
    Inspect {
        /// Artifact path.
        #[arg(long)]
        meta: PathBuf,
    },
    /// Resolve a single textual query chain against a module.
    Query {
        /// Declaration tree of the module (JSON).
        #[arg(long)]
        tree: PathBuf,
        /// Chain such as `objects().withSupertype<a.I>()`.
        #[arg(long)]
        expr: String,
        /// Dependency metadata artifact whose hierarchy is followed (repeatable).
        #[arg(long = "dep")]
        deps: Vec<PathBuf>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(json) => {
            println!("{}", json);
            let _ = io::stdout().flush();
            ExitCode::SUCCESS
        }
        Err(err) => {
            // Errors go to stdout as JSON, like successful responses
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Execute the CLI command, returning the response JSON.
fn execute(cli: Cli) -> Result<String, EngineError> {
    let global = cli.global;
    match cli.command {
        Command::Resolve {
            tree,
            deps,
            output_dir,
            save_metadata,
            disabled,
        } => {
            let overrides = CliOverrides {
                enabled: disabled.then_some(false),
                output_dir,
                save_metadata: save_metadata.then_some(true),
                dependencies: deps,
            };
            let config = load_config(&global, &overrides)?;
            run_resolve(&tree, &config)
        }
        Command::Scan { tree, deps } => {
            let config = load_config(&global, &dependency_overrides(deps))?;
            run_scan(&tree, &config)
        }
        Command::Inspect { meta } => run_inspect(&meta),
        Command::Query { tree, expr, deps } => {
            let config = load_config(&global, &dependency_overrides(deps))?;
            run_query(&tree, &expr, &config)
        }
    }
}

fn dependency_overrides(deps: Vec<PathBuf>) -> CliOverrides {
    CliOverrides {
        dependencies: deps,
        ..Default::default()
    }
}

/// Resolve configuration: defaults, config file, environment, then flags.
fn load_config(global: &GlobalArgs, overrides: &CliOverrides) -> Result<EngineConfig, EngineError> {
    let project_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let resolved = ResolvedConfig::resolve(&project_dir, global.config.as_deref(), overrides)?;
    Ok(resolved.into_engine_config())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn resolve_collects_repeated_deps_in_order() {
            let cli = Cli::try_parse_from([
                "tugr", "resolve", "--tree", "app.json", "--dep", "b.json", "--dep", "a.json",
            ])
            .unwrap();
            match cli.command {
                Command::Resolve { deps, disabled, .. } => {
                    assert_eq!(deps, vec![PathBuf::from("b.json"), PathBuf::from("a.json")]);
                    assert!(!disabled);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn global_flags_after_subcommand() {
            let cli = Cli::try_parse_from([
                "tugr", "inspect", "--meta", "m.json", "--log-level", "debug", "--log-json",
            ])
            .unwrap();
            assert!(cli.global.log_json);
            assert!(matches!(cli.global.log_level, LogLevel::Debug));
        }

        #[test]
        fn query_requires_expr() {
            assert!(Cli::try_parse_from(["tugr", "query", "--tree", "app.json"]).is_err());
        }
    }
}
