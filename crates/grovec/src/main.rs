//! The Grove resolver CLI.
//!
//! - `grovec resolve <workspace.toml>` - resolve every `[[calls]]` entry
//!   against the workspace's declarations and extension methods
//!
//! Options:
//! - `--json` - one JSON object per call on stdout, diagnostics as JSON
//! - `--no-color` - disable colorized output
//! - `--config` - resolver configuration file, overriding `[config]`
//! - `--log-level` - tracing filter directive (defaults to `GROVE_LOG`)
//! - `--log-format` - `text` or `json` logs on stderr

mod logging;
mod workspace;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use grove_resolve::diagnostics::{render_resolution, to_json, DiagnosticOptions};
use grove_resolve::{Engine, Registries, ResolutionResult, ResolveConfig, UsageContext};

use crate::logging::LogFormat;
use crate::workspace::Workspace;

#[derive(Parser)]
#[command(name = "grovec", version, about = "Method resolution for Grove workspaces")]
struct Cli {
    /// Tracing filter directive, e.g. `resolve=debug` (overrides GROVE_LOG)
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value = "text", global = true)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every call listed in a workspace file
    Resolve {
        /// Path to the workspace file
        workspace: PathBuf,

        /// Resolver configuration (TOML), replacing the workspace's [config]
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output results and diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let format = match cli.log_format {
        LogFormatArg::Text => LogFormat::Text,
        LogFormatArg::Json => LogFormat::Json,
    };

    match cli.command {
        Commands::Resolve {
            workspace,
            config,
            json,
            no_color,
        } => {
            logging::init(cli.log_level.as_deref(), format, !no_color);
            let diag_opts = DiagnosticOptions {
                color: !no_color && !json,
                json,
            };
            match resolve(&workspace, config.as_deref(), &diag_opts) {
                Ok(0) => {}
                Ok(failed) => {
                    tracing::info!(failed, "some calls did not resolve");
                    process::exit(1);
                }
                Err(e) => {
                    if json {
                        let msg = serde_json::json!({
                            "code": "G0001",
                            "severity": "error",
                            "message": e,
                            "spans": [],
                        });
                        eprintln!("{}", msg);
                    } else {
                        eprintln!("error: {}", e);
                    }
                    process::exit(1);
                }
            }
        }
    }
}

/// Load the workspace, resolve its calls and print the results. Returns the
/// number of calls that did not resolve.
fn resolve(path: &Path, config: Option<&Path>, diag_opts: &DiagnosticOptions) -> Result<usize, String> {
    let ws = Workspace::from_file(path).map_err(|e| e.to_string())?;
    let config = match config {
        Some(p) => ResolveConfig::from_file(p).map_err(|e| e.to_string())?,
        None => ws.config.clone(),
    };

    let mut builder = Registries::builder().config(config).with_builtins();
    for ext in ws.extensions {
        builder = builder.contributor(Arc::new(ext));
    }
    let engine = Engine::new(Arc::new(ws.universe), builder.build());
    tracing::debug!(path = %path.display(), calls = ws.calls.len(), "workspace loaded");

    let usage = UsageContext::new();
    let mut failed = 0;
    for call in &ws.calls {
        let result = engine.resolve_call(&call.receiver, &call.method, &call.args, &usage);
        if !result.is_resolved() {
            failed += 1;
        }

        if diag_opts.json {
            let mut value = to_json(&result);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("call".to_string(), serde_json::Value::String(call.describe()));
            }
            println!("{}", value);
        } else {
            println!("{}", summary(&call.describe(), &result));
        }

        if let Some(rendered) = render_resolution(&result, &call.source, &call.args, None, diag_opts) {
            eprintln!("{}", rendered);
        }
    }
    Ok(failed)
}

fn summary(call: &str, result: &ResolutionResult) -> String {
    match result {
        ResolutionResult::Resolved {
            candidate,
            inferred_type,
            ..
        } => format!("{} => {}: {}", call, candidate.id, inferred_type),
        ResolutionResult::Unresolved { reasons, .. } => {
            let first = reasons.first().map(|r| r.to_string()).unwrap_or_default();
            format!("{} => unresolved: {}", call, first)
        }
        ResolutionResult::Ambiguous { tied } => format!("{} => ambiguous ({} candidates)", call, tied.len()),
    }
}
