//! # Clinical Calculators CLI
//!
//! ```text
//! calc list
//! calc run bmi --params '{"weight": 70, "height": 1.75, "unit_system": "metric"}'
//! calc run dcct_ifcc --set value=7.0 --set input_unit=dcct
//! calc spec bmi [--json]
//! calc check
//! ```
//!
//! Exit codes: 0 success, 1 calculation/lookup/dependency failure,
//! 2 usage error (bad JSON, bad `--set`, unreadable settings).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use calc_core::{CalcError, InputField, Registry, Settings};

/// Clinical calculators
///
/// List, document and run the registered calculators.
#[derive(Parser)]
#[command(name = "calc", version, about, long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true, env = "CLINICAL_CALCULATORS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List calculators as `name<TAB>title`
    List,

    /// Run a calculator and print the JSON response
    Run {
        /// Calculator name
        name: String,
        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
        /// Single parameter as key=value, coerced by its declared type
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Show a calculator's documentation and declared fields
    Spec {
        /// Calculator name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve every calculator's dependencies
    Check,
}

/// Errors that exit with status 2.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            if e.downcast_ref::<UsageError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    let registry = Registry::builtin(&settings);

    match cli.command {
        Commands::List => {
            for (name, title) in registry.available() {
                println!("{}\t{}", name, title);
            }
            Ok(())
        }
        Commands::Run { name, params, set } => {
            let params = build_params(&registry, &name, &params, &set)?;
            debug!(calculator = %name, params = %params, "running calculator");
            let response = registry.calculate(&name, &params)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Spec { name, json } => show_spec(&registry, &name, json),
        Commands::Check => check(&registry),
    }
}

fn load_settings(path: Option<&std::path::Path>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::from_file(path).map(|mut s| {
            s.apply_env();
            s
        }),
        None => Settings::load(),
    };
    settings.map_err(|e| UsageError(e.to_string()).into())
}

/// Merge `--params` JSON with `--set key=value` pairs.
fn build_params(registry: &Registry, name: &str, raw: &str, set: &[String]) -> anyhow::Result<Value> {
    let mut params: Value = serde_json::from_str(raw)
        .map_err(|e| UsageError(format!("Invalid JSON for --params: {}", e)))?;
    if set.is_empty() {
        return Ok(params);
    }

    let object: &mut Map<String, Value> = params
        .as_object_mut()
        .ok_or_else(|| UsageError("--params must be a JSON object when --set is used".to_string()))?;
    let fields = registry.fields(name).unwrap_or_default();

    for pair in set {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| UsageError(format!("--set expects KEY=VALUE, got '{}'", pair)))?;
        let key = key.trim();
        let field = fields
            .iter()
            .find(|f| f.name == key)
            .cloned()
            .unwrap_or_else(|| InputField::new(key));
        match field.coerce(value) {
            Some(value) => {
                object.insert(key.to_string(), value);
            }
            None => {
                object.remove(key);
            }
        }
    }
    Ok(params)
}

fn show_spec(registry: &Registry, name: &str, as_json: bool) -> anyhow::Result<()> {
    let spec = registry.get_spec(name).ok_or_else(|| CalcError::not_found(name))?;

    if as_json {
        let detail = json!({
            "name": spec.name,
            "title": spec.title(),
            "doc_config": spec.doc_config,
            "inputs": spec.inputs(),
            "dependencies": spec.dependencies(),
        });
        println!("{}", serde_json::to_string_pretty(&detail).context("serializing spec")?);
        return Ok(());
    }

    println!("{}", spec.title().bold());
    println!();
    if spec.doc_config.is_empty() {
        println!("(no documentation)");
    } else {
        println!("{}", spec.doc_config);
    }

    let inputs = spec.inputs();
    println!();
    println!("{}", "Inputs:".bold());
    if inputs.is_empty() {
        println!("  (none declared)");
    }
    for field in &inputs {
        println!("  {}", describe_field(field));
    }

    let dependencies = spec.dependencies();
    println!();
    println!("{}", "Dependencies:".bold());
    if dependencies.is_empty() {
        println!("  (none)");
    }
    for requirement in &dependencies {
        println!("  - {}", requirement);
    }
    Ok(())
}

fn describe_field(field: &InputField) -> String {
    let mut line = field.name.clone();
    if let Some(field_type) = field.field_type {
        line.push_str(&format!(" ({})", field_type.as_str()));
    }
    if field.required {
        line.push_str(" required");
    }
    if let Some(choices) = &field.choices {
        line.push_str(&format!(" one of [{}]", choices.join(", ")));
    }
    match (field.min, field.max) {
        (Some(min), Some(max)) => line.push_str(&format!(" range [{}, {}]", min, max)),
        (Some(min), None) => line.push_str(&format!(" min {}", min)),
        (None, Some(max)) => line.push_str(&format!(" max {}", max)),
        (None, None) => {}
    }
    if let Some(unit) = &field.unit {
        line.push_str(&format!(" unit: {}", unit));
    }
    line
}

fn check(registry: &Registry) -> anyhow::Result<()> {
    for doc in registry.unregistered_docs() {
        warn!(doc = %doc, "documentation file has no registered calculator");
    }
    let failures = registry.resolve_all();

    for name in registry.names() {
        match failures.iter().find(|(failed, _)| failed == name) {
            None => println!("{}\t{}", name, "ok".green()),
            Some((_, e)) => {
                warn!(calculator = %name, error = %e, "dependency resolution failed");
                let message = e.to_string();
                let summary = message.lines().next().unwrap_or_default();
                println!("{}\t{}\t{}", name, "failed".red(), summary);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} calculator(s) have unresolved dependencies", failures.len())
    }
}
