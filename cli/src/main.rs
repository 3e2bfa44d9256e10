use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use field_schema_artifacts::{
    BuildConfig, BuildManifest, DataFormat, PublishTarget, WriteMode, load_metadata, load_source,
    manifest_dir, publish, run_build, write_artifact,
};
use field_schema_core::{
    BindingKind, DEFAULT_MODEL_NAME, DocumentOptions, FieldBinding, FieldDefault,
    ModelDescriptor, compile_document, compile_models, describe_errors, validate_payload,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// CLI-specific document format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Yaml,
    Json,
}

impl From<CliFormat> for DataFormat {
    fn from(fmt: CliFormat) -> Self {
        match fmt {
            CliFormat::Yaml => Self::Yaml,
            CliFormat::Json => Self::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "schema-compile")]
#[command(about = "Compile field metadata into a schema document and generated model source")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile metadata into the schema document.
    Schema(SchemaArgs),
    /// Compile metadata into generated model source.
    Models(ModelsArgs),
    /// Compile both artifacts and write them with a build manifest.
    Build(BuildArgs),
    /// Check written artifacts against their build manifest.
    Verify(VerifyArgs),
    /// Print a JSON summary of a generated source file.
    Inspect(InspectArgs),
    /// Validate a JSON request body against a generated source file.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Metadata file (JSON or YAML).
    #[arg(long)]
    metadata: PathBuf,
    /// Output path (prints to stdout when omitted).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output format (default: from the output extension, else yaml).
    #[arg(long)]
    format: Option<CliFormat>,
    /// Document title.
    #[arg(long)]
    title: Option<String>,
    /// Document version.
    #[arg(long = "version")]
    doc_version: Option<String>,
    /// Name of the run-input component.
    #[arg(long)]
    component: Option<String>,
}

#[derive(Debug, Args)]
struct ModelsArgs {
    /// Metadata file (JSON or YAML).
    #[arg(long)]
    metadata: PathBuf,
    /// Name of the root model.
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    model_name: String,
    /// Output path (prints to stdout when omitted).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Build config YAML.
    #[arg(long, conflicts_with = "metadata", required_unless_present = "metadata")]
    config: Option<PathBuf>,
    /// Metadata file, built with default settings.
    #[arg(long)]
    metadata: Option<PathBuf>,
    /// Root model name (overrides the config).
    #[arg(long)]
    model_name: Option<String>,
    /// Directory receiving the artifacts.
    #[arg(long, default_value = "build")]
    out_dir: PathBuf,
    /// Fail instead of replacing existing artifacts.
    #[arg(long)]
    exclusive: bool,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    /// Path to build-manifest.json.
    #[arg(long)]
    manifest: PathBuf,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Generated source file.
    #[arg(long)]
    source: PathBuf,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Generated source file.
    #[arg(long)]
    source: PathBuf,
    /// JSON request body file, or `-` for stdin.
    #[arg(long)]
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "schema-compile starting");

    let result = match cli.command {
        Command::Schema(args) => run_schema(args),
        Command::Models(args) => run_models(args),
        Command::Build(args) => run_build_command(args),
        Command::Verify(args) => run_verify(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_schema(args: SchemaArgs) -> Result<(), String> {
    let metadata = load_metadata(&args.metadata).map_err(|e| e.to_string())?;

    let defaults = DocumentOptions::default();
    let options = DocumentOptions {
        title: args.title.unwrap_or(defaults.title),
        version: args.doc_version.unwrap_or(defaults.version),
        component_name: args.component.unwrap_or(defaults.component_name),
    };
    let document = compile_document(&metadata, &options).map_err(|e| e.to_string())?;

    let format = args
        .format
        .map(DataFormat::from)
        .or_else(|| {
            args.output
                .as_deref()
                .and_then(|path| DataFormat::from_path(path).ok())
        })
        .unwrap_or_default();

    match args.output {
        Some(path) => {
            publish(&document, &PublishTarget::File { path: path.clone(), format })
                .map_err(|e| format!("Failed to write '{}': {e}", path.display()))?;
            println!(
                "Wrote schema document with {} field(s) to '{}'.",
                document.component().properties.len(),
                path.display()
            );
        }
        None => {
            let text =
                publish(&document, &PublishTarget::Memory(format)).map_err(|e| e.to_string())?;
            print!("{text}");
        }
    }
    Ok(())
}

fn run_models(args: ModelsArgs) -> Result<(), String> {
    let metadata = load_metadata(&args.metadata).map_err(|e| e.to_string())?;
    let (model, source) = compile_models(&metadata, &args.model_name).map_err(|e| e.to_string())?;

    match args.output {
        Some(path) => {
            write_artifact(&path, source.as_bytes(), WriteMode::Atomic)
                .map_err(|e| format!("Failed to write '{}': {e}", path.display()))?;
            println!(
                "Wrote {} model(s) to '{}'.",
                count_models(&model),
                path.display()
            );
        }
        None => print!("{source}"),
    }
    Ok(())
}

fn run_build_command(args: BuildArgs) -> Result<(), String> {
    let mut config = match (&args.config, &args.metadata) {
        (Some(path), _) => BuildConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        (None, Some(metadata)) => BuildConfig::new(metadata),
        (None, None) => return Err("Specify --config or --metadata".to_string()),
    };
    if let Some(model_name) = args.model_name {
        config.model_name = model_name;
    }

    let mode = if args.exclusive {
        WriteMode::Exclusive
    } else {
        WriteMode::Atomic
    };
    let report = run_build(&config, &args.out_dir, mode).map_err(|e| e.to_string())?;

    println!("Schema document: {}", report.schema_document.display());
    println!("Generated source: {}", report.generated_source.display());
    println!("Manifest: {}", report.manifest_path.display());
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<(), String> {
    let manifest = BuildManifest::load(&args.manifest)
        .map_err(|e| format!("Failed to load manifest '{}': {e}", args.manifest.display()))?;
    let base_dir = manifest_dir(&args.manifest);
    manifest.verify(base_dir).map_err(|e| e.to_string())?;

    println!(
        "Verified {} artifact(s) built at {}.",
        manifest.artifacts.len(),
        manifest.built_at
    );
    let metadata_file = manifest.metadata_file(base_dir);
    if let Ok(bytes) = fs::read(&metadata_file) {
        if manifest.is_stale(&bytes) {
            eprintln!(
                "Metadata '{}' changed since the build; rebuild to refresh the artifacts.",
                metadata_file.display()
            );
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let model = load_source(&args.source).map_err(|e| e.to_string())?;
    let raw = serde_json::to_string_pretty(&summarize_model(&model))
        .map_err(|e| format!("Failed to serialize summary: {e}"))?;
    println!("{raw}");
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let model = load_source(&args.source).map_err(|e| e.to_string())?;
    let body = read_input(&args.input)?;

    let (response, passed) = match serde_json::from_str::<Value>(&body) {
        Err(err) => (
            json!({"status": "failure", "error": format!("invalid JSON body: {err}")}),
            false,
        ),
        Ok(payload) => match validate_payload(&model, &payload) {
            Ok(fields) => (json!({"status": "success", "result": fields}), true),
            Err(errors) => (
                json!({"status": "failure", "error": describe_errors(&errors)}),
                false,
            ),
        },
    };

    println!("{response}");
    if passed {
        Ok(())
    } else {
        Err("request body failed validation".to_string())
    }
}

fn read_input(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        return Ok(body);
    }
    fs::read_to_string(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
}

fn summarize_model(model: &ModelDescriptor) -> Value {
    let fields: Vec<Value> = model.fields.iter().map(summarize_field).collect();
    json!({
        "name": model.name,
        "fields": fields,
    })
}

fn summarize_field(field: &FieldBinding) -> Value {
    let mut summary = serde_json::Map::new();
    summary.insert("name".into(), json!(field.name));
    summary.insert("type".into(), json!(field.type_repr()));
    summary.insert("required".into(), json!(field.is_required()));
    if let FieldDefault::Value(value) = &field.default {
        summary.insert("default".into(), value.clone());
    }
    if !field.description.is_empty() {
        summary.insert("description".into(), json!(field.description));
    }
    if !field.constraints.is_empty() {
        let constraints: serde_json::Map<String, Value> = field
            .constraints
            .iter()
            .map(|c| (c.kind.keyword().to_string(), Value::Number(c.value.clone())))
            .collect();
        summary.insert("constraints".into(), Value::Object(constraints));
    }
    if let BindingKind::Reference(nested) = &field.kind {
        summary.insert("model".into(), summarize_model(nested));
    }
    Value::Object(summary)
}

/// Counts distinct descriptors reachable from `model`, keyed by identity like
/// the emitter, so a shared descriptor counts once.
fn count_models(model: &ModelDescriptor) -> usize {
    fn visit(model: &ModelDescriptor, seen: &mut HashSet<*const ModelDescriptor>) {
        if seen.insert(model as *const ModelDescriptor) {
            for nested in model.nested_models() {
                visit(nested, seen);
            }
        }
    }

    let mut seen = HashSet::new();
    visit(model, &mut seen);
    seen.len()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use field_schema_core::PrimitiveKind;

    use super::*;

    #[test]
    fn test_count_models_counts_shared_descriptor_once() {
        let point = Arc::new(ModelDescriptor::new("Point").with_field(
            FieldBinding::primitive("x", PrimitiveKind::Float)
                .with_default(FieldDefault::Value(json!(0.0))),
        ));
        let root = ModelDescriptor::new("Segment")
            .with_field(FieldBinding::reference("start", point.clone()))
            .with_field(FieldBinding::reference("end", point));

        assert_eq!(count_models(&root), 2);
    }

    #[test]
    fn test_count_models_counts_equal_copies_separately() {
        let place = || Arc::new(ModelDescriptor::new("Place"));
        let root = ModelDescriptor::new("Root")
            .with_field(FieldBinding::reference("home", place()))
            .with_field(FieldBinding::reference("work", place()));

        assert_eq!(count_models(&root), 3);
    }
}
