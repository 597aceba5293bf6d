use crate::config::{self, Config, ConfigSource};
use crate::filter;
use crate::loader;
use crate::openapi_builder::OpenApiBuilder;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::source::SourceSet;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Generate an OpenAPI document from annotated Rust endpoint declarations
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Hand-written document to extend
    #[arg(short = 'b', long = "base", value_name = "BASE_DOC")]
    pub base_document: Option<PathBuf>,

    /// Built-in filter to run on the result (drop-deprecated, strip-extensions)
    #[arg(long = "filter", value_name = "NAME")]
    pub filter: Option<String>,

    /// How operation ids are derived (method, type-method, verb-path)
    #[arg(long = "operation-id-strategy", value_name = "NAME")]
    pub operation_id_strategy: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Layer defaults, the config file, the environment and the flags
pub fn load_config(args: &CliArgs) -> Result<Config> {
    let mut config = Config::new().with_defaults();
    if let Some(path) = &args.config_path {
        config = config
            .with_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?;
    }
    let mut config = config.with_env_prefix(config::ENV_PREFIX);

    if let Some(strategy) = &args.operation_id_strategy {
        config.set(config::OPERATION_ID_STRATEGY, strategy.as_str());
    }
    if let Some(name) = &args.filter {
        config.set(config::FILTER, name.as_str());
    }
    if let Some(base) = &args.base_document {
        config.set(config::BASE_DOCUMENT, base.display().to_string());
    }
    debug!("Configuration has {} keys", config.len());
    Ok(config)
}

/// Scan, read, build and filter; returns the serialized document
pub fn generate(args: &CliArgs) -> Result<String> {
    let config = load_config(args)?;

    info!("Scanning project directory...");
    let sources = SourceSet::from_dir(&args.project_path)?;
    for warning in &sources.warnings {
        warn!("{}", warning);
    }
    if sources.files.is_empty() {
        anyhow::bail!("No Rust files could be parsed in the project directory");
    }
    info!("Parsed {} files", sources.files.len());

    let read = sources.read()?;
    info!(
        "Found {} endpoint types and {} declared types",
        read.endpoints.len(),
        read.types.len()
    );
    if read.endpoints.is_empty() {
        warn!("No endpoints found in the project");
    }

    let base_path = config.get(config::BASE_DOCUMENT);
    let base = loader::load_or_default(base_path.as_deref().map(Path::new))
        .context("Failed to load base document")?;

    info!("Building OpenAPI document...");
    let builder = OpenApiBuilder::new().with_config(&config)?;
    let mut document = builder.build(Some(base), &read)?;

    if let Some(name) = config.get(config::FILTER) {
        info!("Applying filter {}", name);
        let mut policy = filter::by_name(&name)?;
        filter::apply(policy.as_mut(), &mut document);
    }

    info!("Serializing to {:?} format...", args.output_format);
    match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document),
        OutputFormat::Json => serialize_json(&document),
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let content = generate(&args)?;

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    Ok(())
}
