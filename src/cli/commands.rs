use crate::config::{detect_config, load_config, SpecgenConfig};
use crate::generator::{bundle_spec, fragment_registry, generate_project, GenerateOptions};
use crate::logging::LogFormat;
use crate::orchestrator::{ProgressCallback, ProgressEvent};
use crate::spec::{load_spec, ApiModel};
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Output directory when neither the flag nor the config names one.
pub const DEFAULT_OUTPUT: &str = "generated";

/// Command-line interface for specgen
#[derive(Parser, Debug)]
#[command(name = "specgen", version)]
#[command(about = "Generate a Go backend from an OpenAPI spec with x-codegen extensions", long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides SPECGEN_LOG_LEVEL
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format; overrides SPECGEN_LOG_FORMAT
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Json,
    Pretty,
    Compact,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
        }
    }
}

/// Flags of `specgen generate`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Path to the OpenAPI specification file (YAML or JSON)
    #[arg(short, long)]
    pub spec: PathBuf,

    /// Output directory (default: `output` from specgen.toml, else ./generated)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run only these generators (comma-separated or repeated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub only: Vec<String>,

    /// Render everything in memory and print what would be written
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Directory holding hand-written `*.impl.go` handlers (default: <output>/handlers)
    #[arg(long)]
    pub handlers_dir: Option<PathBuf>,

    /// Ownership context; schemas and operations tagged with another
    /// `x-internal` value are composed instead of generated
    #[arg(long)]
    pub context: Option<String>,

    /// Go module path (default: the spec's project name)
    #[arg(long)]
    pub module: Option<String>,

    /// Path to specgen.toml; auto-detected next to the spec when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run gofmt over the output afterwards
    #[arg(long, default_value_t = false)]
    pub format: bool,
}

impl GenerateArgs {
    /// Combine the flags with `config`; flags win.
    pub fn into_options(self, config: SpecgenConfig) -> GenerateOptions {
        let output = self
            .output
            .or(config.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        GenerateOptions {
            only: if self.only.is_empty() {
                config.only
            } else {
                self.only
            },
            dry_run: self.dry_run,
            handlers_dir: self.handlers_dir.or(config.handlers_dir),
            context: self.context.or(config.context).unwrap_or_default(),
            module: self.module.or(config.module),
            go_version: config.go_version,
            infra_module: config.infra_module,
            dependencies: config.dependencies,
            fragments: config.fragments.into_iter().collect(),
            format: self.format || config.format,
            ..GenerateOptions::new(self.spec, output)
        }
    }

    fn config(&self) -> anyhow::Result<SpecgenConfig> {
        match &self.config {
            Some(path) => load_config(path)?
                .with_context(|| format!("config file not found: {}", path.display())),
            None => match detect_config(&self.spec) {
                Some(path) => {
                    debug!(config = %path.display(), "using detected config");
                    Ok(load_config(&path)?.unwrap_or_default())
                }
                None => Ok(SpecgenConfig::default()),
            },
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate Go code from an OpenAPI spec
    Generate(GenerateArgs),
    /// Merge includes and write the spec as one self-contained document
    Bundle {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Where to write the bundle; `.json` writes JSON, anything else YAML
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the schemas and operations of a spec
    Inspect {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Ownership context
        #[arg(long, default_value = "")]
        context: String,
    },
}

/// Execute a parsed command.
///
/// # Errors
///
/// Returns the attributed cause of the first failure.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            let config = args.config()?;
            let options = args.into_options(config);
            let progress: ProgressCallback = Arc::new(|event: &ProgressEvent| {
                if let ProgressEvent::GeneratorDone { name, index, total } = event {
                    debug!(generator = %name, index, total, "generator finished");
                }
            });
            let outcome = generate_project(&options, Some(progress))?;

            if let Some(report) = &outcome.report {
                print!("{report}");
            } else {
                println!(
                    "✅ {} generators wrote {} in {} ms",
                    outcome.summary.executed.len(),
                    options.output.display(),
                    outcome.summary.elapsed.as_millis()
                );
            }
            Ok(())
        }
        Commands::Bundle { spec, output } => {
            let fragments: Vec<(String, PathBuf)> = match detect_config(&spec) {
                Some(path) => load_config(&path)?
                    .unwrap_or_default()
                    .fragments
                    .into_iter()
                    .collect(),
                None => Vec::new(),
            };
            let document = bundle_spec(&spec, fragment_registry(&fragments)?)?;
            let is_json = output.extension().is_some_and(|e| e == "json");
            let contents = if is_json {
                serde_json::to_string_pretty(&document)?
            } else {
                serde_yaml::to_string(&document)?
            };
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&output, contents)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(output = %output.display(), "bundle written");
            Ok(())
        }
        Commands::Inspect { spec, context } => {
            let model = load_spec(&spec, &context)?;
            print!("{}", describe_model(&model));
            Ok(())
        }
    }
}

/// Human-readable listing used by `inspect`.
pub fn describe_model(model: &ApiModel) -> String {
    let context = if model.context.is_empty() {
        "<none>"
    } else {
        model.context.as_str()
    };
    let mut lines = vec![format!(
        "{} {} (project {}, context {})",
        model.title, model.version, model.project_name, context
    )];

    lines.push(format!("\nSchemas ({}):", model.schemas.len()));
    for schema in &model.schemas {
        let owner = schema.ownership.as_deref().unwrap_or("-");
        let mut line = format!(
            "  {:<28} {:<12} owner={owner}",
            schema.name,
            schema.kind.to_string()
        );
        if let Some(repository) = schema.codegen.as_ref().and_then(|c| c.repository.as_ref()) {
            let ops: Vec<&str> = repository.operations.iter().map(|o| o.as_str()).collect();
            line.push_str(&format!(" repository=[{}]", ops.join(", ")));
        }
        lines.push(line);
    }

    lines.push(format!("\nOperations ({}):", model.operations.len()));
    for op in &model.operations {
        let security = if op.is_public() {
            "public".to_string()
        } else {
            op.security
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("|")
        };
        let mut line = format!(
            "  {:<7} {:<32} {:<24} [{}] {security}",
            op.method.as_str(),
            op.path,
            op.id,
            op.tag
        );
        if op.custom_handler {
            line.push_str(" custom-handler");
        }
        if let Some(owner) = &op.ownership {
            line.push_str(&format!(" owner={owner}"));
        }
        lines.push(line);
    }

    let packages = model.composed_packages();
    if !packages.is_empty() {
        let names: Vec<&str> = packages.iter().map(String::as_str).collect();
        lines.push(format!("\nComposed packages: {}", names.join(", ")));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
