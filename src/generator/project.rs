use super::{default_generators, format_project, GenerationSettings, DEFAULT_GO_VERSION};
use crate::config::DependencyMapping;
use crate::handlers::{DependencyRegistry, HandlerResolver, DEFAULT_INFRA_MODULE};
use crate::includes::{Fragment, FragmentRegistry, IncludeMerger};
use crate::orchestrator::{Orchestrator, ProgressCallback, RunSummary};
use crate::spec::{load_document, load_spec};
use crate::storage::{DiskStorage, DryRunReport, MemoryStorage, Storage};
use anyhow::Context;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Inputs of one `generate` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub spec: PathBuf,
    pub output: PathBuf,
    /// Generator allow-list; empty runs everything
    pub only: Vec<String>,
    pub dry_run: bool,
    /// Where custom handlers live; defaults to `<output>/handlers`
    pub handlers_dir: Option<PathBuf>,
    /// Ownership context; empty means "own everything untagged"
    pub context: String,
    /// Go module path; defaults to the project name
    pub module: Option<String>,
    pub go_version: Option<String>,
    pub infra_module: Option<String>,
    pub dependencies: Vec<DependencyMapping>,
    /// On-disk fragments registered after the built-in ones
    pub fragments: Vec<(String, PathBuf)>,
    /// Run `gofmt` over the output afterwards
    pub format: bool,
}

impl GenerateOptions {
    pub fn new(spec: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        GenerateOptions {
            spec: spec.into(),
            output: output.into(),
            only: Vec::new(),
            dry_run: false,
            handlers_dir: None,
            context: String::new(),
            module: None,
            go_version: None,
            infra_module: None,
            dependencies: Vec::new(),
            fragments: Vec::new(),
            format: false,
        }
    }

    /// Built-in fragments plus the configured on-disk ones.
    pub fn fragment_registry(&self) -> anyhow::Result<FragmentRegistry> {
        fragment_registry(&self.fragments)
    }

    fn dependency_registry(&self) -> DependencyRegistry {
        let infra_module = self.infra_module.as_deref().unwrap_or(DEFAULT_INFRA_MODULE);
        let mut registry = DependencyRegistry::standard(infra_module);
        for mapping in &self.dependencies {
            registry.add_mapping(
                mapping.type_expr.clone(),
                mapping.expression.clone(),
                mapping.import.clone(),
            );
        }
        registry
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub summary: RunSummary,
    /// Fragments that were merged in
    pub includes: Vec<String>,
    /// Set for dry runs
    pub report: Option<DryRunReport>,
}

pub fn fragment_registry(fragments: &[(String, PathBuf)]) -> anyhow::Result<FragmentRegistry> {
    let mut registry = FragmentRegistry::builtin();
    for (name, dir) in fragments {
        registry.register(Fragment::from_dir(name, dir)?);
    }
    Ok(registry)
}

/// Merge includes into `spec` and bundle the result into one document.
pub fn bundle_spec(spec: &Path, registry: FragmentRegistry) -> anyhow::Result<Value> {
    let merged = IncludeMerger::new(registry).merge(spec)?;
    let document = load_document(merged.path());
    if let Err(err) = merged.cleanup() {
        warn!(error = %err, "failed to remove merge scratch directory");
    }
    document
}

/// Run the whole pipeline: include merge, IR build, generators.
///
/// # Errors
///
/// Fails on an unreadable or invalid spec, on the first failing generator
/// tier, or when formatting was requested and `gofmt` fails.
pub fn generate_project(
    options: &GenerateOptions,
    progress: Option<ProgressCallback>,
) -> anyhow::Result<GenerationOutcome> {
    let merger = IncludeMerger::new(options.fragment_registry()?);
    let merged = merger
        .merge(&options.spec)
        .with_context(|| format!("failed to merge includes into {}", options.spec.display()))?;
    let includes = merged.includes().to_vec();
    let loaded = load_spec(merged.path(), &options.context);
    if let Err(err) = merged.cleanup() {
        warn!(error = %err, "failed to remove merge scratch directory");
    }
    let model = loaded?;
    info!(
        project = %model.project_name,
        schemas = model.schemas.len(),
        operations = model.operations.len(),
        includes = ?includes,
        "spec loaded"
    );

    let settings = GenerationSettings {
        module: options.module.clone().unwrap_or_default(),
        go_version: options
            .go_version
            .clone()
            .unwrap_or_else(|| DEFAULT_GO_VERSION.to_string()),
        ..GenerationSettings::default()
    };
    let handlers_dir = options
        .handlers_dir
        .clone()
        .unwrap_or_else(|| options.output.join("handlers"));
    let resolver = HandlerResolver::new(handlers_dir, options.dependency_registry());

    let mut orchestrator = Orchestrator::new().with_only(&options.only.join(","));
    if let Some(callback) = progress {
        orchestrator = orchestrator.with_progress(callback);
    }
    orchestrator.register_all(default_generators(&model, resolver));

    if options.dry_run {
        let storage = MemoryStorage::new(&options.output);
        let summary = orchestrator.run(&model, &storage, &settings)?;
        let report = DryRunReport::from_storage(&storage);
        report.log();
        return Ok(GenerationOutcome {
            summary,
            includes,
            report: Some(report),
        });
    }

    let storage = DiskStorage::new(&options.output);
    let summary = orchestrator.run(&model, &storage, &settings)?;
    if options.format {
        format_project(storage.base_dir())?;
    }
    Ok(GenerationOutcome {
        summary,
        includes,
        report: None,
    })
}
