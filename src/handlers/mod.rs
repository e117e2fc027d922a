//! Dependency wiring for hand-written handlers.
//!
//! An operation flagged `x-codegen-custom-handler` may have a hand-written Go
//! implementation at `<handlers_dir>/<snake_case(operationId)>.impl.go`
//! exposing `func New<OperationID>Handler(...)`. The resolver reads that
//! constructor's parameters and maps each type to a bootstrap expression
//! through a [`DependencyRegistry`]. Types it cannot map get a placeholder
//! that stops the generated code from compiling until someone wires it, but
//! never fail generation.

mod lexer;
mod parser;
mod registry;

pub use lexer::{tokenize, Lexer, Token};
pub use parser::{parse_constructor, Constructor, Param};
pub use registry::{placeholder, DependencyRegistry, DependencyResolution, DEFAULT_INFRA_MODULE};

use crate::naming::{pascal_case, snake_case};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One constructor parameter and how bootstrap code supplies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDependency {
    pub name: String,
    pub type_expr: String,
    /// Wiring expression, or a placeholder when unresolved
    pub resolution: String,
    pub import: Option<String>,
    pub resolved: bool,
}

impl HandlerDependency {
    pub fn is_pointer(&self) -> bool {
        self.type_expr.starts_with('*')
    }
}

/// What was found for one custom operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub operation_id: String,
    pub file: PathBuf,
    /// The file exists and declares the constructor
    pub has_handler: bool,
    /// `New<OperationID>Handler`
    pub constructor: String,
    pub dependencies: Vec<HandlerDependency>,
}

impl HandlerInfo {
    pub fn unresolved(&self) -> impl Iterator<Item = &HandlerDependency> {
        self.dependencies.iter().filter(|d| !d.resolved)
    }

    /// Distinct imports the resolved dependencies need, sorted.
    pub fn imports(&self) -> Vec<String> {
        let mut imports: Vec<String> = self
            .dependencies
            .iter()
            .filter_map(|d| d.import.clone())
            .collect();
        imports.sort();
        imports.dedup();
        imports
    }
}

/// Locates custom handler sources and resolves their constructor dependencies.
#[derive(Debug, Clone)]
pub struct HandlerResolver {
    handlers_dir: PathBuf,
    registry: DependencyRegistry,
}

impl HandlerResolver {
    pub fn new(handlers_dir: impl Into<PathBuf>, registry: DependencyRegistry) -> Self {
        HandlerResolver {
            handlers_dir: handlers_dir.into(),
            registry,
        }
    }

    pub fn handlers_dir(&self) -> &Path {
        &self.handlers_dir
    }

    pub fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DependencyRegistry {
        &mut self.registry
    }

    /// Where the hand-written implementation of `operation_id` lives.
    pub fn handler_path(&self, operation_id: &str) -> PathBuf {
        self.handlers_dir
            .join(format!("{}.impl.go", snake_case(operation_id)))
    }

    pub fn constructor_name(operation_id: &str) -> String {
        format!("New{}Handler", pascal_case(operation_id))
    }

    /// Parse the handler file of `operation_id` and resolve its dependencies.
    ///
    /// A missing file, or a file without the constructor, is reported through
    /// `has_handler = false`.
    ///
    /// # Errors
    ///
    /// Only fails when the file exists but cannot be read.
    pub fn get_dependencies(&self, operation_id: &str) -> anyhow::Result<HandlerInfo> {
        let file = self.handler_path(operation_id);
        let constructor = Self::constructor_name(operation_id);
        let mut info = HandlerInfo {
            operation_id: operation_id.to_string(),
            file: file.clone(),
            has_handler: false,
            constructor: constructor.clone(),
            dependencies: Vec::new(),
        };

        if !file.is_file() {
            debug!(operation = operation_id, file = %file.display(), "no custom handler");
            return Ok(info);
        }
        let source = fs::read_to_string(&file)
            .with_context(|| format!("failed to read handler {}", file.display()))?;

        let Some(parsed) = parse_constructor(&source, &constructor) else {
            warn!(
                operation = operation_id,
                file = %file.display(),
                constructor = %constructor,
                "handler file has no constructor"
            );
            return Ok(info);
        };

        info.has_handler = true;
        info.dependencies = parsed
            .params
            .into_iter()
            .map(|param| self.resolve_param(operation_id, param))
            .collect();
        Ok(info)
    }

    fn resolve_param(&self, operation_id: &str, param: Param) -> HandlerDependency {
        match self.registry.resolve(&param.type_expr) {
            Some(found) => HandlerDependency {
                name: param.name,
                type_expr: param.type_expr,
                resolution: found.expression,
                import: found.import,
                resolved: true,
            },
            None => {
                warn!(
                    operation = operation_id,
                    param = %param.name,
                    type_expr = %param.type_expr,
                    "unresolved handler dependency, emitting placeholder"
                );
                HandlerDependency {
                    resolution: placeholder(&param.type_expr),
                    name: param.name,
                    type_expr: param.type_expr,
                    import: None,
                    resolved: false,
                }
            }
        }
    }
}
