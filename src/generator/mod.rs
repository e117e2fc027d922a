//! # Generator Module
//!
//! Turns an [`ApiModel`] into a Go backend. Each concern is a
//! [`Generator`] scheduled by the [`Orchestrator`](crate::orchestrator::Orchestrator):
//!
//! | Name           | Tier   | Output                                            |
//! |----------------|--------|---------------------------------------------------|
//! | `go.mod`       | first  | `go.mod`                                          |
//! | `models`       | normal | `models/<schema>.gen.go`                          |
//! | `repositories` | normal | `repositories/<entity>_repository.gen.go`         |
//! | `handlers`     | normal | `handlers/<op>.gen.go`, one-time `<op>.impl.go`   |
//! | `routes`       | normal | `http/routes.gen.go`                              |
//! | `container`    | normal | `app/container.gen.go` (composition apps)         |
//! | `router`       | normal | `http/router.gen.go` (composition apps)           |
//! | `sql`          | last   | `database/schema.gen.sql`, `database/queries/*`   |
//! | `bootstrap`    | last   | `app/bootstrap.gen.go`                            |
//! | `bundle`       | final  | `api/openapi.bundled.yaml`                        |
//!
//! A composition app (one that owns no operations but composes packages)
//! only gets `go.mod`, the container, the router and the bundle.
//!
//! Go sources are rendered with Askama templates from `templates/go`, SQL
//! from `templates/sql`. Files ending in `.gen.go` are overwritten on every
//! run; `.impl.go` files belong to the user and are only created when absent.
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use specgen::generator::{generate_project, GenerateOptions};
//!
//! let options = GenerateOptions::new("api/openapi.yaml", "backend");
//! let outcome = generate_project(&options, None)?;
//! println!("{} generators ran", outcome.summary.executed.len());
//! ```

mod backend;
mod bootstrap;
mod bundle;
mod composition;
mod format;
mod go_types;
mod project;
mod sql;
mod templates;

pub use backend::{
    GoModGenerator, HandlersGenerator, ModelsGenerator, RepositoriesGenerator, RoutesGenerator,
};
pub use bootstrap::BootstrapGenerator;
pub use bundle::BundleGenerator;
pub use composition::{composed_packages, ContainerGenerator, RouterGenerator};
pub use format::format_project;
pub use go_types::*;
pub use project::*;
pub use sql::{queries, sql_type, table_name, table_view, SqlGenerator};
pub use templates::*;

use crate::handlers::HandlerResolver;
use crate::orchestrator::{Generator, GeneratorContext};
use crate::spec::ApiModel;
use anyhow::Context;
use std::path::Path;

pub const GEN_GO_MOD: &str = "go.mod";
pub const GEN_MODELS: &str = "models";
pub const GEN_REPOSITORIES: &str = "repositories";
pub const GEN_HANDLERS: &str = "handlers";
pub const GEN_ROUTES: &str = "routes";
pub const GEN_CONTAINER: &str = "container";
pub const GEN_ROUTER: &str = "router";
pub const GEN_SQL: &str = "sql";
pub const GEN_BOOTSTRAP: &str = "bootstrap";
pub const GEN_BUNDLE: &str = "bundle";

pub const DEFAULT_GO_VERSION: &str = "1.22";

/// Settings shared by every generator of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Go module path; empty means "use the project name"
    pub module: String,
    pub go_version: String,
    /// `path version` lines for the `require` block of `go.mod`
    pub requires: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            module: String::new(),
            go_version: DEFAULT_GO_VERSION.to_string(),
            requires: vec![format!("{UUID_IMPORT} v1.6.0")],
        }
    }
}

impl GenerationSettings {
    /// Module path of the generated code.
    pub fn module_path(&self, model: &ApiModel) -> String {
        if self.module.is_empty() {
            model.project_name.clone()
        } else {
            self.module.trim_end_matches('/').to_string()
        }
    }
}

/// Write `contents` to `path` (relative to the storage base).
pub(crate) fn write_output(
    ctx: &GeneratorContext<'_>,
    path: &str,
    contents: &str,
) -> anyhow::Result<()> {
    ctx.storage
        .write_file(Path::new(path), contents.as_bytes())
        .with_context(|| format!("failed to write {path}"))
}

/// The standard generator set for `model`.
pub fn default_generators(
    model: &ApiModel,
    resolver: HandlerResolver,
) -> Vec<Box<dyn Generator>> {
    if model.is_composition_app() {
        return vec![
            Box::new(GoModGenerator),
            Box::new(ContainerGenerator),
            Box::new(RouterGenerator),
            Box::new(BundleGenerator),
        ];
    }
    vec![
        Box::new(GoModGenerator),
        Box::new(ModelsGenerator),
        Box::new(RepositoriesGenerator),
        Box::new(HandlersGenerator),
        Box::new(RoutesGenerator),
        Box::new(SqlGenerator),
        Box::new(BootstrapGenerator::new(resolver)),
        Box::new(BundleGenerator),
    ]
}
