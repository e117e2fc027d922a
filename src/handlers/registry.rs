use crate::naming::pluralize;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Module path the standard infrastructure imports live under.
pub const DEFAULT_INFRA_MODULE: &str = "github.com/archesai/archesai";

static REPOSITORY_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^repositories\.([A-Za-z_][A-Za-z0-9_]*)Repository$")
        .expect("repository type regex should be valid")
});

/// How bootstrap code obtains one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyResolution {
    /// Go expression passed to the constructor, e.g. `infra.AuthService`
    pub expression: String,
    /// Import path the expression needs, `None` for same-package references
    pub import: Option<String>,
}

impl DependencyResolution {
    pub fn new(expression: impl Into<String>, import: Option<String>) -> Self {
        DependencyResolution {
            expression: expression.into(),
            import,
        }
    }
}

/// Maps Go type expressions to bootstrap wiring expressions.
///
/// Lookup order: exact match in the table, then the repository rule
/// (`repositories.<X>Repository` becomes `repos.<plural X>`). Misses are left
/// to the caller, which emits a placeholder.
#[derive(Debug, Clone, Default)]
pub struct DependencyRegistry {
    mappings: HashMap<String, DependencyResolution>,
}

impl DependencyRegistry {
    /// An empty registry; only the repository rule applies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the infrastructure singletons under `infra_module`.
    pub fn standard(infra_module: &str) -> Self {
        let base = infra_module.trim_end_matches('/');
        let import = |pkg: &str| Some(format!("{base}/pkg/{pkg}"));

        let mut registry = Self::new();
        registry.add_mapping("*auth.Service", "infra.AuthService", import("auth"));
        registry.add_mapping("events.Publisher", "infra.EventPublisher", import("events"));
        registry.add_mapping("*events.Publisher", "infra.EventPublisher", import("events"));
        registry.add_mapping(
            "*executor.ExecutorService[map[string]any, map[string]any]",
            "infra.ExecutorService",
            import("executor"),
        );
        registry.add_mapping("*config.Config", "cfg", None);
        registry
    }

    /// Add or replace the mapping for `type_expr`. Last write wins.
    pub fn add_mapping(
        &mut self,
        type_expr: impl Into<String>,
        expression: impl Into<String>,
        import: Option<String>,
    ) {
        self.mappings.insert(
            type_expr.into(),
            DependencyResolution::new(expression, import),
        );
    }

    pub fn resolve(&self, type_expr: &str) -> Option<DependencyResolution> {
        if let Some(found) = self.mappings.get(type_expr) {
            return Some(found.clone());
        }
        REPOSITORY_TYPE.captures(type_expr).map(|caps| {
            DependencyResolution::new(format!("repos.{}", pluralize(&caps[1])), None)
        })
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Expression emitted for a dependency that needs manual wiring.
pub fn placeholder(type_expr: &str) -> String {
    format!("/* TODO: resolve {type_expr} */")
}
