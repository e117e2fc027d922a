//! Project configuration loaded from `specgen.toml`.
//!
//! The file sits next to the OpenAPI spec (or is passed with `--config`).
//! Command-line flags override anything set here.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "specgen.toml";

/// Extra entry for the dependency registry.
///
/// ```toml
/// [[dependencies]]
/// type = "*billing.Client"
/// expression = "infra.Billing"
/// import = "github.com/acme/shop/pkg/billing"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyMapping {
    #[serde(rename = "type")]
    pub type_expr: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
}

/// Contents of `specgen.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpecgenConfig {
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Go module path of the generated code
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub go_version: Option<String>,
    /// Ownership context
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub handlers_dir: Option<PathBuf>,
    #[serde(default)]
    pub only: Vec<String>,
    /// Base import path of the infrastructure packages
    #[serde(default)]
    pub infra_module: Option<String>,
    /// Run `gofmt` on the output
    #[serde(default)]
    pub format: bool,
    #[serde(default)]
    pub dependencies: Vec<DependencyMapping>,
    /// On-disk fragments, `name = "dir"`
    #[serde(default)]
    pub fragments: BTreeMap<String, PathBuf>,
}

impl SpecgenConfig {
    /// Resolve relative paths against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(output) = self.output.as_mut() {
            resolve(output);
        }
        if let Some(dir) = self.handlers_dir.as_mut() {
            resolve(dir);
        }
        for dir in self.fragments.values_mut() {
            resolve(dir);
        }
    }
}

/// Load `config_path`.
///
/// Returns `Ok(None)` when the file doesn't exist, and an error when it exists
/// but fails to parse. Relative paths in the file are resolved against the
/// file's directory.
pub fn load_config(config_path: &Path) -> anyhow::Result<Option<SpecgenConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
    let mut config: SpecgenConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(Some(config))
}

/// `specgen.toml` in the same directory as the spec, if there is one.
pub fn detect_config(spec_path: &Path) -> Option<PathBuf> {
    let candidate = spec_path.parent()?.join(CONFIG_FILE_NAME);
    candidate.exists().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap().is_none());
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
output = "backend"
module = "github.com/acme/shop"
context = "billing"
only = ["models", "sql"]
format = true

[[dependencies]]
type = "*billing.Client"
expression = "infra.Billing"
import = "github.com/acme/shop/pkg/billing"

[fragments]
audit = "fragments/audit"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap().unwrap();
        assert_eq!(config.output, Some(dir.path().join("backend")));
        assert_eq!(config.module.as_deref(), Some("github.com/acme/shop"));
        assert_eq!(config.context.as_deref(), Some("billing"));
        assert_eq!(config.only, vec!["models", "sql"]);
        assert!(config.format);
        assert_eq!(config.dependencies[0].type_expr, "*billing.Client");
        assert_eq!(config.fragments["audit"], dir.path().join("fragments/audit"));
        assert!(config.handlers_dir.is_none());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "outptu = 3\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_detect_config() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("openapi.yaml");
        assert!(detect_config(&spec).is_none());
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(detect_config(&spec), Some(dir.path().join(CONFIG_FILE_NAME)));
    }
}
