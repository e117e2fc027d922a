use crate::spec::COMPONENT_KINDS;
use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SERVER_ROOT: &str = include_str!("../../fragments/server/openapi.yaml");
const SERVER_HEALTH_PATH: &str = include_str!("../../fragments/server/paths/health.yaml");
const SERVER_HEALTH_SCHEMA: &str =
    include_str!("../../fragments/server/components/schemas/HealthResponse.yaml");

/// Root document names tried, in order, when loading a fragment from disk.
const ROOT_DOCUMENTS: [&str; 3] = ["openapi.yaml", "openapi.yml", "openapi.json"];

/// A reusable bundle of OpenAPI files, enabled with `x-include-<name>: true`.
///
/// `files` holds component and path files relative to the fragment root, for
/// example `components/schemas/HealthResponse.yaml` or `paths/health.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    name: String,
    root_document: String,
    files: Vec<(PathBuf, String)>,
}

impl Fragment {
    /// Build a fragment from in-memory contents.
    pub fn embedded(name: &str, root_document: &str, files: &[(&str, &str)]) -> Self {
        Fragment {
            name: name.to_string(),
            root_document: root_document.to_string(),
            files: files
                .iter()
                .map(|(path, contents)| (PathBuf::from(path), contents.to_string()))
                .collect(),
        }
    }

    /// Load a fragment laid out on disk.
    ///
    /// The directory must hold a root document plus optional
    /// `components/<kind>/*.yaml` and `paths/*.yaml` files. Anything else in the
    /// directory is ignored.
    pub fn from_dir(name: &str, dir: &Path) -> anyhow::Result<Self> {
        let Some(root_path) = ROOT_DOCUMENTS
            .iter()
            .map(|f| dir.join(f))
            .find(|p| p.is_file())
        else {
            bail!(
                "fragment '{name}': no root document ({}) in {}",
                ROOT_DOCUMENTS.join(", "),
                dir.display()
            );
        };
        let root_document = fs::read_to_string(&root_path)
            .with_context(|| format!("failed to read {}", root_path.display()))?;

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(dir)
                .with_context(|| format!("{} escapes {}", entry.path().display(), dir.display()))?;
            if !is_bundle_file(rel) {
                continue;
            }
            let contents = fs::read_to_string(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            files.push((rel.to_path_buf(), contents));
        }

        Ok(Fragment {
            name: name.to_string(),
            root_document,
            files,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_document(&self) -> &str {
        &self.root_document
    }

    pub fn files(&self) -> &[(PathBuf, String)] {
        &self.files
    }
}

/// `components/<kind>/<file>` or `paths/<file>`, with a YAML or JSON extension.
fn is_bundle_file(rel: &Path) -> bool {
    let is_document = matches!(
        rel.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    );
    let parts: Vec<&str> = rel.iter().filter_map(|c| c.to_str()).collect();
    let in_bundle_dir = match parts.as_slice() {
        ["paths", _] => true,
        ["components", kind, _] => COMPONENT_KINDS.contains(kind),
        _ => false,
    };
    is_document && in_bundle_dir
}

/// Named fragments, in registration order.
///
/// Registration order is merge order: when two enabled fragments ship the
/// same file or component, the earlier one wins. Registering a name twice
/// replaces the earlier fragment in place.
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    fragments: Vec<Fragment>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the fragments shipped with the crate (`server`).
    ///
    /// Other fragments are registered from disk through `[fragments]` in `specgen.toml`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Fragment::embedded(
            "server",
            SERVER_ROOT,
            &[
                ("paths/health.yaml", SERVER_HEALTH_PATH),
                ("components/schemas/HealthResponse.yaml", SERVER_HEALTH_SCHEMA),
            ],
        ));
        registry
    }

    pub fn register(&mut self, fragment: Fragment) {
        match self.fragments.iter_mut().find(|f| f.name == fragment.name) {
            Some(existing) => *existing = fragment,
            None => self.fragments.push(fragment),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
