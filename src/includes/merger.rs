use super::fragment::{Fragment, FragmentRegistry};
use crate::spec::{yaml_to_json, COMPONENT_KINDS};
use anyhow::{bail, Context};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const INCLUDE_PREFIX: &str = "x-include-";

/// Result of [`IncludeMerger::merge`].
///
/// When fragments were merged, `path` points into a scratch directory owned by
/// this value. Call [`MergedSpec::cleanup`] once the document has been loaded;
/// dropping the value also removes the directory.
#[derive(Debug)]
pub struct MergedSpec {
    path: PathBuf,
    includes: Vec<String>,
    scratch: Option<TempDir>,
}

impl MergedSpec {
    /// Root document to load: the merged copy, or the primary when nothing merged.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the fragments that were merged, in merge order.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn is_merged(&self) -> bool {
        self.scratch.is_some()
    }

    /// Remove the scratch directory. A no-op when nothing was merged.
    pub fn cleanup(self) -> io::Result<()> {
        match self.scratch {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

/// Composes a primary document with the fragments it enables.
///
/// Source files are never modified. The primary document's directory is
/// copied to a scratch directory and merged there. Conflicts resolve to the
/// first writer: the primary's own files and entries, then fragments in
/// registration order.
pub struct IncludeMerger {
    registry: FragmentRegistry,
}

impl IncludeMerger {
    pub fn new(registry: FragmentRegistry) -> Self {
        IncludeMerger { registry }
    }

    pub fn registry(&self) -> &FragmentRegistry {
        &self.registry
    }

    /// Merge every fragment enabled by `spec_path` into a scratch copy.
    ///
    /// # Errors
    ///
    /// Fails when the primary document or a fragment root cannot be read or
    /// parsed, or when the scratch directory cannot be written.
    pub fn merge(&self, spec_path: &Path) -> anyhow::Result<MergedSpec> {
        let text = fs::read_to_string(spec_path)
            .with_context(|| format!("failed to read {}", spec_path.display()))?;
        let root: Value = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse {}", spec_path.display()))?;
        let Value::Mapping(mut root) = root else {
            bail!("{}: document root must be a mapping", spec_path.display());
        };

        let enabled = self.enabled_fragments(&root);
        if enabled.is_empty() {
            debug!(spec = %spec_path.display(), "no includes enabled");
            return Ok(MergedSpec {
                path: spec_path.to_path_buf(),
                includes: Vec::new(),
                scratch: None,
            });
        }

        let source_dir = match spec_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(file_name) = spec_path.file_name() else {
            bail!("{} does not name a file", spec_path.display());
        };
        let scratch = tempfile::Builder::new()
            .prefix("specgen-merge-")
            .tempdir()
            .context("failed to create scratch directory")?;
        copy_tree(&source_dir, scratch.path())?;

        for fragment in &enabled {
            copy_fragment_files(fragment, scratch.path())?;
            let fragment_root: Value = serde_yaml::from_str(fragment.root_document())
                .with_context(|| format!("fragment '{}': invalid root document", fragment.name()))?;
            if let Value::Mapping(fragment_root) = fragment_root {
                merge_root(&mut root, fragment_root, fragment.name());
            }
        }
        add_undeclared_components(&mut root, scratch.path())?;
        strip_include_markers(&mut root);

        let merged_path = scratch.path().join(file_name);
        write_document(&merged_path, root)?;

        let includes: Vec<String> = enabled.iter().map(|f| f.name().to_string()).collect();
        info!(
            spec = %spec_path.display(),
            merged = %merged_path.display(),
            includes = ?includes,
            "merged include fragments"
        );
        Ok(MergedSpec {
            path: merged_path,
            includes,
            scratch: Some(scratch),
        })
    }

    /// Fragments switched on by `x-include-<name>: true`, in registration order.
    fn enabled_fragments(&self, root: &Mapping) -> Vec<&Fragment> {
        let mut requested = HashSet::new();
        for (key, value) in root {
            let Some(name) = key.as_str().and_then(|k| k.strip_prefix(INCLUDE_PREFIX)) else {
                continue;
            };
            if value.as_bool() != Some(true) {
                continue;
            }
            if self.registry.get(name).is_none() {
                warn!(
                    include = name,
                    known = ?self.registry.names(),
                    "unknown include fragment, skipping"
                );
                continue;
            }
            requested.insert(name.to_string());
        }
        self.registry
            .iter()
            .filter(|f| requested.contains(f.name()))
            .collect()
    }
}

fn copy_tree(from: &Path, to: &Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.with_context(|| format!("failed to walk {}", from.display()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("{} escapes {}", entry.path().display(), from.display()))?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Place a fragment's files into the scratch tree, never overwriting.
fn copy_fragment_files(fragment: &Fragment, scratch: &Path) -> anyhow::Result<()> {
    for (rel, contents) in fragment.files() {
        let target = scratch.join(rel);
        if target.exists() {
            let existing = fs::read_to_string(&target).unwrap_or_default();
            if existing != *contents {
                warn!(
                    fragment = fragment.name(),
                    file = %rel.display(),
                    "fragment file shadowed by an existing file with different contents"
                );
            }
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&target, contents)
            .with_context(|| format!("failed to write {}", target.display()))?;
    }
    Ok(())
}

/// Mapping under `key`, created when missing or null.
fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> Option<&'a mut Mapping> {
    let missing = parent.get(key).map_or(true, Value::is_null);
    if missing {
        parent.insert(Value::from(key), Value::Mapping(Mapping::new()));
    }
    parent.get_mut(key).and_then(Value::as_mapping_mut)
}

fn sequence<'a>(parent: &'a mut Mapping, key: &str) -> Option<&'a mut Vec<Value>> {
    let missing = parent.get(key).map_or(true, Value::is_null);
    if missing {
        parent.insert(Value::from(key), Value::Sequence(Vec::new()));
    }
    parent.get_mut(key).and_then(Value::as_sequence_mut)
}

/// Add every entry of `source` that `target` lacks. Existing entries win.
fn merge_by_key(target: &mut Mapping, source: Mapping, section: &str, fragment: &str) {
    for (key, value) in source {
        match target.get(&key) {
            Some(existing) => {
                if *existing != value {
                    warn!(
                        fragment,
                        section,
                        key = ?key.as_str().unwrap_or_default(),
                        "fragment entry shadowed by an existing entry with a different body"
                    );
                }
            }
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn tag_name(tag: &Value) -> Option<&str> {
    tag.get("name").and_then(Value::as_str)
}

/// Scheme name of a security requirement entry (its single top-level key).
fn requirement_name(entry: &Value) -> Option<&str> {
    entry.as_mapping()?.keys().next()?.as_str()
}

fn merge_root(root: &mut Mapping, fragment_root: Mapping, fragment: &str) {
    for (key, value) in fragment_root {
        let Some(section) = key.as_str() else {
            continue;
        };
        match (section, value) {
            ("paths", Value::Mapping(paths)) => {
                if let Some(target) = child_mapping(root, "paths") {
                    merge_by_key(target, paths, "paths", fragment);
                }
            }
            ("components", Value::Mapping(components)) => {
                let Some(target) = child_mapping(root, "components") else {
                    continue;
                };
                for (kind, entries) in components {
                    let (Some(kind), Value::Mapping(entries)) = (kind.as_str(), entries) else {
                        continue;
                    };
                    if let Some(target_kind) = child_mapping(target, kind) {
                        merge_by_key(target_kind, entries, kind, fragment);
                    }
                }
            }
            ("tags", Value::Sequence(tags)) => {
                let Some(target) = sequence(root, "tags") else {
                    continue;
                };
                for tag in tags {
                    let Some(name) = tag_name(&tag) else {
                        continue;
                    };
                    if !target.iter().any(|t| tag_name(t) == Some(name)) {
                        target.push(tag);
                    }
                }
            }
            ("security", Value::Sequence(requirements)) => {
                let Some(target) = sequence(root, "security") else {
                    continue;
                };
                for requirement in requirements {
                    let Some(name) = requirement_name(&requirement) else {
                        continue;
                    };
                    if !target.iter().any(|r| requirement_name(r) == Some(name)) {
                        target.push(requirement);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Declare component files that arrived by copy but are not listed in the root.
fn add_undeclared_components(root: &mut Mapping, scratch: &Path) -> anyhow::Result<()> {
    for kind in COMPONENT_KINDS {
        let dir = scratch.join("components").join(kind);
        if !dir.is_dir() {
            continue;
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
            })
            .collect();
        files.sort();
        if files.is_empty() {
            continue;
        }

        let Some(components) = child_mapping(root, "components") else {
            continue;
        };
        let Some(section) = child_mapping(components, kind) else {
            continue;
        };
        for file in files {
            let (Some(stem), Some(file_name)) = (
                file.file_stem().and_then(|s| s.to_str()),
                file.file_name().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            let reference = format!("components/{kind}/{file_name}");
            let declared = section.contains_key(stem)
                || section.values().any(|v| {
                    v.get("$ref")
                        .and_then(Value::as_str)
                        .map(|r| r.trim_start_matches("./") == reference)
                        .unwrap_or(false)
                });
            if declared {
                continue;
            }
            debug!(kind, name = stem, "declaring copied component");
            let mut entry = Mapping::new();
            entry.insert(Value::from("$ref"), Value::from(reference));
            section.insert(Value::from(stem), Value::Mapping(entry));
        }
    }
    Ok(())
}

fn strip_include_markers(root: &mut Mapping) {
    root.retain(|key, _| {
        !key
            .as_str()
            .map(|k| k.starts_with(INCLUDE_PREFIX))
            .unwrap_or(false)
    });
}

/// Write the merged root back in the primary document's own format.
fn write_document(path: &Path, root: Mapping) -> anyhow::Result<()> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let text = if is_json {
        serde_json::to_string_pretty(&yaml_to_json(Value::Mapping(root)))?
    } else {
        serde_yaml::to_string(&Value::Mapping(root))?
    };
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
