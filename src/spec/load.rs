use super::build::build_model;
use super::types::ApiModel;
use anyhow::{bail, Context};
use oas3::OpenApiV3Spec;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Component sections a document (or a fragment) may spread over directories.
pub const COMPONENT_KINDS: [&str; 10] = [
    "schemas",
    "responses",
    "parameters",
    "headers",
    "requestBodies",
    "securitySchemes",
    "examples",
    "links",
    "callbacks",
    "pathItems",
];

pub const METHODS: [&str; 8] = [
    "get", "post", "put", "delete", "patch", "options", "head", "trace",
];

/// Nesting limit for inlined file refs; deeper chains are treated as cycles.
const MAX_INLINE_DEPTH: usize = 32;

fn strip_unknown_verbs(val: &mut Value) {
    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

/// Convert a YAML value to JSON, stringifying non-string mapping keys
/// (`200:` becomes `"200"`).
pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(out)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Read one YAML or JSON file into a JSON value.
pub fn read_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path.extension().is_some_and(|e| e == "json");
    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    } else {
        let yaml: serde_yaml::Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(yaml_to_json(yaml))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Component kind owning a file, judged by its parent directory name.
fn component_kind_of(path: &Path) -> Option<&'static str> {
    let dir = path.parent()?.file_name()?.to_str()?;
    COMPONENT_KINDS
        .iter()
        .copied()
        .find(|kind| kind.eq_ignore_ascii_case(dir))
}

fn is_external_ref(reference: &str) -> bool {
    !reference.starts_with('#') && !reference.contains("://")
}

fn file_ref(value: &Value) -> Option<&str> {
    value
        .get("$ref")
        .and_then(Value::as_str)
        .filter(|r| is_external_ref(r))
}

/// Folds a multi-file document into one with internal refs only.
struct Bundler {
    pending: Vec<(&'static str, String, PathBuf)>,
}

impl Bundler {
    fn load_file(&mut self, path: &Path, pointer: &str, depth: usize) -> anyhow::Result<Value> {
        if depth > MAX_INLINE_DEPTH {
            bail!("reference chain too deep at {}, possible cycle", path.display());
        }
        let document = read_document(path)?;
        let mut value = if pointer.is_empty() {
            document
        } else {
            document
                .pointer(pointer)
                .cloned()
                .with_context(|| format!("{}#{} does not exist", path.display(), pointer))?
        };
        let base = path.parent().unwrap_or(Path::new("."));
        self.rewrite_refs(&mut value, base, depth + 1)?;
        Ok(value)
    }

    fn rewrite_refs(&mut self, value: &mut Value, base: &Path, depth: usize) -> anyhow::Result<()> {
        match value {
            Value::Object(map) => {
                if let Some(reference) =
                    map.get("$ref").and_then(Value::as_str).map(str::to_string)
                {
                    if is_external_ref(&reference) {
                        let (file, pointer) = reference
                            .split_once('#')
                            .unwrap_or((reference.as_str(), ""));
                        let target = normalize(&base.join(file));
                        match component_kind_of(&target) {
                            Some(kind) => {
                                let name = target
                                    .file_stem()
                                    .and_then(|s| s.to_str())
                                    .unwrap_or_default()
                                    .to_string();
                                map.insert(
                                    "$ref".to_string(),
                                    Value::String(format!("#/components/{kind}/{name}")),
                                );
                                self.pending.push((kind, name, target));
                            }
                            None => {
                                *value = self.load_file(&target, pointer, depth)?;
                            }
                        }
                        return Ok(());
                    }
                }
                for child in map.values_mut() {
                    self.rewrite_refs(child, base, depth)?;
                }
            }
            Value::Array(items) => {
                for child in items {
                    self.rewrite_refs(child, base, depth)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Inline a `{ $ref: file }` entry, or rewrite refs inside an inline one.
    fn resolve_entry(&mut self, entry: &mut Value, base: &Path) -> anyhow::Result<()> {
        if let Some(reference) = file_ref(entry).map(str::to_string) {
            let (file, pointer) = reference.split_once('#').unwrap_or((reference.as_str(), ""));
            *entry = self.load_file(&normalize(&base.join(file)), pointer, 0)?;
            Ok(())
        } else {
            self.rewrite_refs(entry, base, 0)
        }
    }
}

fn object_entry<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> anyhow::Result<&'a mut Map<String, Value>> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(map) => Ok(map),
        _ => bail!("'{key}' must be a mapping"),
    }
}

/// Load a root document and everything it references into one document.
///
/// Root-level `paths` and `components` entries that are file refs are inlined.
/// Nested refs into component directories become `#/components/<kind>/<stem>`
/// and the target is registered when missing. Other nested file refs are
/// inlined. Path files under `paths/` that carry `x-path` and are not declared
/// in the root are discovered and added.
///
/// # Errors
///
/// Fails when a referenced file cannot be read or parsed, when a ref chain is
/// cyclic, or when `paths`/`components` are not mappings.
pub fn load_document(path: &Path) -> anyhow::Result<Value> {
    let mut doc = read_document(path)?;
    let root_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let mut bundler = Bundler {
        pending: Vec::new(),
    };

    let Value::Object(root) = &mut doc else {
        bail!("{} is not a mapping at the top level", path.display());
    };

    {
        let paths = object_entry(root, "paths")?;
        for item in paths.values_mut() {
            bundler.resolve_entry(item, &root_dir)?;
        }
        discover_path_files(&root_dir, paths, &mut bundler)?;
    }

    let components = object_entry(root, "components")?;
    for (_, section) in components.iter_mut() {
        if let Value::Object(entries) = section {
            for entry in entries.values_mut() {
                bundler.resolve_entry(entry, &root_dir)?;
            }
        }
    }

    let mut seen = HashSet::new();
    while let Some((kind, name, file)) = bundler.pending.pop() {
        if !seen.insert((kind, name.clone())) {
            continue;
        }
        let section = object_entry(components, kind)?;
        if section.contains_key(&name) {
            continue;
        }
        debug!(kind, name = %name, file = %file.display(), "registering referenced component");
        let value = bundler.load_file(&file, "", 0)?;
        let section = object_entry(components, kind)?;
        section.insert(name, value);
    }

    strip_unknown_verbs(&mut doc);
    Ok(doc)
}

fn discover_path_files(
    root_dir: &Path,
    paths: &mut Map<String, Value>,
    bundler: &mut Bundler,
) -> anyhow::Result<()> {
    let dir = root_dir.join("paths");
    if !dir.is_dir() {
        return Ok(());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    files.sort();

    for file in files {
        let raw = read_document(&file)?;
        let Some(x_path) = raw.get("x-path").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if paths.contains_key(&x_path) {
            continue;
        }
        let item = bundler.load_file(&file, "", 0)?;
        debug!(path = %x_path, file = %file.display(), "discovered path file");
        paths.insert(x_path, item);
    }
    Ok(())
}

/// Load, bundle, parse and build the IR for the document at `path`.
///
/// `context` is the ownership context: schemas and operations tagged with a
/// different `x-internal` value are treated as composed.
///
/// # Errors
///
/// Fails on unreadable files, documents `oas3` rejects, or any IR validation
/// issue (see [`SpecError`](super::SpecError)).
pub fn load_spec(path: &Path, context: &str) -> anyhow::Result<ApiModel> {
    let doc = load_document(path)?;

    let parsed: OpenApiV3Spec = serde_json::from_value(doc.clone())
        .with_context(|| format!("{} is not a valid OpenAPI document", path.display()))?;
    if !parsed.openapi.starts_with("3.") {
        bail!(
            "{}: unsupported OpenAPI version '{}', expected 3.x",
            path.display(),
            parsed.openapi
        );
    }
    debug!(
        title = %parsed.info.title,
        version = %parsed.info.version,
        "parsed OpenAPI document"
    );

    let model = build_model(&doc, context)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "x-path": "/x" }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("x-path").is_some());
    }

    #[test]
    fn test_yaml_integer_keys_become_strings() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("responses:\n  200:\n    description: ok\n").unwrap();
        let json = yaml_to_json(yaml);
        assert_eq!(json["responses"]["200"]["description"], "ok");
    }

    #[test]
    fn test_component_kind_of() {
        assert_eq!(
            component_kind_of(Path::new("spec/components/schemas/User.yaml")),
            Some("schemas")
        );
        assert_eq!(
            component_kind_of(Path::new("components/securityschemes/Bearer.yaml")),
            Some("securitySchemes")
        );
        assert_eq!(component_kind_of(Path::new("paths/users.yaml")), None);
    }

    #[test]
    fn test_normalize_parent_segments() {
        assert_eq!(
            normalize(Path::new("/a/paths/../components/schemas/User.yaml")),
            PathBuf::from("/a/components/schemas/User.yaml")
        );
    }
}
