use super::error::{SpecError, ValidationIssue};
use super::load::METHODS;
use super::types::{
    ApiModel, OperationDef, ParameterDef, ParameterLocation, RequestBodyDef, ResponseDef,
    SchemaDef, SecurityRequirement, SecuritySchemeDef,
};
use super::xcodegen::decode_xcodegen;
use crate::naming::pascal_case;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

static PATH_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}/]+)\}").expect("path template regex should be valid"));

/// Convert a document title to a lowercase identifier
///
/// Every character that is not ASCII alphanumeric becomes `_`, and leading or
/// trailing underscores are trimmed.
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    slug.trim_matches('_').to_string()
}

/// Last segment of an internal reference such as `#/components/schemas/User`.
fn ref_name(reference: &str) -> String {
    reference
        .rsplit('/')
        .next()
        .unwrap_or(reference)
        .replace("~1", "/")
        .replace("~0", "~")
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn non_empty(value: &Value, key: &str) -> Option<String> {
    str_field(value, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolves component references and turns raw schema objects into [`SchemaDef`]s.
struct SchemaBuilder<'a> {
    doc: &'a Value,
}

impl<'a> SchemaBuilder<'a> {
    fn component(&self, kind: &str, name: &str) -> Option<&'a Value> {
        self.doc.get("components")?.get(kind)?.get(name)
    }

    /// Follow a chain of `$ref`s through `components.<kind>`.
    fn resolve(&self, kind: &str, value: &'a Value) -> &'a Value {
        let mut current = value;
        let mut seen = HashSet::new();
        while let Some(reference) = str_field(current, "$ref") {
            let name = ref_name(reference);
            if !seen.insert(name.clone()) {
                break;
            }
            match self.component(kind, &name) {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    /// Build a top-level component schema, including its extensions.
    fn build_named(
        &self,
        name: &str,
        raw: &Value,
        issues: &mut Vec<ValidationIssue>,
    ) -> SchemaDef {
        let mut def = self.build(name, raw);
        def.ownership = non_empty(raw, "x-internal");
        if let Some(ext) = raw.get("x-codegen") {
            match decode_xcodegen(name, ext) {
                Ok(codegen) => {
                    def.kind = codegen.kind;
                    def.codegen = Some(codegen);
                }
                Err(mut found) => issues.append(&mut found),
            }
        }
        def
    }

    /// Build a property-level schema.
    fn build(&self, name: &str, raw: &Value) -> SchemaDef {
        let description = str_field(raw, "description").map(str::to_string);

        if let Some(reference) = str_field(raw, "$ref") {
            let target = ref_name(reference);
            let (schema_type, format) = self
                .component("schemas", &target)
                .map(|t| (parse_type(t).0, str_field(t, "format").map(str::to_string)))
                .unwrap_or((None, None));
            return SchemaDef {
                name: name.to_string(),
                schema_type,
                format,
                description,
                reference: Some(target),
                ..SchemaDef::default()
            };
        }

        let (schema_type, nullable) = parse_type(raw);
        let mut properties = BTreeMap::new();
        let mut required = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect_members(raw, &mut properties, &mut required, &mut visited);

        let items = raw
            .get("items")
            .filter(|i| i.is_object())
            .map(|i| Box::new(self.build(name, i)));

        let enum_values = raw
            .get("enum")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        SchemaDef {
            name: name.to_string(),
            schema_type,
            format: str_field(raw, "format").map(str::to_string),
            description,
            properties,
            required,
            items,
            enum_values,
            nullable: nullable || raw.get("nullable").and_then(Value::as_bool).unwrap_or(false),
            ..SchemaDef::default()
        }
    }

    /// Walk `allOf` members first, then overlay the schema's own properties.
    fn collect_members(
        &self,
        raw: &Value,
        properties: &mut BTreeMap<String, SchemaDef>,
        required: &mut BTreeSet<String>,
        visited: &mut HashSet<String>,
    ) {
        if let Some(members) = raw.get("allOf").and_then(Value::as_array) {
            for member in members {
                match str_field(member, "$ref") {
                    Some(reference) => {
                        let target = ref_name(reference);
                        if !visited.insert(target.clone()) {
                            continue;
                        }
                        if let Some(base) = self.component("schemas", &target) {
                            self.collect_members(base, properties, required, visited);
                        }
                    }
                    None => self.collect_members(member, properties, required, visited),
                }
            }
        }

        if let Some(own) = raw.get("properties").and_then(Value::as_object) {
            for (prop, body) in own {
                properties.insert(prop.clone(), self.build(prop, body));
            }
        }
        if let Some(names) = raw.get("required").and_then(Value::as_array) {
            required.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
        }
    }
}

/// Returns the effective type and whether `null` was part of a type array.
fn parse_type(raw: &Value) -> (Option<String>, bool) {
    match raw.get("type") {
        Some(Value::String(t)) => (Some(t.clone()), false),
        Some(Value::Array(types)) => {
            let nullable = types.iter().any(|t| t.as_str() == Some("null"));
            let first = types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(str::to_string);
            (first, nullable)
        }
        _ if raw.get("properties").is_some() || raw.get("allOf").is_some() => {
            (Some("object".to_string()), false)
        }
        _ => (None, false),
    }
}

fn extract_security_schemes(doc: &Value) -> BTreeMap<String, SecuritySchemeDef> {
    let Some(schemes) = doc
        .get("components")
        .and_then(|c| c.get("securitySchemes"))
        .and_then(Value::as_object)
    else {
        return BTreeMap::new();
    };

    schemes
        .iter()
        .map(|(name, raw)| {
            let def = SecuritySchemeDef {
                name: name.clone(),
                scheme_type: str_field(raw, "type").unwrap_or_default().to_string(),
                scheme: str_field(raw, "scheme")
                    .unwrap_or_default()
                    .to_ascii_lowercase(),
                location: str_field(raw, "in").map(str::to_string),
            };
            (name.clone(), def)
        })
        .collect()
}

/// Flatten a security requirement list into `(scheme name, scopes)` pairs.
fn flatten_security(entries: &[Value]) -> Vec<(String, Vec<String>)> {
    entries
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|entry| {
            entry.iter().map(|(name, scopes)| {
                let scopes = scopes
                    .as_array()
                    .map(|s| s.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                (name.clone(), scopes)
            })
        })
        .collect()
}

/// Resolve the effective security of one operation.
///
/// `x-public-endpoint` wins, then the operation's own `security`, then the root
/// `security`, and finally every declared scheme.
fn resolve_security(
    doc: &Value,
    op: &Value,
    schemes: &BTreeMap<String, SecuritySchemeDef>,
) -> Vec<SecurityRequirement> {
    if op.get("x-public-endpoint").and_then(Value::as_bool) == Some(true) {
        return Vec::new();
    }

    let pairs = if let Some(own) = op.get("security").and_then(Value::as_array) {
        flatten_security(own)
    } else if let Some(root) = doc.get("security").and_then(Value::as_array) {
        flatten_security(root)
    } else {
        schemes.keys().map(|name| (name.clone(), Vec::new())).collect()
    };

    pairs
        .into_iter()
        .map(|(name, scopes)| {
            let (scheme_type, scheme) = match schemes.get(&name) {
                Some(def)
                    if def.scheme_type == "apiKey" && def.location.as_deref() == Some("cookie") =>
                {
                    (def.scheme_type.clone(), "cookie".to_string())
                }
                Some(def) => (def.scheme_type.clone(), def.scheme.clone()),
                None => (String::new(), String::new()),
            };
            SecurityRequirement {
                name,
                scheme_type,
                scheme,
                scopes,
            }
        })
        .collect()
}

/// Pick the content entry to build a body from, preferring JSON.
fn pick_content(content: Option<&Value>) -> Option<(String, &Value)> {
    let map = content?.as_object()?;
    map.get_key_value("application/json")
        .or_else(|| map.iter().next())
        .map(|(ct, media)| (ct.clone(), media))
}

struct OperationBuilder<'a> {
    doc: &'a Value,
    schemas: SchemaBuilder<'a>,
    security_schemes: &'a BTreeMap<String, SecuritySchemeDef>,
}

impl<'a> OperationBuilder<'a> {
    /// Merge path-level and operation-level parameters.
    ///
    /// Operation parameters override path-level ones with the same
    /// `(name, in)`. Path template segments that are not declared are
    /// synthesized as required string path parameters.
    fn extract_parameters(
        &self,
        path: &str,
        shared: Option<&'a Value>,
        own: Option<&'a Value>,
        location: &str,
        issues: &mut Vec<ValidationIssue>,
    ) -> Vec<ParameterDef> {
        let mut merged: Vec<ParameterDef> = Vec::new();
        let raw_params = shared
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .chain(own.and_then(Value::as_array).into_iter().flatten());

        for raw in raw_params {
            let param = self.schemas.resolve("parameters", raw);
            let Some(name) = str_field(param, "name") else {
                issues.push(ValidationIssue::new(
                    location,
                    "parameter_name",
                    "parameter is missing a name",
                ));
                continue;
            };
            let loc_str = str_field(param, "in").unwrap_or_default();
            let Some(loc) = ParameterLocation::parse(loc_str) else {
                issues.push(ValidationIssue::new(
                    location,
                    "parameter_location",
                    format!("parameter `{name}` has unsupported location `{loc_str}`"),
                ));
                continue;
            };
            let def = ParameterDef {
                name: name.to_string(),
                location: loc,
                required: loc == ParameterLocation::Path
                    || param.get("required").and_then(Value::as_bool).unwrap_or(false),
                description: str_field(param, "description").map(str::to_string),
                schema: param.get("schema").map(|s| self.schemas.build(name, s)),
            };
            match merged
                .iter_mut()
                .find(|p| p.name == def.name && p.location == def.location)
            {
                Some(existing) => *existing = def,
                None => merged.push(def),
            }
        }

        for caps in PATH_TEMPLATE.captures_iter(path) {
            let name = &caps[1];
            let declared = merged
                .iter()
                .any(|p| p.location == ParameterLocation::Path && p.name == name);
            if !declared {
                debug!(path, param = name, "synthesizing undeclared path parameter");
                merged.push(ParameterDef {
                    name: name.to_string(),
                    location: ParameterLocation::Path,
                    required: true,
                    description: None,
                    schema: Some(SchemaDef {
                        name: name.to_string(),
                        schema_type: Some("string".to_string()),
                        ..SchemaDef::default()
                    }),
                });
            }
        }

        merged
    }

    fn extract_request_body(&self, op_id: &str, op: &'a Value) -> Option<RequestBodyDef> {
        let body = self.schemas.resolve("requestBodies", op.get("requestBody")?);
        let (content_type, media) = match pick_content(body.get("content")) {
            Some((ct, media)) => (ct, Some(media)),
            None => ("application/json".to_string(), None),
        };
        let schema_name = format!("{}Request", pascal_case(op_id));
        Some(RequestBodyDef {
            required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
            content_type,
            schema: media
                .and_then(|m| m.get("schema"))
                .map(|s| self.schemas.build(&schema_name, s)),
        })
    }

    fn extract_responses(&self, op_id: &str, op: &'a Value) -> Vec<ResponseDef> {
        let Some(responses) = op.get("responses").and_then(Value::as_object) else {
            return Vec::new();
        };
        let mut out: Vec<ResponseDef> = responses
            .iter()
            .map(|(status, raw)| {
                let resp = self.schemas.resolve("responses", raw);
                let picked = pick_content(resp.get("content"));
                let schema_name = format!("{}{}Response", pascal_case(op_id), pascal_case(status));
                ResponseDef {
                    status: status.clone(),
                    description: str_field(resp, "description").map(str::to_string),
                    content_type: picked.as_ref().map(|(ct, _)| ct.clone()),
                    schema: picked
                        .and_then(|(_, media)| media.get("schema"))
                        .map(|s| self.schemas.build(&schema_name, s)),
                }
            })
            .collect();
        out.sort_by(|a, b| a.status.cmp(&b.status));
        out
    }

    /// Build one operation, recording every metadata violation at `{path} → {METHOD}`.
    fn build_operation(
        &self,
        path: &str,
        method_str: &str,
        item: &'a Value,
        op: &'a Value,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<OperationDef> {
        let upper = method_str.to_ascii_uppercase();
        let location = format!("{path} → {upper}");

        let tags: Vec<&str> = op
            .get("tags")
            .and_then(Value::as_array)
            .map(|t| t.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if tags.len() != 1 {
            issues.push(ValidationIssue::new(
                &location,
                "operation_tags",
                format!("operation must have exactly one tag, found {}", tags.len()),
            ));
        }

        let id = non_empty(op, "operationId");
        if id.is_none() {
            issues.push(ValidationIssue::new(
                &location,
                "missing_operation_id",
                "operationId must be present and non-empty",
            ));
        }

        let summary = non_empty(op, "summary");
        if summary.is_none() {
            issues.push(ValidationIssue::new(
                &location,
                "missing_summary",
                "summary must be present and non-empty",
            ));
        }

        let method = match Method::from_bytes(upper.as_bytes()) {
            Ok(m) => m,
            Err(err) => {
                issues.push(ValidationIssue::new(&location, "method", err.to_string()));
                return None;
            }
        };

        let id = id?;
        let parameters = self.extract_parameters(
            path,
            item.get("parameters"),
            op.get("parameters"),
            &location,
            issues,
        );

        Some(OperationDef {
            request_body: self.extract_request_body(&id, op),
            responses: self.extract_responses(&id, op),
            security: resolve_security(self.doc, op, self.security_schemes),
            id,
            method,
            path: path.to_string(),
            summary: summary.unwrap_or_default(),
            description: str_field(op, "description").map(str::to_string),
            tag: tags.first().map(|t| t.to_string()).unwrap_or_default(),
            parameters,
            ownership: non_empty(op, "x-internal"),
            custom_handler: op
                .get("x-codegen-custom-handler")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

/// Build the IR from a bundled OpenAPI document
///
/// # Arguments
///
/// * `doc` - The bundled document, all refs internal
/// * `context` - Generation context that ownership tags are compared against
///
/// # Returns
///
/// The [`ApiModel`] with schemas ordered by name and operations by operation ID
///
/// # Errors
///
/// Returns [`SpecError::Malformed`] when the root is not a mapping, and
/// [`SpecError::Invalid`] carrying every offending field when any operation or
/// `x-codegen` extension breaks a generation rule.
pub fn build_model(doc: &Value, context: &str) -> Result<ApiModel, SpecError> {
    if !doc.is_object() {
        return Err(SpecError::Malformed {
            message: "document root must be a mapping".to_string(),
        });
    }
    let info = doc.get("info").unwrap_or(&Value::Null);
    let title = str_field(info, "title").unwrap_or_default().to_string();
    let version = str_field(info, "version").unwrap_or_default().to_string();
    let project_name = non_empty(doc, "x-project-name").unwrap_or_else(|| slugify(&title));

    let mut issues = Vec::new();
    let builder = SchemaBuilder { doc };

    let empty = Map::new();
    let raw_schemas = doc
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let mut schemas: Vec<SchemaDef> = raw_schemas
        .iter()
        .map(|(name, raw)| builder.build_named(name, raw, &mut issues))
        .collect();
    schemas.sort_by(|a, b| a.name.cmp(&b.name));

    let security_schemes = extract_security_schemes(doc);
    let ops = OperationBuilder {
        doc,
        schemas: SchemaBuilder { doc },
        security_schemes: &security_schemes,
    };

    let mut operations = Vec::new();
    let mut seen_ids: HashMap<String, String> = HashMap::new();
    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            for method in METHODS {
                let Some(op) = item.get(method) else {
                    continue;
                };
                let Some(def) = ops.build_operation(path, method, item, op, &mut issues) else {
                    continue;
                };
                let location = format!("{path} → {}", def.method);
                if let Some(first) = seen_ids.insert(def.id.clone(), location.clone()) {
                    issues.push(ValidationIssue::new(
                        location,
                        "duplicate_operation_id",
                        format!("operationId `{}` is already used by {first}", def.id),
                    ));
                    continue;
                }
                operations.push(def);
            }
        }
    }
    operations.sort_by(|a, b| a.id.cmp(&b.id));

    if !issues.is_empty() {
        return Err(SpecError::Invalid { issues });
    }

    let mut tags: Vec<String> = doc
        .get("tags")
        .and_then(Value::as_array)
        .map(|t| t.iter().filter_map(|tag| non_empty(tag, "name")).collect())
        .unwrap_or_default();
    let undeclared: BTreeSet<String> = operations
        .iter()
        .map(|o| o.tag.clone())
        .filter(|t| !tags.contains(t))
        .collect();
    tags.extend(undeclared);

    debug!(
        schemas = schemas.len(),
        operations = operations.len(),
        context,
        "built API model"
    );

    Ok(ApiModel {
        title,
        version,
        project_name,
        context: context.to_string(),
        schemas,
        operations,
        security_schemes,
        tags,
        document: doc.clone(),
    })
}
