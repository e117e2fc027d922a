use super::xcodegen::{SchemaKind, XCodegen};
use crate::naming::{pascal_case, sorted_properties};
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// A named type, or a property of one.
///
/// Properties are themselves `SchemaDef`s. A property that points at a component
/// (`$ref`) carries the target in `reference` and has no body of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDef {
    pub name: String,
    pub kind: SchemaKind,
    /// OpenAPI `type`, with `null` removed from type arrays
    pub schema_type: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
    pub properties: BTreeMap<String, SchemaDef>,
    pub required: BTreeSet<String>,
    pub items: Option<Box<SchemaDef>>,
    pub enum_values: Vec<String>,
    /// Component name this schema points at
    pub reference: Option<String>,
    pub nullable: bool,
    /// `x-internal` tag, `None` means owned by the current context
    pub ownership: Option<String>,
    pub codegen: Option<XCodegen>,
}

impl SchemaDef {
    pub fn is_required(&self, property: &str) -> bool {
        self.required.contains(property)
    }

    pub fn is_array(&self) -> bool {
        self.schema_type.as_deref() == Some("array")
    }

    /// An inline object body with at least one property.
    pub fn is_inline_object(&self) -> bool {
        self.reference.is_none() && !self.properties.is_empty()
    }

    /// Properties in the canonical generation order.
    pub fn sorted_property_names(&self) -> Vec<String> {
        sorted_properties(self.properties.keys())
    }

    /// Entities that carry an `id` property get repositories and tables.
    pub fn is_repository_eligible(&self) -> bool {
        self.kind == SchemaKind::Entity && self.properties.contains_key("id")
    }

    pub fn is_owned_by(&self, context: &str) -> bool {
        is_owned(self.ownership.as_deref(), context)
    }

    /// Synthesize named types for inline object properties, depth first.
    ///
    /// An inline object property (or an array whose items are an inline object)
    /// becomes `ParentName + PascalCase(property)`. A type name is emitted once
    /// even when several properties synthesize the same name. `$ref` properties
    /// are pointers and are never walked.
    pub fn collect_nested_types(&self) -> Vec<SchemaDef> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        collect_nested(&self.name, self, &mut visited, &mut out);
        out
    }
}

fn collect_nested(
    parent: &str,
    schema: &SchemaDef,
    visited: &mut HashSet<String>,
    out: &mut Vec<SchemaDef>,
) {
    for prop_name in schema.sorted_property_names() {
        let Some(prop) = schema.properties.get(&prop_name) else {
            continue;
        };
        let body = if prop.is_inline_object() {
            prop
        } else if let Some(items) = prop.items.as_deref().filter(|i| i.is_inline_object()) {
            items
        } else {
            continue;
        };

        let type_name = nested_type_name(parent, &prop_name);
        if !visited.insert(type_name.clone()) {
            continue;
        }
        let mut nested = body.clone();
        nested.name = type_name.clone();
        nested.reference = None;
        out.push(nested);
        collect_nested(&type_name, body, visited, out);
    }
}

/// Name given to the inline object behind `parent.property`.
pub fn nested_type_name(parent: &str, property: &str) -> String {
    format!("{}{}", parent, pascal_case(property))
}

/// Ownership rule shared by schemas and operations: untagged, or tagged with the
/// current context, means owned.
pub fn is_owned(ownership: Option<&str>, context: &str) -> bool {
    match ownership {
        None => true,
        Some(tag) => tag.is_empty() || tag == context,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<SchemaDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBodyDef {
    pub required: bool,
    pub content_type: String,
    pub schema: Option<SchemaDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDef {
    pub status: String,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub schema: Option<SchemaDef>,
}

impl ResponseDef {
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }
}

/// One resolved security requirement of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub name: String,
    /// Scheme type (`http`, `apiKey`, `oauth2`, ...), empty when undeclared
    pub scheme_type: String,
    /// Scheme string (`bearer`, `basic`, `cookie`, ...)
    pub scheme: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySchemeDef {
    pub name: String,
    pub scheme_type: String,
    pub scheme: String,
    /// `in` of an apiKey scheme
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDef {
    pub id: String,
    pub method: Method,
    pub path: String,
    pub summary: String,
    pub description: Option<String>,
    pub tag: String,
    pub parameters: Vec<ParameterDef>,
    pub request_body: Option<RequestBodyDef>,
    pub responses: Vec<ResponseDef>,
    pub security: Vec<SecurityRequirement>,
    pub ownership: Option<String>,
    pub custom_handler: bool,
}

impl OperationDef {
    pub fn is_owned_by(&self, context: &str) -> bool {
        is_owned(self.ownership.as_deref(), context)
    }

    pub fn success_response(&self) -> Option<&ResponseDef> {
        self.responses.iter().find(|r| r.is_success())
    }

    pub fn path_parameters(&self) -> impl Iterator<Item = &ParameterDef> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }

    pub fn is_public(&self) -> bool {
        self.security.is_empty()
    }
}

/// The IR: everything generators may read, built once per document load.
#[derive(Debug, Clone, Default)]
pub struct ApiModel {
    pub title: String,
    pub version: String,
    /// `x-project-name`, or a slug of the title
    pub project_name: String,
    /// Generation context ownership tags are compared against
    pub context: String,
    /// Component schemas ordered by name
    pub schemas: Vec<SchemaDef>,
    /// Operations ordered by operation ID
    pub operations: Vec<OperationDef>,
    pub security_schemes: BTreeMap<String, SecuritySchemeDef>,
    /// Tag names in document order
    pub tags: Vec<String>,
    /// The bundled document the model was built from
    pub document: Value,
}

impl ApiModel {
    pub fn schema(&self, name: &str) -> Option<&SchemaDef> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn own_schemas(&self) -> impl Iterator<Item = &SchemaDef> {
        self.schemas.iter().filter(|s| s.is_owned_by(&self.context))
    }

    pub fn own_operations(&self) -> impl Iterator<Item = &OperationDef> {
        self.operations
            .iter()
            .filter(|o| o.is_owned_by(&self.context))
    }

    pub fn composed_operations(&self) -> impl Iterator<Item = &OperationDef> {
        self.operations
            .iter()
            .filter(|o| !o.is_owned_by(&self.context))
    }

    /// Distinct ownership tags of everything generated elsewhere.
    pub fn composed_packages(&self) -> BTreeSet<String> {
        let from_ops = self.composed_operations().filter_map(|o| o.ownership.clone());
        let from_schemas = self
            .schemas
            .iter()
            .filter(|s| !s.is_owned_by(&self.context))
            .filter_map(|s| s.ownership.clone());
        from_ops.chain(from_schemas).collect()
    }

    /// No owned operations but at least one composed package: only a thin
    /// aggregator over those packages is generated.
    pub fn is_composition_app(&self) -> bool {
        self.own_operations().next().is_none() && !self.composed_packages().is_empty()
    }

    /// Own operations grouped by tag, in tag order.
    pub fn operations_by_tag(&self) -> BTreeMap<String, Vec<&OperationDef>> {
        let mut groups: BTreeMap<String, Vec<&OperationDef>> = BTreeMap::new();
        for op in self.own_operations() {
            groups.entry(op.tag.clone()).or_default().push(op);
        }
        groups
    }
}
