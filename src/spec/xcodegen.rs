//! Typed decoding of the `x-codegen` schema extension.
//!
//! The extension arrives as an untyped map. It is decoded into raw serde structs
//! first and then validated field by field into [`XCodegen`], so a malformed
//! extension yields one [`ValidationIssue`] per offending field instead of a
//! silently defaulted config.
//!
//! ```yaml
//! x-codegen:
//!   type: entity
//!   repository:
//!     operations: [create, read, update, delete, list]
//!     additionalMethods:
//!       - name: GetByEmail
//!         params: [email]
//!         returns: single
//!   database:
//!     table: users
//!     indices:
//!       - fields: [email]
//!         unique: true
//! ```

use super::error::ValidationIssue;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Generation role of a named schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaKind {
    /// Identity-bearing aggregate root, eligible for repositories and tables
    Entity,
    /// Plain data carrier
    #[default]
    ValueObject,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Entity => write!(f, "entity"),
            SchemaKind::ValueObject => write!(f, "valueobject"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RepositoryOperation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl RepositoryOperation {
    pub const ALL: [RepositoryOperation; 5] = [
        RepositoryOperation::Create,
        RepositoryOperation::Read,
        RepositoryOperation::Update,
        RepositoryOperation::Delete,
        RepositoryOperation::List,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Some(RepositoryOperation::Create),
            "read" => Some(RepositoryOperation::Read),
            "update" => Some(RepositoryOperation::Update),
            "delete" => Some(RepositoryOperation::Delete),
            "list" => Some(RepositoryOperation::List),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryOperation::Create => "create",
            RepositoryOperation::Read => "read",
            RepositoryOperation::Update => "update",
            RepositoryOperation::Delete => "delete",
            RepositoryOperation::List => "list",
        }
    }
}

/// Result shape of a custom repository method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multiple,
    Void,
    Exists,
    Count,
}

impl Cardinality {
    pub const ALLOWED: &'static str = "single, multiple, void, exists, count";

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Cardinality::Single),
            "multiple" => Some(Cardinality::Multiple),
            "void" => Some(Cardinality::Void),
            "exists" => Some(Cardinality::Exists),
            "count" => Some(Cardinality::Count),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::Multiple => "multiple",
            Cardinality::Void => "void",
            Cardinality::Exists => "exists",
            Cardinality::Count => "count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParam {
    pub name: String,
    /// Declared type, when the param was given as `{name, type}`
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalMethod {
    pub name: String,
    pub params: Vec<MethodParam>,
    pub returns: Cardinality,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationConfig {
    pub field: String,
    pub references: String,
    #[serde(default, alias = "on_delete")]
    pub on_delete: Option<String>,
    #[serde(default, alias = "on_update")]
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryConfig {
    pub name: String,
    /// sqlc command kind, e.g. `one`, `many`, `exec`
    #[serde(rename = "type")]
    pub kind: String,
    pub sql: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    #[serde(default)]
    pub indices: Vec<IndexConfig>,
    #[serde(default)]
    pub queries: Vec<QueryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub operations: Vec<RepositoryOperation>,
    pub indices: Vec<String>,
    pub additional_methods: Vec<AdditionalMethod>,
    pub relations: Vec<RelationConfig>,
}

impl RepositoryConfig {
    pub fn supports(&self, op: RepositoryOperation) -> bool {
        self.operations.contains(&op)
    }
}

/// Validated `x-codegen` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XCodegen {
    pub kind: SchemaKind,
    pub repository: Option<RepositoryConfig>,
    pub database: Option<DatabaseConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawXCodegen {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    repository: Option<RawRepository>,
    #[serde(default)]
    database: Option<DatabaseConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    #[serde(default)]
    operations: Option<Vec<String>>,
    #[serde(default)]
    indices: Vec<String>,
    #[serde(default, alias = "additional_methods")]
    additional_methods: Vec<RawMethod>,
    #[serde(default)]
    relations: Vec<RelationConfig>,
}

#[derive(Deserialize)]
struct RawMethod {
    name: String,
    #[serde(default)]
    params: Vec<RawParam>,
    returns: String,
    #[serde(default)]
    query: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParam {
    Name(String),
    Typed {
        name: String,
        #[serde(default, rename = "type")]
        type_name: Option<String>,
    },
}

impl From<RawParam> for MethodParam {
    fn from(raw: RawParam) -> Self {
        match raw {
            RawParam::Name(name) => MethodParam {
                name,
                type_name: None,
            },
            RawParam::Typed { name, type_name } => MethodParam { name, type_name },
        }
    }
}

/// Decode and validate the `x-codegen` extension of schema `schema_name`.
///
/// # Errors
///
/// Returns every offending field as a [`ValidationIssue`] located at
/// `schema:{schema_name}`. Unknown repository operations are only warned about.
pub fn decode_xcodegen(
    schema_name: &str,
    value: &Value,
) -> Result<XCodegen, Vec<ValidationIssue>> {
    let location = format!("schema:{schema_name}");
    let raw: RawXCodegen = serde_json::from_value(value.clone()).map_err(|e| {
        vec![ValidationIssue::new(
            &location,
            "x_codegen_decode",
            format!("malformed x-codegen extension: {e}"),
        )]
    })?;

    let mut issues = Vec::new();

    let kind = match raw.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("entity") => SchemaKind::Entity,
        Some("valueobject") => SchemaKind::ValueObject,
        Some(other) => {
            issues.push(ValidationIssue::new(
                &location,
                "x_codegen_type",
                format!("invalid x-codegen.type '{other}', expected entity or valueobject"),
            ));
            SchemaKind::default()
        }
        None => {
            issues.push(ValidationIssue::new(
                &location,
                "x_codegen_type",
                "x-codegen.type is required",
            ));
            SchemaKind::default()
        }
    };

    let repository = raw
        .repository
        .map(|repo| decode_repository(schema_name, &location, repo, &mut issues));

    if let Some(database) = &raw.database {
        for relation in &database.relations {
            if relation.field.trim().is_empty() || relation.references.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    &location,
                    "x_codegen_relation",
                    "database relation needs both field and references",
                ));
            }
        }
        for index in &database.indices {
            if index.fields.is_empty() {
                issues.push(ValidationIssue::new(
                    &location,
                    "x_codegen_index",
                    "database index declares no fields",
                ));
            }
        }
        for query in &database.queries {
            if query.sql.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    &location,
                    "x_codegen_query",
                    format!("database query '{}' has empty sql", query.name),
                ));
            }
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }
    Ok(XCodegen {
        kind,
        repository,
        database: raw.database,
    })
}

fn decode_repository(
    schema_name: &str,
    location: &str,
    raw: RawRepository,
    issues: &mut Vec<ValidationIssue>,
) -> RepositoryConfig {
    let operations = match raw.operations {
        None => RepositoryOperation::ALL.to_vec(),
        Some(names) => {
            let mut ops = Vec::new();
            for name in names {
                match RepositoryOperation::parse(&name) {
                    Some(op) if !ops.contains(&op) => ops.push(op),
                    Some(_) => {}
                    None => warn!(
                        schema = schema_name,
                        operation = %name,
                        "unknown repository operation ignored"
                    ),
                }
            }
            ops
        }
    };

    let mut additional_methods = Vec::new();
    for method in raw.additional_methods {
        if method.name.trim().is_empty() {
            issues.push(ValidationIssue::new(
                location,
                "x_codegen_method",
                "additional method has an empty name",
            ));
            continue;
        }
        match Cardinality::parse(&method.returns) {
            Some(returns) => additional_methods.push(AdditionalMethod {
                name: method.name,
                params: method.params.into_iter().map(MethodParam::from).collect(),
                returns,
                query: method.query,
            }),
            None => issues.push(ValidationIssue::new(
                location,
                "x_codegen_returns",
                format!(
                    "additional method '{}' has invalid returns '{}', expected one of {}",
                    method.name,
                    method.returns,
                    Cardinality::ALLOWED
                ),
            )),
        }
    }

    RepositoryConfig {
        operations,
        indices: raw.indices,
        additional_methods,
        relations: raw.relations,
    }
}
