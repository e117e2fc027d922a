//! PostgreSQL DDL and sqlc query files for persisted entities.

use super::backend::persisted_entities;
use super::templates::{render, QueriesSqlTemplate, QueryView, SchemaSqlTemplate, TableView};
use super::{write_output, GEN_SQL};
use crate::naming::{pascal_case, pluralize, snake_case};
use crate::orchestrator::{Generator, GeneratorContext, Priority};
use crate::spec::{RelationConfig, RepositoryOperation, SchemaDef};

/// Table of an entity: `x-codegen.database.table`, else the snake plural.
pub fn table_name(schema: &SchemaDef) -> String {
    schema
        .codegen
        .as_ref()
        .and_then(|c| c.database.as_ref())
        .and_then(|d| d.table.clone())
        .unwrap_or_else(|| snake_case(&pluralize(&pascal_case(&schema.name))))
}

/// PostgreSQL column type of a property.
pub fn sql_type(schema: &SchemaDef) -> &'static str {
    if schema.reference.is_some() || schema.is_inline_object() || schema.is_array() {
        return "JSONB";
    }
    match (schema.schema_type.as_deref(), schema.format.as_deref()) {
        (Some("string"), Some("uuid")) => "UUID",
        (Some("string"), Some("date-time")) => "TIMESTAMPTZ",
        (Some("string"), Some("date")) => "DATE",
        (Some("string"), Some("binary" | "byte")) => "BYTEA",
        (Some("string"), _) => "TEXT",
        (Some("integer"), Some("int64")) => "BIGINT",
        (Some("integer"), _) => "INTEGER",
        (Some("number"), Some("float")) => "REAL",
        (Some("number"), _) => "DOUBLE PRECISION",
        (Some("boolean"), _) => "BOOLEAN",
        _ => "JSONB",
    }
}

/// Relations from `database` first, then `repository` ones not already declared.
fn relations(schema: &SchemaDef) -> Vec<&RelationConfig> {
    let Some(codegen) = schema.codegen.as_ref() else {
        return Vec::new();
    };
    let mut relations: Vec<&RelationConfig> = codegen
        .database
        .iter()
        .flat_map(|d| d.relations.iter())
        .collect();
    if let Some(repository) = &codegen.repository {
        for relation in &repository.relations {
            if !relations.iter().any(|r| r.field == relation.field) {
                relations.push(relation);
            }
        }
    }
    relations
}

/// `table.column` or a bare table, which references `id`.
fn split_reference(references: &str) -> (String, String) {
    match references.split_once('.') {
        Some((table, column)) => (table.to_string(), column.to_string()),
        None => (references.to_string(), "id".to_string()),
    }
}

fn foreign_key(table: &str, relation: &RelationConfig) -> String {
    let column = snake_case(&relation.field);
    let (target, target_column) = split_reference(&relation.references);
    let mut line = format!(
        "CONSTRAINT fk_{table}_{column} FOREIGN KEY ({column}) REFERENCES {target} ({target_column})"
    );
    if let Some(action) = &relation.on_delete {
        line.push_str(&format!(" ON DELETE {}", action.to_uppercase()));
    }
    if let Some(action) = &relation.on_update {
        line.push_str(&format!(" ON UPDATE {}", action.to_uppercase()));
    }
    line
}

fn index_statements(schema: &SchemaDef, table: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut covered: Vec<Vec<String>> = Vec::new();
    let Some(codegen) = schema.codegen.as_ref() else {
        return statements;
    };

    for index in codegen.database.iter().flat_map(|d| d.indices.iter()) {
        let columns: Vec<String> = index.fields.iter().map(|f| snake_case(f)).collect();
        let name = index
            .name
            .clone()
            .unwrap_or_else(|| format!("idx_{table}_{}", columns.join("_")));
        let unique = if index.unique { "UNIQUE " } else { "" };
        let filter = index
            .where_clause
            .as_deref()
            .map(|w| format!(" WHERE {w}"))
            .unwrap_or_default();
        statements.push(format!(
            "CREATE {unique}INDEX IF NOT EXISTS {name} ON {table} ({}){filter};",
            columns.join(", ")
        ));
        covered.push(columns);
    }

    for field in codegen.repository.iter().flat_map(|r| r.indices.iter()) {
        let column = snake_case(field);
        if covered.iter().any(|c| c.len() == 1 && c[0] == column) {
            continue;
        }
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column});"
        ));
        covered.push(vec![column]);
    }
    statements
}

/// `CREATE TABLE` body lines and trailing index statements for one entity.
pub fn table_view(schema: &SchemaDef) -> TableView {
    let table = table_name(schema);
    let mut lines = Vec::new();
    for prop_name in schema.sorted_property_names() {
        let Some(prop) = schema.properties.get(&prop_name) else {
            continue;
        };
        let mut line = format!("{} {}", snake_case(&prop_name), sql_type(prop));
        if prop_name == "id" {
            line.push_str(" PRIMARY KEY");
        } else if schema.is_required(&prop_name) && !prop.nullable {
            line.push_str(" NOT NULL");
        }
        lines.push(line);
    }
    lines.extend(relations(schema).into_iter().map(|r| foreign_key(&table, r)));

    let last = lines.len().saturating_sub(1);
    for line in lines.iter_mut().take(last) {
        line.push(',');
    }
    TableView {
        indices: index_statements(schema, &table),
        name: table,
        lines,
    }
}

fn query(name: String, kind: &str, sql: String) -> QueryView {
    QueryView {
        name,
        kind: kind.to_string(),
        sql,
        description: String::new(),
    }
}

/// CRUD statements for the supported repository operations, followed by the
/// entity's custom queries.
pub fn queries(schema: &SchemaDef) -> Vec<QueryView> {
    let table = table_name(schema);
    let entity = pascal_case(&schema.name);
    let columns: Vec<String> = schema
        .sorted_property_names()
        .iter()
        .map(|p| snake_case(p))
        .collect();
    let repository = schema.codegen.as_ref().and_then(|c| c.repository.as_ref());
    let supports = |op: RepositoryOperation| repository.map_or(true, |r| r.supports(op));

    let mut out = Vec::new();
    if supports(RepositoryOperation::Create) {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        out.push(query(
            format!("Create{entity}"),
            "one",
            format!(
                "INSERT INTO {table} ({}) VALUES ({}) RETURNING *",
                columns.join(", "),
                placeholders.join(", ")
            ),
        ));
    }
    if supports(RepositoryOperation::Read) {
        out.push(query(
            format!("Get{entity}"),
            "one",
            format!("SELECT * FROM {table} WHERE id = $1"),
        ));
    }
    if supports(RepositoryOperation::Update) {
        let assignments: Vec<String> = columns
            .iter()
            .filter(|c| *c != "id" && *c != "created_at")
            .enumerate()
            .map(|(i, c)| format!("{c} = ${}", i + 2))
            .collect();
        if !assignments.is_empty() {
            out.push(query(
                format!("Update{entity}"),
                "one",
                format!(
                    "UPDATE {table} SET {} WHERE id = $1 RETURNING *",
                    assignments.join(", ")
                ),
            ));
        }
    }
    if supports(RepositoryOperation::Delete) {
        out.push(query(
            format!("Delete{entity}"),
            "exec",
            format!("DELETE FROM {table} WHERE id = $1"),
        ));
    }
    if supports(RepositoryOperation::List) {
        let order = if columns.iter().any(|c| c == "created_at") {
            "created_at"
        } else {
            "id"
        };
        out.push(query(
            format!("List{}", pluralize(&entity)),
            "many",
            format!("SELECT * FROM {table} ORDER BY {order} LIMIT $1 OFFSET $2"),
        ));
    }

    let custom = schema
        .codegen
        .as_ref()
        .and_then(|c| c.database.as_ref())
        .map(|d| d.queries.as_slice())
        .unwrap_or_default();
    out.extend(custom.iter().map(|q| QueryView {
        name: q.name.clone(),
        kind: q.kind.trim_start_matches(':').to_string(),
        sql: q.sql.trim().trim_end_matches(';').to_string(),
        description: q.description.clone().unwrap_or_default(),
    }));
    out
}

pub struct SqlGenerator;

impl Generator for SqlGenerator {
    fn name(&self) -> &str {
        GEN_SQL
    }

    fn priority(&self) -> Priority {
        Priority::Last
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let entities = persisted_entities(ctx, GEN_SQL);
        if entities.is_empty() {
            return Ok(());
        }

        let schema_sql = SchemaSqlTemplate {
            tables: entities.iter().map(|s| table_view(s)).collect(),
        };
        write_output(ctx, "database/schema.gen.sql", &render(&schema_sql)?)?;

        for schema in entities {
            let template = QueriesSqlTemplate {
                queries: queries(schema),
            };
            let path = format!("database/queries/{}.sql", table_name(schema));
            write_output(ctx, &path, &render(&template)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{DatabaseConfig, IndexConfig, QueryConfig, SchemaKind, XCodegen};
    use std::collections::BTreeMap;

    fn prop(ty: &str, format: Option<&str>) -> SchemaDef {
        SchemaDef {
            schema_type: Some(ty.to_string()),
            format: format.map(str::to_string),
            ..SchemaDef::default()
        }
    }

    fn user(database: Option<DatabaseConfig>) -> SchemaDef {
        let mut properties = BTreeMap::new();
        properties.insert("id".to_string(), prop("string", Some("uuid")));
        properties.insert("email".to_string(), prop("string", None));
        properties.insert("createdAt".to_string(), prop("string", Some("date-time")));
        properties.insert("orgId".to_string(), prop("string", Some("uuid")));
        SchemaDef {
            name: "User".to_string(),
            kind: SchemaKind::Entity,
            schema_type: Some("object".to_string()),
            properties,
            required: ["id", "email"].iter().map(|s| s.to_string()).collect(),
            codegen: Some(XCodegen {
                kind: SchemaKind::Entity,
                repository: None,
                database,
            }),
            ..SchemaDef::default()
        }
    }

    #[test]
    fn test_table_name() {
        assert_eq!(table_name(&user(None)), "users");
        let custom = user(Some(DatabaseConfig {
            table: Some("accounts".into()),
            ..DatabaseConfig::default()
        }));
        assert_eq!(table_name(&custom), "accounts");
    }

    #[test]
    fn test_table_view_columns_and_constraints() {
        let schema = user(Some(DatabaseConfig {
            relations: vec![RelationConfig {
                field: "orgId".into(),
                references: "organizations".into(),
                on_delete: Some("cascade".into()),
                on_update: None,
            }],
            indices: vec![IndexConfig {
                name: None,
                fields: vec!["email".into()],
                unique: true,
                where_clause: None,
            }],
            ..DatabaseConfig::default()
        }));
        let view = table_view(&schema);
        assert_eq!(view.name, "users");
        assert!(view.lines.contains(&"id UUID PRIMARY KEY,".to_string()));
        assert!(view.lines.contains(&"email TEXT NOT NULL,".to_string()));
        assert!(view.lines.contains(&"created_at TIMESTAMPTZ,".to_string()));
        assert_eq!(
            view.lines.last().unwrap(),
            "CONSTRAINT fk_users_org_id FOREIGN KEY (org_id) REFERENCES organizations (id) ON DELETE CASCADE"
        );
        assert_eq!(
            view.indices,
            vec!["CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email);"]
        );
    }

    #[test]
    fn test_crud_and_custom_queries() {
        let schema = user(Some(DatabaseConfig {
            queries: vec![QueryConfig {
                name: "GetUserByEmail".into(),
                kind: "one".into(),
                sql: "SELECT * FROM users WHERE email = $1;".into(),
                description: Some("Look a user up by email".into()),
            }],
            ..DatabaseConfig::default()
        }));
        let queries = queries(&schema);
        let names: Vec<&str> = queries.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["CreateUser", "GetUser", "UpdateUser", "DeleteUser", "ListUsers", "GetUserByEmail"]
        );
        let update = &queries[2];
        assert!(update.sql.contains("email = $2"));
        assert!(!update.sql.contains("created_at ="));
        assert!(queries[4].sql.contains("ORDER BY created_at"));
        assert_eq!(queries[5].sql, "SELECT * FROM users WHERE email = $1");
        assert_eq!(queries[5].description, "Look a user up by email");
    }

    #[test]
    fn test_render_queries_file() {
        let rendered = render(&QueriesSqlTemplate {
            queries: queries(&user(None)),
        })
        .unwrap();
        assert!(rendered.starts_with("-- Code generated by specgen"));
        assert!(rendered.contains("-- name: GetUser :one\nSELECT * FROM users WHERE id = $1;"));
    }
}
