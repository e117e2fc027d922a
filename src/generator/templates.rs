use askama::Template;

use super::go_types::GoDecls;

/// Template data for `go.mod`
#[derive(Template)]
#[template(path = "go/go.mod.txt", escape = "none")]
pub struct GoModTemplate {
    pub module: String,
    pub go_version: String,
    /// `path version` lines
    pub requires: Vec<String>,
}

/// Template data for `models/<schema>.gen.go`
#[derive(Template)]
#[template(path = "go/model.go.txt", escape = "none")]
pub struct ModelTemplate {
    pub imports: Vec<String>,
    pub decls: GoDecls,
}

#[derive(Debug, Clone)]
pub struct RepositoryMethod {
    pub signature: String,
    pub doc: String,
}

/// Template data for `repositories/<entity>_repository.gen.go`
#[derive(Template)]
#[template(path = "go/repository.go.txt", escape = "none")]
pub struct RepositoryTemplate {
    pub imports: Vec<String>,
    pub name: String,
    pub entity: String,
    pub table: String,
    pub methods: Vec<RepositoryMethod>,
}

#[derive(Debug, Clone)]
pub struct RequestField {
    pub name: String,
    pub type_expr: String,
    /// Full struct tag body, e.g. `path:"id"` or `json:"body"`
    pub tag: String,
}

/// Template data for `handlers/<operation>.gen.go`
#[derive(Template)]
#[template(path = "go/handler.go.txt", escape = "none")]
pub struct HandlerTemplate {
    pub imports: Vec<String>,
    pub name: String,
    pub operation_id: String,
    pub summary: String,
    pub method: String,
    pub path: String,
    pub fields: Vec<RequestField>,
    /// Return list of `Handle`, e.g. `(*models.Pet, error)`
    pub returns: String,
}

/// Template data for the one-time `handlers/<operation>.impl.go` stub
#[derive(Template)]
#[template(path = "go/handler_impl.go.txt", escape = "none")]
pub struct HandlerImplTemplate {
    pub imports: Vec<String>,
    pub name: String,
    pub operation_id: String,
    pub returns: String,
    pub not_implemented: String,
}

/// Template data for `http/routes.gen.go`
#[derive(Template)]
#[template(path = "go/routes.go.txt", escape = "none")]
pub struct RoutesTemplate {
    pub title: String,
    pub version: String,
    /// Go composite literals, one per route
    pub routes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RepositoryField {
    pub field: String,
    pub interface: String,
}

#[derive(Debug, Clone)]
pub struct BootstrapHandler {
    pub name: String,
    pub constructor: String,
    pub has_handler: bool,
    pub file: String,
    pub arguments: String,
}

/// Template data for `app/bootstrap.gen.go`
#[derive(Template)]
#[template(path = "go/bootstrap.go.txt", escape = "none")]
pub struct BootstrapTemplate {
    pub imports: Vec<String>,
    pub repositories: Vec<RepositoryField>,
    pub handlers: Vec<BootstrapHandler>,
}

#[derive(Debug, Clone)]
pub struct ComposedPackage {
    pub ident: String,
    pub import: String,
    pub field: String,
    /// `METHOD /path (operationId)` lines
    pub operations: Vec<String>,
}

/// Template data for `app/container.gen.go`
#[derive(Template)]
#[template(path = "go/container.go.txt", escape = "none")]
pub struct ContainerTemplate {
    pub title: String,
    pub packages: Vec<ComposedPackage>,
}

/// Template data for `http/router.gen.go`
#[derive(Template)]
#[template(path = "go/router.go.txt", escape = "none")]
pub struct RouterTemplate {
    pub module: String,
    pub packages: Vec<ComposedPackage>,
}

#[derive(Debug, Clone)]
pub struct TableView {
    pub name: String,
    /// Column and constraint lines, commas included
    pub lines: Vec<String>,
    /// Complete `CREATE INDEX` statements
    pub indices: Vec<String>,
}

/// Template data for `database/schema.gen.sql`
#[derive(Template)]
#[template(path = "sql/schema.sql.txt", escape = "none")]
pub struct SchemaSqlTemplate {
    pub tables: Vec<TableView>,
}

#[derive(Debug, Clone)]
pub struct QueryView {
    pub name: String,
    pub kind: String,
    pub sql: String,
    pub description: String,
}

/// Template data for `database/queries/<table>.sql` (sqlc annotations)
#[derive(Template)]
#[template(path = "sql/queries.sql.txt", escape = "none")]
pub struct QueriesSqlTemplate {
    pub queries: Vec<QueryView>,
}

/// Render `template` and make sure the output ends with a newline.
pub fn render(template: &impl Template) -> anyhow::Result<String> {
    let mut out = template.render()?;
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
