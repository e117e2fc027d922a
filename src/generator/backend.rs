use super::go_types::{declarations, field_type, go_type, imports_for};
use super::templates::{
    render, GoModTemplate, HandlerImplTemplate, HandlerTemplate, ModelTemplate, RepositoryMethod,
    RepositoryTemplate, RequestField, RoutesTemplate,
};
use super::{
    table_name, write_output, GEN_GO_MOD, GEN_HANDLERS, GEN_MODELS, GEN_REPOSITORIES, GEN_ROUTES,
};
use crate::naming::{camel_case, pascal_case, pluralize, sanitize_identifier, snake_case};
use crate::orchestrator::{Generator, GeneratorContext, Priority};
use crate::spec::{
    AdditionalMethod, Cardinality, OperationDef, RepositoryOperation, SchemaDef, SchemaKind,
};
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct GoModGenerator;

impl Generator for GoModGenerator {
    fn name(&self) -> &str {
        GEN_GO_MOD
    }

    fn priority(&self) -> Priority {
        Priority::First
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let template = GoModTemplate {
            module: ctx.settings.module_path(ctx.model),
            go_version: ctx.settings.go_version.clone(),
            requires: ctx.settings.requires.clone(),
        };
        write_output(ctx, "go.mod", &render(&template)?)
    }
}

pub struct ModelsGenerator;

impl Generator for ModelsGenerator {
    fn name(&self) -> &str {
        GEN_MODELS
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        for schema in ctx.model.own_schemas() {
            let decls = declarations(schema);
            if decls.structs.is_empty() && decls.enums.is_empty() && decls.aliases.is_empty() {
                continue;
            }
            let template = ModelTemplate {
                imports: decls.imports().into_iter().collect(),
                decls,
            };
            let path = format!("models/{}.gen.go", snake_case(&schema.name));
            write_output(ctx, &path, &render(&template)?)?;
        }
        Ok(())
    }
}

/// Entities that get repositories and tables; entities without `id` are
/// reported and skipped.
pub(crate) fn persisted_entities<'m>(
    ctx: &GeneratorContext<'m>,
    generator: &str,
) -> Vec<&'m SchemaDef> {
    ctx.model
        .own_schemas()
        .filter(|s| s.kind == SchemaKind::Entity)
        .filter(|s| {
            let eligible = s.is_repository_eligible();
            if !eligible {
                warn!(
                    generator,
                    schema = %s.name,
                    "entity has no `id` property, skipping"
                );
            }
            eligible
        })
        .collect()
}

fn cardinality_returns(cardinality: Cardinality, entity: &str) -> String {
    match cardinality {
        Cardinality::Single => format!("(*models.{entity}, error)"),
        Cardinality::Multiple => format!("([]*models.{entity}, error)"),
        Cardinality::Void => "error".to_string(),
        Cardinality::Exists => "(bool, error)".to_string(),
        Cardinality::Count => "(int64, error)".to_string(),
    }
}

/// Go type of an additional-method parameter: declared type, else the type of
/// the matching entity property, else `string`.
fn method_param_type(schema: &SchemaDef, param: &str, declared: Option<&str>) -> String {
    if let Some(ty) = declared {
        return ty.to_string();
    }
    schema
        .properties
        .iter()
        .find(|(name, _)| snake_case(name) == snake_case(param))
        .map(|(name, prop)| go_type(prop, &pascal_case(&schema.name), name, "models."))
        .unwrap_or_else(|| "string".to_string())
}

fn additional_method(
    schema: &SchemaDef,
    entity: &str,
    method: &AdditionalMethod,
) -> RepositoryMethod {
    let mut params = vec!["ctx context.Context".to_string()];
    params.extend(method.params.iter().map(|p| {
        format!(
            "{} {}",
            camel_case(&p.name),
            method_param_type(schema, &p.name, p.type_name.as_deref())
        )
    }));
    RepositoryMethod {
        signature: format!(
            "{}({}) {}",
            pascal_case(&method.name),
            params.join(", "),
            cardinality_returns(method.returns, entity)
        ),
        doc: method.query.clone().unwrap_or_default(),
    }
}

pub(crate) fn repository_methods(schema: &SchemaDef) -> Vec<RepositoryMethod> {
    let entity = pascal_case(&schema.name);
    let id_type = schema
        .properties
        .get("id")
        .map(|id| go_type(id, &entity, "id", "models."))
        .unwrap_or_else(|| "string".to_string());
    let repository = schema.codegen.as_ref().and_then(|c| c.repository.as_ref());
    let supports = |op| repository.map_or(true, |r| r.supports(op));

    let mut methods = Vec::new();
    let mut crud = |op: RepositoryOperation, signature: String| {
        if supports(op) {
            methods.push(RepositoryMethod {
                signature,
                doc: String::new(),
            });
        }
    };
    crud(
        RepositoryOperation::Create,
        format!("Create(ctx context.Context, entity *models.{entity}) (*models.{entity}, error)"),
    );
    crud(
        RepositoryOperation::Read,
        format!("Get(ctx context.Context, id {id_type}) (*models.{entity}, error)"),
    );
    crud(
        RepositoryOperation::Update,
        format!(
            "Update(ctx context.Context, id {id_type}, entity *models.{entity}) (*models.{entity}, error)"
        ),
    );
    crud(
        RepositoryOperation::Delete,
        format!("Delete(ctx context.Context, id {id_type}) error"),
    );
    crud(
        RepositoryOperation::List,
        format!(
            "List(ctx context.Context, limit int32, offset int32) ([]*models.{entity}, int64, error)"
        ),
    );

    if let Some(repository) = repository {
        methods.extend(
            repository
                .additional_methods
                .iter()
                .map(|m| additional_method(schema, &entity, m)),
        );
    }
    methods
}

pub struct RepositoriesGenerator;

impl Generator for RepositoriesGenerator {
    fn name(&self) -> &str {
        GEN_REPOSITORIES
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let module = ctx.settings.module_path(ctx.model);
        for schema in persisted_entities(ctx, GEN_REPOSITORIES) {
            let methods = repository_methods(schema);
            let mut imports = vec!["context".to_string()];
            imports.extend(imports_for(methods.iter().map(|m| m.signature.as_str())));
            imports.push(format!("{module}/models"));

            let template = RepositoryTemplate {
                imports,
                name: pascal_case(&schema.name),
                entity: pascal_case(&schema.name),
                table: table_name(schema),
                methods,
            };
            let path = format!("repositories/{}_repository.gen.go", snake_case(&schema.name));
            write_output(ctx, &path, &render(&template)?)?;
        }
        Ok(())
    }
}

/// Strip inline declarations that only exist in the models package.
fn flatten_inline(schema: &SchemaDef) -> SchemaDef {
    let mut flat = schema.clone();
    if flat.reference.is_some() {
        return flat;
    }
    flat.enum_values.clear();
    if flat.is_inline_object() {
        flat.properties.clear();
        flat.schema_type = Some("object".to_string());
    }
    flat.items = flat.items.as_deref().map(|items| Box::new(flatten_inline(items)));
    flat
}

/// Type of a request field or body in the handlers package.
fn handler_type(schema: &SchemaDef, parent: &str, prop: &str, required: bool) -> String {
    field_type(&flatten_inline(schema), parent, prop, required, "models.")
}

/// Return list of `Handle` for the operation's success response.
pub(crate) fn handler_returns(op: &OperationDef) -> String {
    let Some(schema) = op.success_response().and_then(|r| r.schema.as_ref()) else {
        return "error".to_string();
    };
    let ty = match (&schema.reference, schema.items.as_deref()) {
        (Some(target), _) => format!("*models.{}", pascal_case(target)),
        (None, Some(items)) if items.reference.is_some() => {
            format!("[]{}", go_type(items, "", "", "models."))
        }
        _ => "any".to_string(),
    };
    format!("({ty}, error)")
}

fn request_fields(op: &OperationDef, name: &str) -> Vec<RequestField> {
    let parent = format!("{name}Request");
    let mut fields: Vec<RequestField> = op
        .parameters
        .iter()
        .map(|p| {
            let type_expr = p
                .schema
                .as_ref()
                .map(|s| handler_type(s, &parent, &p.name, p.required))
                .unwrap_or_else(|| "string".to_string());
            RequestField {
                name: sanitize_identifier(&pascal_case(&p.name)),
                type_expr,
                tag: format!("{}:\"{}\"", p.location, p.name),
            }
        })
        .collect();

    if let Some(body) = &op.request_body {
        let type_expr = body
            .schema
            .as_ref()
            .map(|s| handler_type(s, &parent, "body", true))
            .unwrap_or_else(|| "map[string]any".to_string());
        let type_expr = match type_expr.as_str() {
            t if t.starts_with("models.") => format!("*{t}"),
            _ => type_expr,
        };
        fields.push(RequestField {
            name: "Body".to_string(),
            type_expr,
            tag: "json:\"body\"".to_string(),
        });
    }
    fields
}

pub struct HandlersGenerator;

impl Generator for HandlersGenerator {
    fn name(&self) -> &str {
        GEN_HANDLERS
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let module = ctx.settings.module_path(ctx.model);
        for op in ctx.model.own_operations() {
            let name = pascal_case(&op.id);
            let fields = request_fields(op, &name);
            let returns = handler_returns(op);

            let mut imports = vec!["context".to_string()];
            imports.extend(imports_for(
                fields.iter().map(|f| f.type_expr.as_str()).chain([returns.as_str()]),
            ));
            let uses_models = fields.iter().any(|f| f.type_expr.contains("models."))
                || returns.contains("models.");
            if uses_models {
                imports.push(format!("{module}/models"));
            }

            let template = HandlerTemplate {
                imports,
                name: name.clone(),
                operation_id: op.id.clone(),
                summary: op.summary.clone(),
                method: op.method.to_string(),
                path: op.path.clone(),
                fields,
                returns: returns.clone(),
            };
            let base = snake_case(&op.id);
            write_output(ctx, &format!("handlers/{base}.gen.go"), &render(&template)?)?;

            if op.custom_handler {
                let impl_path = PathBuf::from(format!("handlers/{base}.impl.go"));
                if ctx.storage.exists(&impl_path) {
                    debug!(operation = %op.id, "custom handler exists, leaving it alone");
                    continue;
                }
                let not_implemented = format!("errors.New(\"{} is not implemented\")", op.id);
                let mut stub_imports = vec!["context".to_string(), "errors".to_string()];
                stub_imports.extend(imports_for([returns.as_str()]));
                if returns.contains("models.") {
                    stub_imports.push(format!("{module}/models"));
                }
                let stub = HandlerImplTemplate {
                    imports: stub_imports,
                    name,
                    operation_id: op.id.clone(),
                    not_implemented: if returns == "error" {
                        not_implemented
                    } else {
                        format!("nil, {not_implemented}")
                    },
                    returns,
                };
                write_output(ctx, &impl_path.to_string_lossy(), &render(&stub)?)?;
            }
        }
        Ok(())
    }
}

fn route_literal(op: &OperationDef) -> String {
    let schemes: Vec<String> = op.security.iter().map(|s| format!("{:?}", s.name)).collect();
    format!(
        "{{Method: {:?}, Path: {:?}, OperationID: {:?}, Tag: {:?}, Public: {}, Schemes: []string{{{}}}}}",
        op.method.as_str(),
        op.path,
        op.id,
        op.tag,
        op.is_public(),
        schemes.join(", ")
    )
}

pub struct RoutesGenerator;

impl Generator for RoutesGenerator {
    fn name(&self) -> &str {
        GEN_ROUTES
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let template = RoutesTemplate {
            title: ctx.model.title.clone(),
            version: ctx.model.version.clone(),
            routes: ctx.model.own_operations().map(route_literal).collect(),
        };
        write_output(ctx, "http/routes.gen.go", &render(&template)?)
    }
}

/// Field name of an entity's repository in the generated `Repositories` struct.
pub(crate) fn repository_field(schema: &SchemaDef) -> String {
    pluralize(&pascal_case(&schema.name))
}
