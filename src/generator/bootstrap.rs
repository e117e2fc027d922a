use super::backend::{persisted_entities, repository_field};
use super::templates::{render, BootstrapHandler, BootstrapTemplate, RepositoryField};
use super::{write_output, GEN_BOOTSTRAP};
use crate::handlers::HandlerResolver;
use crate::naming::pascal_case;
use crate::orchestrator::{Generator, GeneratorContext, Priority};
use tracing::{info, warn};

/// Wires custom handlers to their constructor dependencies.
///
/// Runs after the handlers tier so that freshly written `.impl.go` stubs are
/// visible to the resolver.
pub struct BootstrapGenerator {
    resolver: HandlerResolver,
}

impl BootstrapGenerator {
    pub fn new(resolver: HandlerResolver) -> Self {
        BootstrapGenerator { resolver }
    }

    pub fn resolver(&self) -> &HandlerResolver {
        &self.resolver
    }
}

impl Generator for BootstrapGenerator {
    fn name(&self) -> &str {
        GEN_BOOTSTRAP
    }

    fn priority(&self) -> Priority {
        Priority::Last
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let module = ctx.settings.module_path(ctx.model);

        let repositories: Vec<RepositoryField> = persisted_entities(ctx, GEN_BOOTSTRAP)
            .into_iter()
            .map(|s| RepositoryField {
                field: repository_field(s),
                interface: format!("{}Repository", pascal_case(&s.name)),
            })
            .collect();

        let mut handlers = Vec::new();
        let mut dependency_imports = Vec::new();
        let mut unresolved = 0usize;
        for op in ctx.model.own_operations().filter(|op| op.custom_handler) {
            let info = self.resolver.get_dependencies(&op.id)?;
            unresolved += info.unresolved().count();
            dependency_imports.extend(info.imports());
            if !info.has_handler {
                warn!(operation = %op.id, file = %info.file.display(), "custom handler not wired");
            }
            handlers.push(BootstrapHandler {
                name: pascal_case(&op.id),
                arguments: info
                    .dependencies
                    .iter()
                    .map(|d| d.resolution.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                constructor: info.constructor,
                has_handler: info.has_handler,
                file: info.file.display().to_string(),
            });
        }
        if unresolved > 0 {
            info!(unresolved, "bootstrap has dependencies that need manual wiring");
        }

        let mut imports = vec![format!("{module}/config")];
        if handlers.iter().any(|h| h.has_handler) {
            imports.push(format!("{module}/handlers"));
        }
        if !repositories.is_empty() {
            imports.push(format!("{module}/repositories"));
        }
        imports.extend(dependency_imports);
        imports.sort();
        imports.dedup();

        let template = BootstrapTemplate {
            imports,
            repositories,
            handlers,
        };
        write_output(ctx, "app/bootstrap.gen.go", &render(&template)?)
    }
}
