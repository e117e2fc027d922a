use super::go_types::package_name;
use super::templates::{render, ComposedPackage, ContainerTemplate, RouterTemplate};
use super::{write_output, GEN_CONTAINER, GEN_ROUTER};
use crate::naming::pascal_case;
use crate::orchestrator::{Generator, GeneratorContext, Priority};
use crate::spec::ApiModel;

/// One entry per composed package, in package name order.
pub fn composed_packages(model: &ApiModel, module: &str) -> Vec<ComposedPackage> {
    model
        .composed_packages()
        .into_iter()
        .map(|tag| {
            let ident = package_name(&tag);
            let operations = model
                .composed_operations()
                .filter(|op| op.ownership.as_deref() == Some(tag.as_str()))
                .map(|op| format!("{} {} ({})", op.method, op.path, op.id))
                .collect();
            ComposedPackage {
                import: format!("{module}/internal/{ident}"),
                field: pascal_case(&tag),
                ident,
                operations,
            }
        })
        .collect()
}

pub struct ContainerGenerator;

impl Generator for ContainerGenerator {
    fn name(&self) -> &str {
        GEN_CONTAINER
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let module = ctx.settings.module_path(ctx.model);
        let template = ContainerTemplate {
            title: ctx.model.title.clone(),
            packages: composed_packages(ctx.model, &module),
        };
        write_output(ctx, "app/container.gen.go", &render(&template)?)
    }
}

pub struct RouterGenerator;

impl Generator for RouterGenerator {
    fn name(&self) -> &str {
        GEN_ROUTER
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let module = ctx.settings.module_path(ctx.model);
        let template = RouterTemplate {
            packages: composed_packages(ctx.model, &module),
            module,
        };
        write_output(ctx, "http/router.gen.go", &render(&template)?)
    }
}
