use super::{write_output, GEN_BUNDLE};
use crate::orchestrator::{Generator, GeneratorContext, Priority};
use anyhow::Context;

/// Writes the single-file, include-merged document next to the generated code.
pub struct BundleGenerator;

impl Generator for BundleGenerator {
    fn name(&self) -> &str {
        GEN_BUNDLE
    }

    fn priority(&self) -> Priority {
        Priority::Final
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(&ctx.model.document)
            .context("failed to serialize bundled document")?;
        write_output(ctx, "api/openapi.bundled.yaml", &yaml)
    }
}
