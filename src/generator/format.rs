use anyhow::Context;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Run `gofmt -w .` in `dir`.
///
/// `SPECGEN_GOFMT_BIN` overrides the binary, which lets tests substitute a stub.
pub fn format_project(dir: &Path) -> anyhow::Result<()> {
    let gofmt = std::env::var("SPECGEN_GOFMT_BIN").unwrap_or_else(|_| "gofmt".to_string());
    debug!(dir = %dir.display(), gofmt = %gofmt, "formatting generated code");

    let status = Command::new(&gofmt)
        .arg("-w")
        .arg(".")
        .current_dir(dir)
        .status()
        .with_context(|| format!("failed to run {gofmt}"))?;
    if !status.success() {
        anyhow::bail!("{gofmt} failed with {status}");
    }
    Ok(())
}
