//! One function per CLI command. Each provisions the subsystem, resolves the
//! configuration, executes `make`, and persists the configuration after a
//! successful build or run.

use crate::config::{self, CliOverrides, ResolvedConfig};
use crate::error::Result;
use crate::executor::ExecCtx;
use crate::invocation::{BuildInvocation, synthesize};
use crate::platform::PlatformDir;
use crate::setup::ensure_subsystem;
use crate::workspace::WorkspacePaths;

pub fn resolve_config(ws: &WorkspacePaths, cli: &CliOverrides) -> ResolvedConfig {
    let snapshot = config::load_snapshot(&ws.config_file);
    config::resolve(cli, &snapshot, &PlatformDir::new(ws))
}

pub fn setup(ws: &WorkspacePaths, ctx: &ExecCtx) -> Result<()> {
    ensure_subsystem(ws, ctx)
}

pub fn build(ws: &WorkspacePaths, ctx: &ExecCtx, cli: &CliOverrides) -> Result<()> {
    ensure_subsystem(ws, ctx)?;
    let cfg = resolve_config(ws, cli);
    ctx.run_invocation(ws, &synthesize(&cfg, &ws.root, ""))?;
    tracing::info!("build succeeded");
    persist_after_success(ws, ctx, &cfg);
    Ok(())
}

pub fn run(ws: &WorkspacePaths, ctx: &ExecCtx, cli: &CliOverrides) -> Result<()> {
    ensure_subsystem(ws, ctx)?;
    let cfg = resolve_config(ws, cli);
    ctx.run_invocation(ws, &synthesize(&cfg, &ws.root, ""))?;
    ctx.run_invocation(ws, &synthesize(&cfg, &ws.root, "run"))?;
    persist_after_success(ws, ctx, &cfg);
    Ok(())
}

pub fn clippy(ws: &WorkspacePaths, ctx: &ExecCtx, arch: Option<String>) -> Result<()> {
    ensure_subsystem(ws, ctx)?;
    let arch = arch
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .or_else(|| resolve_config(ws, &CliOverrides::default()).architecture);
    let mut inv = BuildInvocation::base(&ws.root, "clippy");
    match arch {
        Some(arch) => inv.set("ARCH", arch),
        None => tracing::warn!("architecture unknown; running clippy with the subsystem default"),
    }
    ctx.run_invocation(ws, &inv)
}

pub fn clean(ws: &WorkspacePaths, ctx: &ExecCtx) -> Result<()> {
    ensure_subsystem(ws, ctx)?;
    ctx.run_invocation(ws, &BuildInvocation::base(&ws.root, "clean"))
}

pub fn disk_img(ws: &WorkspacePaths, ctx: &ExecCtx, image: Option<&str>) -> Result<()> {
    ensure_subsystem(ws, ctx)?;
    let mut inv = BuildInvocation::base(&ws.root, "disk_img");
    if let Some(image) = image.map(str::trim).filter(|s| !s.is_empty()) {
        inv.set("DISK_IMG", image);
    }
    ctx.run_invocation(ws, &inv)
}

/// Resolved configuration as TOML, followed by the command `build` would run.
pub fn describe(ws: &WorkspacePaths, cli: &CliOverrides) -> Result<String> {
    let cfg = resolve_config(ws, cli);
    let mut out = config::to_toml_string(&cfg)?;
    out.push_str("\n# build command\n# ");
    out.push_str(&synthesize(&cfg, &ws.root, "").command_line());
    out.push('\n');
    Ok(out)
}

fn persist_after_success(ws: &WorkspacePaths, ctx: &ExecCtx, cfg: &ResolvedConfig) {
    if ctx.dry_run {
        return;
    }
    config::maybe_persist(cfg, &ws.config_file);
}
