use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};
use crate::executor::ExecCtx;
use crate::workspace::WorkspacePaths;

pub const SUBSYSTEM_REPO: &str = "https://github.com/arceos-hypervisor/arceos";
pub const SUBSYSTEM_BRANCH: &str = "vmm-dev";

/// Make sure the subsystem source tree exists, cloning it when absent.
pub fn ensure_subsystem(ws: &WorkspacePaths, ctx: &ExecCtx) -> Result<()> {
    let dir = &ws.subsystem_dir;
    if dir.exists() {
        tracing::info!("{} already present", dir.display());
        return Ok(());
    }

    let mut cmd = Command::new("git");
    cmd.arg("clone")
        .arg(SUBSYSTEM_REPO)
        .arg("-b")
        .arg(SUBSYSTEM_BRANCH)
        .arg(dir);
    if ctx.dry_run {
        tracing::info!("DRY-RUN: {cmd:?}");
        return Ok(());
    }

    tracing::info!("cloning {SUBSYSTEM_REPO} ({SUBSYSTEM_BRANCH}) into {}", dir.display());
    let out = cmd.output().map_err(|e| missing(dir, format!("failed to run git: {e}")))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(missing(
            dir,
            format!("git clone failed ({}): {}", out.status, stderr.trim()),
        ));
    }
    tracing::info!("subsystem cloned");
    Ok(())
}

fn missing(path: &Path, reason: String) -> Error {
    Error::MissingDependency {
        path: path.to_path_buf(),
        reason,
    }
}
