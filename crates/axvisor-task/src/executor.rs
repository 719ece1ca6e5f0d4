use std::ffi::OsString;
use std::process::Command;

use crate::error::{Error, Result};
use crate::invocation::{BuildInvocation, MAKE};
use crate::workspace::WorkspacePaths;

#[derive(Debug, Clone)]
pub struct ExecCtx {
    pub dry_run: bool,
    /// Program used in place of `make`.
    pub make: OsString,
}

impl Default for ExecCtx {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ExecCtx {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            make: MAKE.into(),
        }
    }

    pub fn with_make(mut self, make: impl Into<OsString>) -> Self {
        self.make = make.into();
        self
    }

    // The environment map is applied to the child only; stdio stays attached so
    // `make run` can drive an interactive emulator.
    pub fn run_invocation(&self, ws: &WorkspacePaths, inv: &BuildInvocation) -> Result<()> {
        let line = inv.command_line();
        if self.dry_run {
            tracing::info!("DRY-RUN: {line}");
            return Ok(());
        }
        tracing::info!("executing: {line}");

        let mut cmd = Command::new(&self.make);
        cmd.current_dir(&ws.root).args(inv.args());
        for (k, v) in &inv.environment {
            cmd.env(k, v);
        }
        let status = cmd
            .status()
            .map_err(|e| Error::msg(format!("failed to spawn {:?}: {e}", self.make)))?;
        if !status.success() {
            // Killed by a signal: no exit code to relay.
            let code = status.code().unwrap_or(1);
            return Err(Error::Command { command: line, code });
        }
        Ok(())
    }
}
