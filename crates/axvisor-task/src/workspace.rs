use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

pub const SUBSYSTEM_DIR: &str = ".arceos";
pub const CONFIG_FILE: &str = ".hvconfig.toml";
pub const PLATFORM_DIR: &str = "platform";
pub const PLATFORM_FILE: &str = "axconfig.toml";

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub subsystem_dir: PathBuf,
    pub config_file: PathBuf,
    pub platform_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            subsystem_dir: root.join(SUBSYSTEM_DIR),
            config_file: root.join(CONFIG_FILE),
            platform_dir: root.join(PLATFORM_DIR),
            root,
        }
    }

    // Description file for a platform id. Ids must be a single plain path segment.
    pub fn platform_file(&self, platform: &str) -> Result<PathBuf> {
        validate_platform_id(platform)?;
        Ok(self.platform_dir.join(platform).join(PLATFORM_FILE))
    }
}

// Resolve the workspace root:
// - no override: the current directory
// - absolute override: used as-is
// - relative override: rooted at the current directory
pub fn load_paths(root_override: Option<&Path>) -> Result<WorkspacePaths> {
    let cwd = std::env::current_dir().map_err(|e| Error::msg(format!("cwd error: {e}")))?;
    let root = match root_override {
        None => cwd,
        Some(p) if p.as_os_str().is_empty() => {
            return Err(Error::msg("empty workspace root"));
        }
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
    };
    Ok(WorkspacePaths::new(root))
}

fn validate_platform_id(platform: &str) -> Result<()> {
    let id = platform.trim();
    if id.is_empty() {
        return Err(Error::msg("empty platform id"));
    }
    let mut comps = Path::new(id).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::msg(format!(
            "invalid platform id '{}' (must be a single path segment)",
            platform
        ))),
    }
}
