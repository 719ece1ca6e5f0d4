use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod persist;
pub mod resolve;

pub use persist::maybe_persist;
pub use resolve::{CliOverrides, DEFAULT_PLATFORM, ResolvedConfig, resolve};

/// A multi-value setting as written by a user: either a native list or a
/// single comma-delimited string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListValue {
    Joined(String),
    Items(Vec<String>),
}

impl From<&str> for ListValue {
    fn from(s: &str) -> Self {
        Self::Joined(s.to_string())
    }
}

impl From<String> for ListValue {
    fn from(s: String) -> Self {
        Self::Joined(s)
    }
}

impl From<Vec<String>> for ListValue {
    fn from(v: Vec<String>) -> Self {
        Self::Items(v)
    }
}

/// Split on commas, trim, and drop empty tokens. Order and duplicates are kept.
pub fn normalize_list(value: &ListValue) -> Vec<String> {
    let raw: &[String] = match value {
        ListValue::Joined(s) => std::slice::from_ref(s),
        ListValue::Items(items) => items,
    };
    raw.iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Contents of the persisted project config (`.hvconfig.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileSnapshot {
    pub plat: Option<String>,
    pub arch: Option<String>,
    pub package: Option<String>,
    pub features: Option<ListValue>,
    #[serde(alias = "arceos_features")]
    pub subsystem_features: Option<ListValue>,
    #[serde(alias = "arceos_args")]
    pub subsystem_args: Option<ListValue>,
    pub vmconfigs: Option<ListValue>,
}

impl FileSnapshot {
    pub fn parse(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }
}

/// Load the persisted config. A missing file is an empty snapshot; an
/// unreadable or malformed one is reported and also treated as empty.
pub fn load_snapshot(path: &Path) -> FileSnapshot {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("no persisted config at {}", path.display());
            return FileSnapshot::default();
        }
        Err(e) => {
            tracing::warn!("failed to read config file {}: {e}", path.display());
            return FileSnapshot::default();
        }
    };
    match FileSnapshot::parse(&data) {
        Ok(snap) => snap,
        Err(e) => {
            tracing::warn!("ignoring malformed config file {}: {e}", path.display());
            FileSnapshot::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct PersistedConfig<'a> {
    plat: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<&'a str>,
    features: &'a [String],
    subsystem_features: &'a [String],
    subsystem_args: &'a [String],
    vmconfigs: &'a [String],
}

pub fn to_toml_string(cfg: &ResolvedConfig) -> Result<String> {
    let doc = PersistedConfig {
        plat: &cfg.platform,
        arch: cfg.architecture.as_deref(),
        package: cfg.package.as_deref(),
        features: &cfg.features,
        subsystem_features: &cfg.subsystem_features,
        subsystem_args: &cfg.subsystem_args,
        vmconfigs: &cfg.vm_configs,
    };
    Ok(toml::to_string_pretty(&doc)?)
}

/// Write `cfg` to `path`, failing if anything already exists there.
pub fn write_new(path: &Path, cfg: &ResolvedConfig) -> Result<()> {
    let body = to_toml_string(cfg)?;
    write_new_with(path, |f| f.write_all(body.as_bytes()))
}

// The body is staged in a sibling temp file and only linked into place once it
// is complete, so a failed write never leaves a partial `path` behind.
fn write_new_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut fs::File) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::msg(format!("failed to create temp file in {}: {e}", dir.display())))?;
    fill(tmp.as_file_mut())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::msg(format!("failed to write {}: {e}", path.display())))?;
    tmp.persist_noclobber(path)
        .map_err(|e| Error::msg(format!("failed to create {}: {}", path.display(), e.error)))?;
    Ok(())
}
