use std::fs;

use serde::Deserialize;

use crate::workspace::WorkspacePaths;

/// Architecture and package ids discovered from a platform description file.
///
/// Either field may be absent; a missing description is an expected state and
/// leaves both unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformMetadata {
    pub architecture: Option<String>,
    pub package: Option<String>,
}

pub trait PlatformLookup {
    fn lookup(&self, platform: &str) -> PlatformMetadata;
}

impl<F> PlatformLookup for F
where
    F: Fn(&str) -> PlatformMetadata,
{
    fn lookup(&self, platform: &str) -> PlatformMetadata {
        self(platform)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PlatformDescription {
    arch: Option<String>,
    package: Option<String>,
}

/// Reads `platform/<id>/axconfig.toml` under the workspace root.
pub struct PlatformDir<'a> {
    ws: &'a WorkspacePaths,
}

impl<'a> PlatformDir<'a> {
    pub fn new(ws: &'a WorkspacePaths) -> Self {
        Self { ws }
    }

    pub fn load(&self, platform: &str) -> PlatformMetadata {
        let path = match self.ws.platform_file(platform) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("platform metadata unavailable: {e}");
                return PlatformMetadata::default();
            }
        };
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    "platform description {} not readable: {e}",
                    path.display()
                );
                return PlatformMetadata::default();
            }
        };
        let desc: PlatformDescription = match toml::from_str(&data) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("failed to parse platform description {}: {e}", path.display());
                return PlatformMetadata::default();
            }
        };

        let meta = PlatformMetadata {
            architecture: non_empty(desc.arch),
            package: non_empty(desc.package),
        };
        if meta.architecture.is_none() {
            tracing::warn!("platform description {} has no 'arch'", path.display());
        }
        if meta.package.is_none() {
            tracing::warn!("platform description {} has no 'package'", path.display());
        }
        meta
    }
}

impl PlatformLookup for PlatformDir<'_> {
    fn lookup(&self, platform: &str) -> PlatformMetadata {
        self.load(platform)
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
