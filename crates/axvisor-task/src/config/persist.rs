use std::fs;
use std::path::Path;

use crate::config::{ResolvedConfig, write_new};

/// Freeze `cfg` to `dest` the first time a command succeeds.
///
/// An existing file (or anything else at `dest`) is never touched. Returns
/// whether a write happened; failures are logged, not returned.
pub fn maybe_persist(cfg: &ResolvedConfig, dest: &Path) -> bool {
    if fs::symlink_metadata(dest).is_ok() {
        tracing::debug!("{} already exists; not persisting", dest.display());
        return false;
    }
    match write_new(dest, cfg) {
        Ok(()) => {
            tracing::info!("saved resolved configuration to {}", dest.display());
            true
        }
        Err(e) => {
            tracing::warn!("could not persist configuration: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedConfig {
        ResolvedConfig {
            architecture: Some("aarch64".into()),
            package: Some("axplat-aarch64-generic".into()),
            features: vec!["fs".into()],
            ..ResolvedConfig::default()
        }
    }

    #[test]
    fn persists_once_and_never_overwrites() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join(".hvconfig.toml");

        assert!(maybe_persist(&sample(), &dest));
        let first = fs::read(&dest).expect("read first");

        let changed = ResolvedConfig {
            platform: "x86-pc".into(),
            ..sample()
        };
        assert!(!maybe_persist(&changed, &dest));
        assert_eq!(fs::read(&dest).expect("read second"), first);
    }

    #[test]
    fn write_failure_reports_false() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("missing-dir").join(".hvconfig.toml");
        assert!(!maybe_persist(&sample(), &dest));
        assert!(!dest.exists());
    }
}
