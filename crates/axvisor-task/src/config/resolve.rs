//! Merges command-line input, the persisted project config and platform
//! metadata into one [`ResolvedConfig`].
//!
//! Precedence, highest first: explicit CLI value, persisted value,
//! platform-derived value (architecture and package only), built-in default.

use crate::config::{FileSnapshot, ListValue, normalize_list};
use crate::platform::PlatformLookup;

pub const DEFAULT_PLATFORM: &str = "aarch64-generic";

/// Values given on the command line. `None` means the flag was omitted and
/// never overrides anything, even when a default exists for the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub plat: Option<String>,
    pub arch: Option<String>,
    pub package: Option<String>,
    pub features: Option<ListValue>,
    pub subsystem_features: Option<ListValue>,
    pub subsystem_args: Option<ListValue>,
    pub vmconfigs: Option<ListValue>,
}

/// The effective build configuration for one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub platform: String,
    pub architecture: Option<String>,
    pub package: Option<String>,
    pub features: Vec<String>,
    pub subsystem_features: Vec<String>,
    /// Bare flags or `key=value` pairs.
    pub subsystem_args: Vec<String>,
    pub vm_configs: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM.into(),
            architecture: None,
            package: None,
            features: Vec::new(),
            subsystem_features: Vec::new(),
            subsystem_args: Vec::new(),
            vm_configs: Vec::new(),
        }
    }
}

pub fn resolve<P>(cli: &CliOverrides, file: &FileSnapshot, platforms: &P) -> ResolvedConfig
where
    P: PlatformLookup + ?Sized,
{
    let cli_plat = scalar(&cli.plat);
    let file_plat = scalar(&file.plat);
    let file_effective_plat = file_plat.unwrap_or(DEFAULT_PLATFORM);
    let platform = cli_plat.unwrap_or(file_effective_plat).to_string();

    // A new platform from the CLI makes the persisted arch/package stale.
    let platform_changed = cli_plat.is_some_and(|p| p != file_effective_plat);
    let (file_arch, file_package) = if platform_changed {
        tracing::debug!(
            "platform changed from '{}' to '{}'; re-deriving arch/package",
            file_effective_plat,
            platform
        );
        (None, None)
    } else {
        (scalar(&file.arch), scalar(&file.package))
    };

    let cli_arch = scalar(&cli.arch);
    let cli_package = scalar(&cli.package);
    let mut architecture = cli_arch.or(file_arch).map(ToOwned::to_owned);
    let mut package = cli_package.or(file_package).map(ToOwned::to_owned);

    let pinned_by_cli = cli_arch.is_some() && cli_package.is_some();
    let needs_lookup =
        !pinned_by_cli && (platform_changed || architecture.is_none() || package.is_none());
    if needs_lookup {
        let meta = platforms.lookup(&platform);
        if architecture.is_none() {
            architecture = meta.architecture;
        }
        if package.is_none() {
            package = meta.package;
        }
        tracing::debug!(
            "platform '{}' resolved arch={:?} package={:?}",
            platform,
            architecture,
            package
        );
    }

    ResolvedConfig {
        platform,
        architecture,
        package,
        features: list(&cli.features, &file.features),
        subsystem_features: list(&cli.subsystem_features, &file.subsystem_features),
        subsystem_args: list(&cli.subsystem_args, &file.subsystem_args),
        vm_configs: list(&cli.vmconfigs, &file.vmconfigs),
    }
}

fn scalar(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn list(cli: &Option<ListValue>, file: &Option<ListValue>) -> Vec<String> {
    cli.as_ref()
        .or(file.as_ref())
        .map(normalize_list)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::platform::PlatformMetadata;

    fn generic_platforms(platform: &str) -> PlatformMetadata {
        match platform {
            "aarch64-generic" => PlatformMetadata {
                architecture: Some("aarch64".into()),
                package: Some("axplat-aarch64-generic".into()),
            },
            "x86-pc" => PlatformMetadata {
                architecture: Some("x86_64".into()),
                package: Some("axplat-x86-pc".into()),
            },
            _ => PlatformMetadata::default(),
        }
    }

    fn no_platforms(_: &str) -> PlatformMetadata {
        PlatformMetadata::default()
    }

    #[test]
    fn defaults_with_platform_metadata() {
        let cfg = resolve(
            &CliOverrides::default(),
            &FileSnapshot::default(),
            &generic_platforms,
        );
        assert_eq!(cfg.platform, "aarch64-generic");
        assert_eq!(cfg.architecture.as_deref(), Some("aarch64"));
        assert_eq!(cfg.package.as_deref(), Some("axplat-aarch64-generic"));
        assert!(cfg.features.is_empty());
        assert!(cfg.subsystem_features.is_empty());
        assert!(cfg.subsystem_args.is_empty());
        assert!(cfg.vm_configs.is_empty());
    }

    #[test]
    fn cli_beats_file_beats_platform() {
        let file = FileSnapshot {
            plat: Some("aarch64-generic".into()),
            arch: Some("arm64-file".into()),
            features: Some(ListValue::from("file-feat")),
            subsystem_args: Some(ListValue::from("SMP=2")),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            features: Some(ListValue::from("cli-a,cli-b")),
            package: Some("axplat-custom".into()),
            ..CliOverrides::default()
        };

        let cfg = resolve(&cli, &file, &generic_platforms);
        assert_eq!(cfg.architecture.as_deref(), Some("arm64-file"));
        assert_eq!(cfg.package.as_deref(), Some("axplat-custom"));
        assert_eq!(cfg.features, vec!["cli-a", "cli-b"]);
        assert_eq!(cfg.subsystem_args, vec!["SMP=2"]);
    }

    #[test]
    fn omitted_flags_do_not_reset_file_values() {
        let file = FileSnapshot {
            plat: Some("x86-pc".into()),
            vmconfigs: Some(ListValue::from(vec!["a.toml".to_string()])),
            ..FileSnapshot::default()
        };
        let cfg = resolve(&CliOverrides::default(), &file, &generic_platforms);
        assert_eq!(cfg.platform, "x86-pc");
        assert_eq!(cfg.architecture.as_deref(), Some("x86_64"));
        assert_eq!(cfg.vm_configs, vec!["a.toml"]);
    }

    #[test]
    fn explicit_default_platform_still_counts_as_provided() {
        let file = FileSnapshot {
            plat: Some("x86-pc".into()),
            arch: Some("x86_64".into()),
            package: Some("axplat-x86-pc".into()),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            plat: Some(DEFAULT_PLATFORM.into()),
            ..CliOverrides::default()
        };
        let cfg = resolve(&cli, &file, &generic_platforms);
        assert_eq!(cfg.platform, "aarch64-generic");
        assert_eq!(cfg.architecture.as_deref(), Some("aarch64"));
        assert_eq!(cfg.package.as_deref(), Some("axplat-aarch64-generic"));
    }

    #[test]
    fn platform_change_keeps_explicit_cli_arch_and_package() {
        let file = FileSnapshot {
            arch: Some("aarch64".into()),
            package: Some("axplat-aarch64-generic".into()),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            plat: Some("x86-pc".into()),
            arch: Some("x86_64".into()),
            package: Some("my-board".into()),
            ..CliOverrides::default()
        };
        let calls = RefCell::new(0usize);
        let counting = |p: &str| {
            *calls.borrow_mut() += 1;
            generic_platforms(p)
        };
        let cfg = resolve(&cli, &file, &counting);
        assert_eq!(*calls.borrow(), 0, "both pinned by CLI: no lookup");
        assert_eq!(cfg.architecture.as_deref(), Some("x86_64"));
        assert_eq!(cfg.package.as_deref(), Some("my-board"));
    }

    #[test]
    fn same_platform_from_file_skips_lookup_when_resolved() {
        let file = FileSnapshot {
            plat: Some("x86-pc".into()),
            arch: Some("x86_64".into()),
            package: Some("axplat-x86-pc".into()),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            plat: Some("x86-pc".into()),
            ..CliOverrides::default()
        };
        let calls = RefCell::new(0usize);
        let counting = |p: &str| {
            *calls.borrow_mut() += 1;
            generic_platforms(p)
        };
        let cfg = resolve(&cli, &file, &counting);
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(cfg.package.as_deref(), Some("axplat-x86-pc"));
    }

    #[test]
    fn unknown_platform_leaves_arch_and_package_unset() {
        let cli = CliOverrides {
            plat: Some("riscv64-qemu-virt".into()),
            ..CliOverrides::default()
        };
        let cfg = resolve(&cli, &FileSnapshot::default(), &no_platforms);
        assert_eq!(cfg.platform, "riscv64-qemu-virt");
        assert_eq!(cfg.architecture, None);
        assert_eq!(cfg.package, None);
    }

    #[test]
    fn explicit_empty_list_overrides_file_list() {
        let file = FileSnapshot {
            features: Some(ListValue::from("fs,net")),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            features: Some(ListValue::from("")),
            ..CliOverrides::default()
        };
        let cfg = resolve(&cli, &file, &no_platforms);
        assert!(cfg.features.is_empty());
    }

    #[test]
    fn cli_lists_beat_file_lists() {
        let file = FileSnapshot {
            features: Some(ListValue::from("fs")),
            subsystem_features: Some(ListValue::from("bus-mmio")),
            subsystem_args: Some(ListValue::from(vec!["SMP=2".to_string()])),
            vmconfigs: Some(ListValue::from("configs/vms/old.toml")),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            subsystem_features: Some(ListValue::from("bus-pci,smp")),
            subsystem_args: Some(ListValue::from("SMP=4, LOG=debug")),
            vmconfigs: Some(ListValue::from("a.toml,b.toml")),
            ..CliOverrides::default()
        };
        let cfg = resolve(&cli, &file, &no_platforms);
        assert_eq!(cfg.features, vec!["fs"]);
        assert_eq!(cfg.subsystem_features, vec!["bus-pci", "smp"]);
        assert_eq!(cfg.subsystem_args, vec!["SMP=4", "LOG=debug"]);
        assert_eq!(cfg.vm_configs, vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn resolution_is_repeatable() {
        let file = FileSnapshot {
            subsystem_features: Some(ListValue::from(" bus-pci , ,fs")),
            ..FileSnapshot::default()
        };
        let cli = CliOverrides {
            subsystem_args: Some(ListValue::from("smp=4,debug")),
            ..CliOverrides::default()
        };
        let a = resolve(&cli, &file, &generic_platforms);
        let b = resolve(&cli, &file, &generic_platforms);
        assert_eq!(a, b);
        assert_eq!(a.subsystem_features, vec!["bus-pci", "fs"]);
    }
}
