//! Turns a [`ResolvedConfig`] into the variables, environment and target of a
//! `make` invocation against the subsystem tree.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::config::ResolvedConfig;
use crate::workspace::SUBSYSTEM_DIR;

pub const MAKE: &str = "make";
pub const LD_SCRIPT: &str = "link.x";
pub const PLATFORM_PACKAGE_PREFIX: &str = "axplat-";
pub const PLATFORM_FEATURE_PREFIX: &str = "plat-";
pub const DEFAULT_SUBSYSTEM_FEATURE: &str = "page-alloc-64g";
pub const VIRT_ARGS_VAR: &str = "QEMU_ARGS";
pub const VM_CONFIGS_ENV: &str = "AXVISOR_VM_CONFIGS";

/// Emulator flags needed to expose virtualization support for an architecture.
pub fn virtualization_args(arch: &str) -> Option<&'static str> {
    match arch {
        "aarch64" => Some("-machine virtualization=on"),
        "riscv64" => Some("-cpu rv64,h=true"),
        "x86_64" => Some("-enable-kvm -cpu host"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildInvocation {
    // Insertion order is the command-line order; re-setting a key keeps its slot.
    variables: IndexMap<String, String>,
    pub environment: BTreeMap<String, String>,
    pub target: String,
}

// `IndexMap` equality ignores order; variable order is part of the value here.
impl PartialEq for BuildInvocation {
    fn eq(&self, other: &Self) -> bool {
        self.variables.iter().eq(other.variables.iter())
            && self.environment == other.environment
            && self.target == other.target
    }
}

impl Eq for BuildInvocation {}

impl BuildInvocation {
    /// Workspace root and linker script only; shared by every make target.
    pub fn base(root: &Path, target: &str) -> Self {
        let mut inv = Self {
            target: target.to_string(),
            ..Self::default()
        };
        inv.set("A", root.display().to_string());
        inv.set("LD_SCRIPT", LD_SCRIPT);
        inv
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Arguments passed to `make`, run from the workspace root.
    pub fn args(&self) -> Vec<String> {
        let mut out = vec!["-C".to_string(), SUBSYSTEM_DIR.to_string()];
        out.extend(self.variables().map(|(k, v)| format!("{k}={v}")));
        if !self.target.is_empty() {
            out.push(self.target.clone());
        }
        out
    }

    /// Human-readable, shell-pasteable rendering of the invocation.
    pub fn command_line(&self) -> String {
        let mut parts: Vec<String> = self
            .environment
            .iter()
            .map(|(k, v)| format!("{k}={}", shell_quote(v)))
            .collect();
        parts.push(MAKE.to_string());
        parts.push("-C".to_string());
        parts.push(SUBSYSTEM_DIR.to_string());
        parts.extend(
            self.variables()
                .map(|(k, v)| format!("{k}={}", shell_quote(v))),
        );
        if !self.target.is_empty() {
            parts.push(self.target.clone());
        }
        parts.join(" ")
    }
}

pub fn synthesize(cfg: &ResolvedConfig, root: &Path, target: &str) -> BuildInvocation {
    let mut inv = BuildInvocation::base(root, target);

    let package = cfg
        .package
        .clone()
        .unwrap_or_else(|| format!("{PLATFORM_PACKAGE_PREFIX}{}", cfg.platform));
    inv.set("MYPLAT", package);

    let app_features: Vec<String> =
        std::iter::once(format!("{PLATFORM_FEATURE_PREFIX}{}", cfg.platform))
            .chain(cfg.features.iter().cloned())
            .collect();
    inv.set("APP_FEATURES", app_features.join(","));

    let subsystem_features: Vec<&str> = std::iter::once(DEFAULT_SUBSYSTEM_FEATURE)
        .chain(cfg.subsystem_features.iter().map(String::as_str))
        .collect();
    inv.set("FEATURES", subsystem_features.join(","));

    for arg in &cfg.subsystem_args {
        let (key, value) = match arg.split_once('=') {
            Some((k, v)) => (k.trim(), unquote(v.trim())),
            None => (arg.trim(), "y"),
        };
        if key.is_empty() {
            tracing::warn!("ignoring subsystem arg '{arg}' with empty key");
            continue;
        }
        inv.set(key.to_ascii_uppercase(), value);
    }

    if let Some(virt) = cfg.architecture.as_deref().and_then(virtualization_args) {
        let merged = match inv.get(VIRT_ARGS_VAR) {
            Some(existing) if existing.contains(virt) => existing.to_string(),
            Some(existing) if !existing.trim().is_empty() => format!("{} {virt}", existing.trim()),
            _ => virt.to_string(),
        };
        inv.set(VIRT_ARGS_VAR, merged);
    }

    if !cfg.vm_configs.is_empty() {
        inv.environment
            .insert(VM_CONFIGS_ENV.into(), cfg.vm_configs.join(","));
    }

    inv
}

// Strip one pair of matching surrounding quotes.
fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

fn shell_quote(v: &str) -> String {
    let plain = !v.is_empty()
        && v.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ',' | '=' | ':' | '+' | '@')
        });
    if plain {
        return v.to_string();
    }
    let mut out = String::with_capacity(v.len() + 2);
    out.push('"');
    for c in v.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
