//! Harness configuration (TOML).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Reference memory ceiling handed to the engine's init entry point.
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

/// Configuration for locating and sizing the engine module.
///
/// This file is intended to be edited by humans. Missing fields default to
/// the reference values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoadConfig {
    /// Asset name of the engine module binary.
    pub module: String,

    /// Directory the asset resolver maps asset names into.
    pub asset_dir: PathBuf,

    /// Memory ceiling in bytes passed to the engine's init entry point.
    pub memory_limit_bytes: u64,

    /// Truncate captured engine output beyond this many bytes per evaluation.
    pub output_limit_bytes: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            module: "engine.wasm".to_string(),
            asset_dir: PathBuf::from("."),
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            output_limit_bytes: 100_000,
        }
    }
}

impl LoadConfig {
    /// Map an asset name to its retrieval location.
    ///
    /// The engine binary itself is resolved through this, as is any
    /// auxiliary asset a module build ships alongside it.
    pub fn resolve(&self, asset: &str) -> PathBuf {
        self.asset_dir.join(asset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.module.trim().is_empty() {
            return Err(anyhow!("module must be a non-empty asset name"));
        }
        if self.memory_limit_bytes == 0 {
            return Err(anyhow!("memory_limit_bytes must be > 0"));
        }
        if self.memory_limit_bytes > u64::from(u32::MAX) {
            return Err(anyhow!(
                "memory_limit_bytes must fit the module's 32-bit address space"
            ));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LoadConfig::default()`.
pub fn load_config(path: &Path) -> Result<LoadConfig> {
    if !path.exists() {
        let cfg = LoadConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LoadConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, LoadConfig::default());
        assert_eq!(cfg.memory_limit_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn load_reads_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("engine.toml");
        fs::write(
            &path,
            "module = \"quickjs.wasm\"\nmemory_limit_bytes = 1048576\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.module, "quickjs.wasm");
        assert_eq!(cfg.memory_limit_bytes, 1_048_576);
        assert_eq!(cfg.output_limit_bytes, LoadConfig::default().output_limit_bytes);
    }

    #[test]
    fn resolve_joins_asset_dir() {
        let cfg = LoadConfig {
            asset_dir: PathBuf::from("/assets"),
            ..LoadConfig::default()
        };
        assert_eq!(cfg.resolve("engine.wasm"), PathBuf::from("/assets/engine.wasm"));
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let cfg = LoadConfig {
            memory_limit_bytes: 0,
            ..LoadConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LoadConfig {
            output_limit_bytes: 0,
            ..LoadConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LoadConfig {
            module: "  ".to_string(),
            ..LoadConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_limit_beyond_module_address_space() {
        let cfg = LoadConfig {
            memory_limit_bytes: u64::from(u32::MAX) + 1,
            ..LoadConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
