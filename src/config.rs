use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::warn;

use crate::cli::Cli;

/// Scales the openable tier (and the children map with it).
pub const RATIO_ENV: &str = "JMODEL_CACHE_RATIO";
/// Scales the jar type side cache.
pub const JAR_TYPE_RATIO_ENV: &str = "JMODEL_JAR_TYPE_RATIO";

const BASE_MEMORY: u64 = 64 * 0x10_0000;
const UNBOUNDED_MEMORY_RATIO: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheConfig {
    /// `None` derives the ratio from physical memory.
    pub memory_ratio: Option<f64>,
    pub openable_ratio: f64,
    pub jar_type_ratio: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_ratio: None,
            openable_ratio: 1.0,
            jar_type_ratio: 1.0,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            memory_ratio: None,
            openable_ratio: parse_ratio(RATIO_ENV, env::var(RATIO_ENV).ok()),
            jar_type_ratio: parse_ratio(JAR_TYPE_RATIO_ENV, env::var(JAR_TYPE_RATIO_ENV).ok()),
        }
    }

    pub fn with_memory_ratio(mut self, ratio: f64) -> Self {
        self.memory_ratio = Some(ratio);
        self
    }

    pub fn resolve_memory_ratio(&self) -> f64 {
        self.memory_ratio.unwrap_or_else(detect_memory_ratio)
    }
}

fn parse_ratio(variable: &str, value: Option<String>) -> f64 {
    let Some(value) = value else {
        return 1.0;
    };
    match value.trim().parse::<f64>() {
        Ok(ratio) if ratio.is_finite() && ratio > 0.0 => ratio,
        _ => {
            warn!(target: "jmodel.cache", variable, value = %value, "ignoring invalid cache ratio");
            1.0
        }
    }
}

/// A quarter of physical memory measured in 64 MiB units.
pub fn memory_ratio_for(total_memory: u64) -> f64 {
    if total_memory == 0 || total_memory == u64::MAX {
        return UNBOUNDED_MEMORY_RATIO;
    }
    (total_memory / 4) as f64 / BASE_MEMORY as f64
}

fn detect_memory_ratio() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    memory_ratio_for(sys.total_memory())
}

pub fn resolve_db_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.db.clone() {
        return Ok(p);
    }

    Ok(jmodel_home()?.join("snapshots.lmdb"))
}

pub fn clear_db(db_path: &Path) -> Result<()> {
    remove_file_if_exists(db_path, "db")?;
    remove_file_if_exists(&lmdb_lock_path(db_path), "db lock")?;
    Ok(())
}

fn jmodel_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("jmodel"))
}

fn lmdb_lock_path(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_os_string();
    os.push("-lock");
    PathBuf::from(os)
}

fn remove_file_if_exists(path: &Path, kind: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {kind} file: {}", path.display()))?;
    }
    Ok(())
}
