// Lock file management (shimlink.lock)

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::alias::AliasTable;
use crate::error::ModuleLoadError;
use crate::loader::ModuleLoader;
use crate::target::BuildTarget;

pub const LOCK_FILE: &str = "shimlink.lock";

/// Lock file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    pub version: u32,

    #[serde(rename = "lockTime")]
    pub lock_time: String,

    /// Keyed by "module@target"
    pub aliases: BTreeMap<String, LockedAlias>,
}

/// A substitute pinned to the shim source it resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedAlias {
    pub module: String,
    pub target: BuildTarget,
    pub resolved: String,
    pub integrity: String,
}

/// Difference between a lock file and the current table or shim sources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockIssue {
    #[error("`{module}` on `{target}` is aliased but not locked")]
    Unlocked { module: String, target: BuildTarget },

    #[error("`{module}` on `{target}` is locked but no longer aliased")]
    Stale { module: String, target: BuildTarget },

    #[error("`{module}` on `{target}` now resolves to `{current}` (locked: `{locked}`)")]
    Retargeted {
        module: String,
        target: BuildTarget,
        locked: String,
        current: String,
    },

    #[error("integrity mismatch for `{module}` on `{target}`: expected {expected}, got {actual}")]
    IntegrityMismatch {
        module: String,
        target: BuildTarget,
        expected: String,
        actual: String,
    },

    #[error("cannot hash shim for `{module}` on `{target}`: {message}")]
    Unreadable {
        module: String,
        target: BuildTarget,
        message: String,
    },
}

fn lock_key(module: &str, target: BuildTarget) -> String {
    format!("{}@{}", module, target)
}

/// `sha256:<hex>` of a shim source
pub fn integrity_of(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

impl LockFile {
    /// Create a new empty lock file
    pub fn new() -> Self {
        Self {
            version: 1,
            lock_time: Utc::now().to_rfc3339(),
            aliases: BTreeMap::new(),
        }
    }

    /// Load lock file from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        Self::from_str(&content)
    }

    /// Parse lock file from string
    pub fn from_str(content: &str) -> Result<Self> {
        let lockfile: LockFile =
            serde_json::from_str(content).context("Failed to parse shimlink.lock")?;

        Ok(lockfile)
    }

    /// Save lock file to disk
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize lock file")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Pin every substitute in `table` to the hash of its shim source
    pub fn generate(table: &AliasTable, loader: &dyn ModuleLoader) -> Result<Self, ModuleLoadError> {
        let mut lockfile = Self::new();

        for (id, target, alias) in table.iter() {
            let Some(reference) = alias.substitute() else {
                continue;
            };
            let module = loader.load(reference.as_str(), target)?;

            lockfile.aliases.insert(
                lock_key(id.as_str(), target),
                LockedAlias {
                    module: id.to_string(),
                    target,
                    resolved: reference.to_string(),
                    integrity: integrity_of(&module.source),
                },
            );
        }

        Ok(lockfile)
    }

    /// Compare with the current table and shim sources
    pub fn validate(&self, table: &AliasTable, loader: &dyn ModuleLoader) -> Vec<LockIssue> {
        let mut issues = Vec::new();

        for (id, target, alias) in table.iter() {
            let Some(reference) = alias.substitute() else {
                continue;
            };
            let module = id.to_string();

            let Some(locked) = self.aliases.get(&lock_key(id.as_str(), target)) else {
                issues.push(LockIssue::Unlocked { module, target });
                continue;
            };

            if locked.resolved != reference.as_str() {
                issues.push(LockIssue::Retargeted {
                    module,
                    target,
                    locked: locked.resolved.clone(),
                    current: reference.to_string(),
                });
                continue;
            }

            match loader.load(reference.as_str(), target) {
                Ok(shim) => {
                    let actual = integrity_of(&shim.source);
                    if actual != locked.integrity {
                        issues.push(LockIssue::IntegrityMismatch {
                            module,
                            target,
                            expected: locked.integrity.clone(),
                            actual,
                        });
                    }
                }
                Err(err) => issues.push(LockIssue::Unreadable {
                    module,
                    target,
                    message: err.to_string(),
                }),
            }
        }

        for locked in self.aliases.values() {
            if table.lookup(&locked.module, locked.target).is_none() {
                issues.push(LockIssue::Stale {
                    module: locked.module.clone(),
                    target: locked.target,
                });
            }
        }

        issues
    }

    /// Check if lock file exists next to the configuration
    pub fn exists(root: &Path) -> bool {
        root.join(LOCK_FILE).exists()
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}
