// shimlink-resolver - platform module substitution
//
// An alias table maps (module id, build target) to a substitute, the target
// resolver answers the bundler's resolution hook from it, and the shim
// contract checker verifies that each substitute exports what application
// code takes from the module it replaces.

pub mod alias;
pub mod checker;
pub mod config;
pub mod drift;
pub mod error;
pub mod loader;
pub mod lockfile;
pub mod resolver;
pub mod target;
pub mod usage;

pub use alias::{AliasTable, AliasTarget, ModuleIdentifier, ModuleReference};
pub use checker::{CheckPolicy, ConformanceReport, ConformanceViolation, ShimContractChecker, TableCheck};
pub use config::{AliasEntryConfig, CheckerConfig, ShimConfig, CONFIG_FILE};
pub use drift::{diff_tables, same_substitutes, Drift};
pub use error::{ConfigurationError, InvalidConfiguration, ModuleLoadError};
pub use loader::{platform_candidates, FsModuleLoader, LoadedModule, MemoryLoader, ModuleLoader};
pub use lockfile::{integrity_of, LockFile, LockIssue, LockedAlias, LOCK_FILE};
pub use resolver::TargetResolver;
pub use target::BuildTarget;
pub use usage::UsageIndex;
