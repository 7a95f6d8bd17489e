// Alias table: module identifier -> build target -> substitute

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigurationError;
use crate::target::BuildTarget;

/// Name of an abstract dependency as written in import statements
/// (e.g., "react-native-maps"). Matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleIdentifier(String);

/// Resolvable path or identifier of a concrete implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleReference(String);

macro_rules! string_newtype {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_newtype!(ModuleIdentifier);
string_newtype!(ModuleReference);

impl ModuleIdentifier {
    /// The reference that loads the real module unmodified
    pub fn canonical(&self) -> ModuleReference {
        ModuleReference(self.0.clone())
    }
}

/// What a target gets for an aliased module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reference")]
pub enum AliasTarget {
    Substitute(ModuleReference),
    /// Explicit "no substitution, load the real module"
    UseDefault,
}

impl AliasTarget {
    pub fn substitute(&self) -> Option<&ModuleReference> {
        match self {
            AliasTarget::Substitute(reference) => Some(reference),
            AliasTarget::UseDefault => None,
        }
    }
}

impl fmt::Display for AliasTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasTarget::Substitute(reference) => write!(f, "{}", reference),
            AliasTarget::UseDefault => f.write_str("<use-default>"),
        }
    }
}

/// Static alias configuration, built once and then shared read-only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    entries: BTreeMap<ModuleIdentifier, BTreeMap<BuildTarget, AliasTarget>>,
    warnings: Vec<ConfigurationError>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `(id, target)` to a substitute. Re-registering a pair overwrites
    /// it and records a `DuplicateAlias` warning.
    pub fn register(
        &mut self,
        id: impl Into<ModuleIdentifier>,
        target: BuildTarget,
        reference: impl Into<ModuleReference>,
    ) {
        self.insert(id.into(), target, AliasTarget::Substitute(reference.into()));
    }

    /// Mark `(id, target)` as explicitly using the real module
    pub fn register_default(&mut self, id: impl Into<ModuleIdentifier>, target: BuildTarget) {
        self.insert(id.into(), target, AliasTarget::UseDefault);
    }

    fn insert(&mut self, id: ModuleIdentifier, target: BuildTarget, alias: AliasTarget) {
        let targets = self.entries.entry(id.clone()).or_default();
        if let Some(previous) = targets.insert(target, alias.clone()) {
            log::warn!(
                "duplicate alias for `{}` on target `{}`: `{}` replaces `{}`",
                id,
                target,
                alias,
                previous
            );
            self.warnings.push(ConfigurationError::DuplicateAlias {
                module: id.to_string(),
                target,
                previous: previous.to_string(),
                current: alias.to_string(),
            });
        }
    }

    /// Mark every target in `supported` without an entry for `id` as use-default
    pub fn fill_defaults(&mut self, id: &ModuleIdentifier, supported: &[BuildTarget]) {
        let targets = self.entries.entry(id.clone()).or_default();
        for target in supported {
            targets.entry(*target).or_insert(AliasTarget::UseDefault);
        }
    }

    /// Substitute registered for exactly `(id, target)`; `None` means load
    /// the real module
    pub fn lookup(&self, id: &str, target: BuildTarget) -> Option<&ModuleReference> {
        self.entries
            .get(id)
            .and_then(|targets| targets.get(&target))
            .and_then(AliasTarget::substitute)
    }

    pub fn get(&self, id: &str, target: BuildTarget) -> Option<&AliasTarget> {
        self.entries.get(id).and_then(|targets| targets.get(&target))
    }

    /// One `IncompleteEntry` per module lacking an entry for some supported target
    pub fn validate_completeness(&self, supported: &[BuildTarget]) -> Vec<ConfigurationError> {
        self.entries
            .iter()
            .filter_map(|(id, targets)| {
                let missing: Vec<BuildTarget> = supported
                    .iter()
                    .filter(|t| !targets.contains_key(*t))
                    .copied()
                    .collect();
                (!missing.is_empty()).then(|| ConfigurationError::IncompleteEntry {
                    module: id.to_string(),
                    missing,
                })
            })
            .collect()
    }

    /// Every `(id, target, alias)` in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleIdentifier, BuildTarget, &AliasTarget)> + '_ {
        self.entries.iter().flat_map(|(id, targets)| {
            targets.iter().map(move |(target, alias)| (id, *target, alias))
        })
    }

    /// Substituted modules for one target
    pub fn substitutes(
        &self,
        target: BuildTarget,
    ) -> impl Iterator<Item = (&ModuleIdentifier, &ModuleReference)> + '_ {
        self.iter()
            .filter(move |(_, t, _)| *t == target)
            .filter_map(|(id, _, alias)| alias.substitute().map(|reference| (id, reference)))
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleIdentifier> + '_ {
        self.entries.keys()
    }

    /// Number of `(id, target)` entries
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recoverable problems seen while registering
    pub fn warnings(&self) -> &[ConfigurationError] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_registered_pair() {
        let mut table = AliasTable::new();
        table.register("maps-lib", BuildTarget::Web, "maps-lib/web-shim");

        assert_eq!(
            table.lookup("maps-lib", BuildTarget::Web).map(ModuleReference::as_str),
            Some("maps-lib/web-shim")
        );
        assert_eq!(table.lookup("maps-lib", BuildTarget::Ios), None);
        assert_eq!(table.lookup("other-lib", BuildTarget::Web), None);
    }

    #[test]
    fn test_duplicate_registration_last_write_wins() {
        let mut table = AliasTable::new();
        table.register("maps-lib", BuildTarget::Web, "./first.js");
        table.register("maps-lib", BuildTarget::Web, "./second.js");

        assert_eq!(
            table.lookup("maps-lib", BuildTarget::Web).map(ModuleReference::as_str),
            Some("./second.js")
        );
        assert_eq!(table.warnings().len(), 1);
        assert_eq!(
            table.warnings()[0],
            ConfigurationError::DuplicateAlias {
                module: "maps-lib".to_string(),
                target: BuildTarget::Web,
                previous: "./first.js".to_string(),
                current: "./second.js".to_string(),
            }
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_use_default_is_not_a_substitute() {
        let mut table = AliasTable::new();
        table.register_default("maps-lib", BuildTarget::Ios);

        assert_eq!(table.lookup("maps-lib", BuildTarget::Ios), None);
        assert_eq!(table.get("maps-lib", BuildTarget::Ios), Some(&AliasTarget::UseDefault));
    }

    #[test]
    fn test_completeness_reports_missing_targets() {
        let mut table = AliasTable::new();
        table.register("maps-lib", BuildTarget::Web, "./web.js");
        table.register_default("maps-lib", BuildTarget::Ios);
        table.register("codegen", BuildTarget::Web, "./codegen.js");
        table.fill_defaults(&ModuleIdentifier::new("codegen"), BuildTarget::all());

        let errors = table.validate_completeness(BuildTarget::all());
        assert_eq!(
            errors,
            vec![ConfigurationError::IncompleteEntry {
                module: "maps-lib".to_string(),
                missing: vec![BuildTarget::Android, BuildTarget::Native],
            }]
        );
    }

    #[test]
    fn test_substitutes_for_target() {
        let mut table = AliasTable::new();
        table.register("b", BuildTarget::Web, "./b.js");
        table.register("a", BuildTarget::Web, "./a.js");
        table.register("a", BuildTarget::Ios, "./a.ios.js");
        table.register_default("c", BuildTarget::Web);

        let web: Vec<(&str, &str)> = table
            .substitutes(BuildTarget::Web)
            .map(|(id, r)| (id.as_str(), r.as_str()))
            .collect();
        assert_eq!(web, vec![("a", "./a.js"), ("b", "./b.js")]);
    }
}
