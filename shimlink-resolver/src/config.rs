// Alias configuration - shimlink.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::alias::{AliasTable, ModuleIdentifier};
use crate::checker::CheckPolicy;
use crate::error::{ConfigurationError, InvalidConfiguration};
use crate::loader::FsModuleLoader;
use crate::target::BuildTarget;

pub const CONFIG_FILE: &str = "shimlink.json";

/// Expands to every supported platform in an alias entry's `targets`
const ALL_TARGETS: &str = "*";

/// Main configuration structure (shimlink.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShimConfig {
    pub name: String,

    /// Platforms the bundler builds for
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,

    /// Source file extensions, in resolution order
    #[serde(default = "default_source_exts")]
    pub source_exts: Vec<String>,

    /// package.json entry fields, in resolution order
    #[serde(default = "default_main_fields")]
    pub main_fields: Vec<String>,

    #[serde(default)]
    pub aliases: Vec<AliasEntryConfig>,

    #[serde(default)]
    pub checker: CheckerConfig,
}

/// One alias line: a module, the targets it applies to, and what they get
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntryConfig {
    pub module: String,

    pub targets: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub use_default: bool,

    /// Unlisted platforms load the real module
    #[serde(default, skip_serializing_if = "is_false")]
    pub fill_defaults: bool,
}

/// Shim contract checker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerConfig {
    /// Fail on any conformance violation
    #[serde(default)]
    pub strict: bool,

    /// Directories scanned for application imports
    #[serde(default = "default_app_roots")]
    pub app_roots: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_platforms() -> Vec<String> {
    BuildTarget::all().iter().map(|t| t.as_str().to_string()).collect()
}

fn default_source_exts() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "cjs"].iter().map(|s| s.to_string()).collect()
}

fn default_main_fields() -> Vec<String> {
    ["react-native", "browser", "main"].iter().map(|s| s.to_string()).collect()
}

fn default_app_roots() -> Vec<String> {
    vec!["app".to_string()]
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            app_roots: default_app_roots(),
        }
    }
}

impl AliasEntryConfig {
    pub fn substitute(module: &str, targets: &[&str], path: &str) -> Self {
        Self {
            module: module.to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            path: Some(path.to_string()),
            use_default: false,
            fill_defaults: true,
        }
    }
}

impl Default for ShimConfig {
    /// Web stand-ins for the native-only map view and the React Native
    /// codegen helpers it pulls in
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            platforms: default_platforms(),
            source_exts: default_source_exts(),
            main_fields: default_main_fields(),
            aliases: vec![
                AliasEntryConfig::substitute(
                    "react-native-maps",
                    &["web"],
                    "./web-stubs/react-native-maps.js",
                ),
                AliasEntryConfig::substitute(
                    "react-native/Libraries/Utilities/codegenNativeCommands",
                    &["web"],
                    "./web-stubs/codegenNativeCommands.js",
                ),
                AliasEntryConfig::substitute(
                    "react-native/Libraries/Utilities/codegenNativeComponent",
                    &["web"],
                    "./web-stubs/codegenNativeComponent.js",
                ),
            ],
            checker: CheckerConfig::default(),
        }
    }
}

impl ShimConfig {
    /// Parse shimlink.json from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        Self::parse(&content).with_context(|| format!("Failed to load {}", path.as_ref().display()))
    }

    /// Parse shimlink.json from string
    pub fn parse(content: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(content).map_err(|e| ConfigurationError::Malformed(e.to_string()))
    }

    /// Write configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Parsed `platforms`
    pub fn supported_targets(&self) -> Result<Vec<BuildTarget>, ConfigurationError> {
        let mut targets = Vec::new();
        for name in &self.platforms {
            let target: BuildTarget = name.parse()?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    pub fn policy(&self) -> CheckPolicy {
        if self.checker.strict {
            CheckPolicy::Strict
        } else {
            CheckPolicy::Report
        }
    }

    /// Module loader rooted at `root` with this configuration's resolution order
    pub fn loader(&self, root: &Path) -> FsModuleLoader {
        FsModuleLoader::new(root, self.source_exts.clone(), self.main_fields.clone())
    }

    /// Build and validate the alias table.
    ///
    /// Fatal problems are all collected before failing. Duplicates stay in
    /// the returned table's warnings.
    pub fn build_table(&self) -> Result<AliasTable, InvalidConfiguration> {
        let supported = self
            .supported_targets()
            .map_err(|e| InvalidConfiguration { errors: vec![e] })?;

        let mut table = AliasTable::new();
        let mut errors = Vec::new();

        for entry in &self.aliases {
            if let Err(err) = register_entry(&mut table, entry, &supported) {
                errors.push(err);
            }
        }

        // Filled only once every explicit entry is in, so a later explicit
        // registration never shadows a filled default
        for entry in self.aliases.iter().filter(|entry| entry.fill_defaults) {
            let module = entry.module.trim();
            if !module.is_empty() {
                table.fill_defaults(&ModuleIdentifier::new(module), &supported);
            }
        }

        errors.extend(table.validate_completeness(&supported));

        if errors.is_empty() {
            log::debug!(
                "alias table: {} modules, {} entries, {} warnings",
                table.modules().count(),
                table.len(),
                table.warnings().len()
            );
            Ok(table)
        } else {
            Err(InvalidConfiguration { errors })
        }
    }
}

fn register_entry(
    table: &mut AliasTable,
    entry: &AliasEntryConfig,
    supported: &[BuildTarget],
) -> Result<(), ConfigurationError> {
    let module = entry.module.trim();
    if module.is_empty() {
        return Err(ConfigurationError::EmptyModuleId);
    }

    let invalid = |reason: &str| ConfigurationError::InvalidEntry {
        module: module.to_string(),
        reason: reason.to_string(),
    };

    let path = match (&entry.path, entry.use_default) {
        (Some(_), true) => return Err(invalid("`path` and `useDefault` are mutually exclusive")),
        (None, false) => return Err(invalid("one of `path` or `useDefault` is required")),
        (Some(path), false) if path.trim().is_empty() => return Err(invalid("`path` is empty")),
        (path, _) => path.as_deref(),
    };

    if entry.targets.is_empty() {
        return Err(invalid("`targets` is empty"));
    }

    let mut targets = Vec::new();
    for name in &entry.targets {
        if name == ALL_TARGETS {
            targets.extend_from_slice(supported);
            continue;
        }
        let target: BuildTarget = name.parse()?;
        if !supported.contains(&target) {
            return Err(invalid(&format!("target `{}` is not in `platforms`", target)));
        }
        targets.push(target);
    }

    for target in targets {
        match path {
            Some(path) => table.register(module, target, path),
            None => table.register_default(module, target),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasTarget;

    #[test]
    fn test_default_config_builds_complete_table() {
        let config = ShimConfig::default();
        let table = config.build_table().unwrap();

        assert_eq!(table.modules().count(), 3);
        assert_eq!(table.len(), 12);
        assert_eq!(
            table.lookup("react-native-maps", BuildTarget::Web).map(|r| r.as_str()),
            Some("./web-stubs/react-native-maps.js")
        );
        assert_eq!(table.lookup("react-native-maps", BuildTarget::Ios), None);
        assert!(table.warnings().is_empty());
    }

    #[test]
    fn test_parse_camel_case_keys() {
        let config = ShimConfig::parse(
            r#"{
                "name": "community-aid",
                "platforms": ["ios", "android", "web"],
                "sourceExts": ["js", "tsx"],
                "aliases": [
                    { "module": "maps-lib", "targets": ["web"], "path": "maps-lib/web-shim" },
                    { "module": "maps-lib", "targets": ["ios", "android"], "useDefault": true }
                ],
                "checker": { "strict": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.source_exts, vec!["js", "tsx"]);
        assert_eq!(config.main_fields, default_main_fields());
        assert_eq!(config.checker.app_roots, vec!["app"]);
        assert_eq!(config.policy(), CheckPolicy::Strict);

        let table = config.build_table().unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_incomplete_entry_is_fatal() {
        let config = ShimConfig::parse(
            r#"{ "name": "x", "aliases": [
                { "module": "maps-lib", "targets": ["web"], "path": "./shim.js" }
            ] }"#,
        )
        .unwrap();

        let err = config.build_table().unwrap_err();
        assert_eq!(
            err.errors,
            vec![ConfigurationError::IncompleteEntry {
                module: "maps-lib".to_string(),
                missing: vec![BuildTarget::Ios, BuildTarget::Android, BuildTarget::Native],
            }]
        );
    }

    #[test]
    fn test_invalid_entries_all_reported() {
        let config = ShimConfig::parse(
            r#"{ "name": "x", "aliases": [
                { "module": "", "targets": ["web"], "path": "./a.js" },
                { "module": "a", "targets": ["web"], "path": "./a.js", "useDefault": true },
                { "module": "b", "targets": ["web"] },
                { "module": "c", "targets": ["windows"], "path": "./c.js" },
                { "module": "d", "targets": ["*"], "path": "./d.js" }
            ] }"#,
        )
        .unwrap();

        let err = config.build_table().unwrap_err();
        assert_eq!(err.errors.len(), 4);
        assert_eq!(err.errors[0], ConfigurationError::EmptyModuleId);
        assert!(matches!(&err.errors[1], ConfigurationError::InvalidEntry { module, .. } if module == "a"));
        assert!(matches!(&err.errors[2], ConfigurationError::InvalidEntry { module, .. } if module == "b"));
        assert_eq!(err.errors[3], ConfigurationError::UnknownTarget("windows".to_string()));
    }

    #[test]
    fn test_duplicates_are_warnings() {
        let config = ShimConfig::parse(
            r#"{ "name": "x", "platforms": ["web", "ios"], "aliases": [
                { "module": "m", "targets": ["*"], "path": "./first.js" },
                { "module": "m", "targets": ["web"], "path": "./second.js" }
            ] }"#,
        )
        .unwrap();

        let table = config.build_table().unwrap();
        assert_eq!(table.warnings().len(), 1);
        assert_eq!(
            table.lookup("m", BuildTarget::Web).map(|r| r.as_str()),
            Some("./second.js")
        );
        assert_eq!(
            table.lookup("m", BuildTarget::Ios).map(|r| r.as_str()),
            Some("./first.js")
        );
    }

    #[test]
    fn test_fill_defaults_is_order_independent() {
        let fill = r#"{ "module": "m", "targets": ["web"], "path": "./w.js", "fillDefaults": true }"#;
        let ios = r#"{ "module": "m", "targets": ["ios"], "path": "./i.js" }"#;

        for aliases in [format!("{}, {}", fill, ios), format!("{}, {}", ios, fill)] {
            let source = format!(
                r#"{{ "name": "x", "platforms": ["web", "ios", "android"], "aliases": [{}] }}"#,
                aliases
            );
            let table = ShimConfig::parse(&source).unwrap().build_table().unwrap();

            assert!(table.warnings().is_empty(), "{:?}", table.warnings());
            assert_eq!(table.len(), 3);
            assert_eq!(
                table.lookup("m", BuildTarget::Ios).map(|r| r.as_str()),
                Some("./i.js")
            );
            assert_eq!(table.get("m", BuildTarget::Android), Some(&AliasTarget::UseDefault));
        }
    }

    #[test]
    fn test_malformed_json() {
        let err = ShimConfig::parse("{ \"name\": ").unwrap_err();
        assert!(matches!(err, ConfigurationError::Malformed(_)));
    }

    #[test]
    fn test_unknown_platform_fails_table() {
        let mut config = ShimConfig::default();
        config.platforms.push("tvos".to_string());
        let err = config.build_table().unwrap_err();
        assert_eq!(err.errors, vec![ConfigurationError::UnknownTarget("tvos".to_string())]);
    }
}
