// Shim contract checker: does a shim export what application code takes
// from the module it replaces?

use serde::Serialize;
use shimlink_diagnostics::{fuzzy, DiagnosticEngine, ErrorLevel, Span};
use shimlink_surface::{extract_exports, ExportShape, ExportSurface};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::alias::{AliasTable, ModuleIdentifier, ModuleReference};
use crate::error::ModuleLoadError;
use crate::loader::{LoadedModule, ModuleLoader};
use crate::target::BuildTarget;
use crate::usage::UsageIndex;

/// Whether violations fail the check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckPolicy {
    /// Violations are reported; shims are allowed to be partial
    #[default]
    Report,
    /// Any violation fails the check
    Strict,
}

/// A gap between a shim and the real module's used surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConformanceViolation {
    /// The shim does not export a symbol application code uses
    #[serde(rename_all = "camelCase")]
    MissingSymbol {
        symbol: String,
        uses: Vec<Span>,
        suggestions: Vec<String>,
    },
    /// The shim exports the symbol with an incompatible shape
    #[serde(rename_all = "camelCase")]
    ShapeMismatch {
        symbol: String,
        expected: ExportShape,
        found: ExportShape,
        uses: Vec<Span>,
        shim_location: Span,
    },
}

impl ConformanceViolation {
    pub fn symbol(&self) -> &str {
        match self {
            ConformanceViolation::MissingSymbol { symbol, .. }
            | ConformanceViolation::ShapeMismatch { symbol, .. } => symbol,
        }
    }
}

/// Result of comparing one shim with the module it stands in for
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformanceReport {
    pub real: ModuleReference,
    pub shim: ModuleReference,
    pub target: BuildTarget,
    pub real_path: PathBuf,
    pub shim_path: PathBuf,
    /// Symbols the shim was checked for
    pub checked: Vec<String>,
    pub violations: Vec<ConformanceViolation>,
}

impl ConformanceReport {
    pub fn is_conforming(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn passes(&self, policy: CheckPolicy) -> bool {
        policy == CheckPolicy::Report || self.is_conforming()
    }

    /// Report every violation; errors under `Strict`, warnings otherwise
    pub fn emit_diagnostics(&self, engine: &mut DiagnosticEngine, policy: CheckPolicy) {
        let level = match policy {
            CheckPolicy::Strict => ErrorLevel::Error,
            CheckPolicy::Report => ErrorLevel::Warning,
        };
        let shim_span = Span::from_path(&self.shim_path);

        for violation in &self.violations {
            match violation {
                ConformanceViolation::MissingSymbol {
                    symbol,
                    uses,
                    suggestions,
                } => {
                    let span = uses.first().cloned().unwrap_or_else(|| shim_span.clone());
                    engine.missing_symbol(
                        level,
                        self.real.as_str(),
                        self.shim.as_str(),
                        symbol,
                        span,
                        suggestions,
                    );
                }
                ConformanceViolation::ShapeMismatch {
                    symbol,
                    expected,
                    found,
                    shim_location,
                    ..
                } => {
                    engine.shape_mismatch(
                        level,
                        self.shim.as_str(),
                        symbol,
                        &expected.to_string(),
                        &found.to_string(),
                        shim_location.clone(),
                    );
                }
            }
        }
    }
}

/// Outcome of checking every substitute in a table for one target
#[derive(Debug, Default)]
pub struct TableCheck {
    pub reports: Vec<ConformanceReport>,
    /// Pairs whose modules could not be loaded
    pub failures: Vec<(ModuleIdentifier, ModuleLoadError)>,
}

impl TableCheck {
    pub fn violation_count(&self) -> usize {
        self.reports.iter().map(|r| r.violations.len()).sum()
    }

    pub fn passes(&self, policy: CheckPolicy) -> bool {
        self.failures.is_empty() && self.reports.iter().all(|r| r.passes(policy))
    }
}

/// Export surface of a loaded module with `export *` chains folded in
struct LoadedSurface {
    path: PathBuf,
    source: String,
    surface: ExportSurface,
}

/// Compares shims against the modules they replace, by shape only
pub struct ShimContractChecker<'a> {
    loader: &'a dyn ModuleLoader,
    usage: Option<&'a UsageIndex>,
    target: BuildTarget,
}

impl<'a> ShimContractChecker<'a> {
    pub fn new(loader: &'a dyn ModuleLoader, target: BuildTarget) -> Self {
        Self {
            loader,
            usage: None,
            target,
        }
    }

    /// Only check symbols application code actually uses. Without an index
    /// every runtime export of the real module is required.
    pub fn with_usage(mut self, usage: &'a UsageIndex) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn target(&self) -> BuildTarget {
        self.target
    }

    /// Target the real module is loaded for. A web shim replaces the
    /// native implementation, so the real side of a web check is native.
    fn real_target(&self) -> BuildTarget {
        if self.target.is_native() {
            self.target
        } else {
            BuildTarget::Native
        }
    }

    /// Compare `shim` with `real`. Every violation is collected; only a
    /// load failure on either side stops the check.
    pub fn verify(
        &self,
        real: &ModuleReference,
        shim: &ModuleReference,
    ) -> Result<ConformanceReport, ModuleLoadError> {
        let real_module = self.load_surface(real.as_str(), self.real_target())?;
        let shim_module = self.load_surface(shim.as_str(), self.target)?;

        let checked = self.required_symbols(real.as_str(), &real_module.surface);
        let shim_names = shim_module.surface.runtime_names();
        let mut violations = Vec::new();

        for name in &checked {
            let uses = self
                .usage
                .map(|usage| usage.uses(real.as_str(), name).to_vec())
                .unwrap_or_default();
            let expected = real_module
                .surface
                .get(name)
                .map_or(ExportShape::Unknown, |s| s.shape);

            match shim_module.surface.get(name) {
                None => violations.push(ConformanceViolation::MissingSymbol {
                    symbol: name.clone(),
                    uses,
                    suggestions: fuzzy::find_similar_exports(name, &shim_names),
                }),
                Some(found) if !expected.is_compatible_with(&found.shape) => {
                    let shim_location = if found.origin.is_none() {
                        Span::from_file_and_span(
                            &shim_module.path.to_string_lossy(),
                            &shim_module.source,
                            found.span.clone(),
                        )
                    } else {
                        Span::from_path(&shim_module.path)
                    };
                    violations.push(ConformanceViolation::ShapeMismatch {
                        symbol: name.clone(),
                        expected,
                        found: found.shape,
                        uses,
                        shim_location,
                    });
                }
                Some(_) => {}
            }
        }

        log::debug!(
            "{} -> {} [{}]: {} symbols checked, {} violations",
            real,
            shim,
            self.target,
            checked.len(),
            violations.len()
        );

        Ok(ConformanceReport {
            real: real.clone(),
            shim: shim.clone(),
            target: self.target,
            real_path: real_module.path,
            shim_path: shim_module.path,
            checked,
            violations,
        })
    }

    /// `verify` every substitute registered for this checker's target
    pub fn verify_table(&self, table: &AliasTable) -> TableCheck {
        let mut result = TableCheck::default();

        for (id, shim) in table.substitutes(self.target) {
            match self.verify(&id.canonical(), shim) {
                Ok(report) => result.reports.push(report),
                Err(err) => {
                    log::error!("cannot check `{}` against `{}`: {}", shim, id, err);
                    result.failures.push((id.clone(), err));
                }
            }
        }

        result
    }

    /// Symbols the shim must provide: used runtime exports of the real
    /// module, or all of them when no usage index is attached
    fn required_symbols(&self, module: &str, real: &ExportSurface) -> Vec<String> {
        let runtime = |name: &String| real.get(name).is_some_and(|s| !s.shape.is_type_only());

        match self.usage {
            Some(usage) => usage
                .symbols(module)
                .map(|used| {
                    used.keys()
                        .filter(|name| {
                            let exported = runtime(*name);
                            if !exported && !real.contains(name) {
                                log::debug!("`{}` is used but not exported by `{}`", name, module);
                            }
                            exported
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => real.runtime_names(),
        }
    }

    fn load_surface(&self, reference: &str, target: BuildTarget) -> Result<LoadedSurface, ModuleLoadError> {
        let module = self.loader.load(reference, target)?;
        let mut visited = HashSet::new();
        let surface = self.collect_surface(&module, target, &mut visited)?;
        Ok(LoadedSurface {
            path: module.path,
            source: module.source,
            surface,
        })
    }

    /// Exports of `module`, following `export * from` and `require` passthroughs.
    /// A module already on the chain contributes nothing the second time.
    fn collect_surface(
        &self,
        module: &LoadedModule,
        target: BuildTarget,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<ExportSurface, ModuleLoadError> {
        if !visited.insert(module.path.clone()) {
            return Ok(ExportSurface::new());
        }
        let mut surface = extract_exports(&module.source);

        let stars = surface.star_reexports().to_vec();

        for star in &stars {
            let inner = self.load_star(&module.path, &star.specifier, target)?;
            let inner_surface = self.collect_surface(&inner, target, visited)?;
            surface.merge_star(&inner_surface, star);
        }

        Ok(surface)
    }

    fn load_star(&self, from: &Path, specifier: &str, target: BuildTarget) -> Result<LoadedModule, ModuleLoadError> {
        log::debug!("following re-export of '{}' in {}", specifier, from.display());
        self.loader.load_relative(from, specifier, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    const REAL: &str = "\
        export default class MapView extends React.Component {}\n\
        export function Marker(props) {}\n\
        export const Polyline = (props) => null;\n\
        export const PROVIDER_GOOGLE = 'google';\n\
        export interface MapViewProps { region: Region }\n";

    fn loader_with_shim(shim: &str) -> MemoryLoader {
        let mut loader = MemoryLoader::new();
        loader.add("maps-lib/index.js", REAL).add("shims/maps.js", shim);
        loader
    }

    fn usage(source: &str) -> UsageIndex {
        let mut index = UsageIndex::new();
        index.add_source("app/screen.tsx", source);
        index
    }

    fn verify(loader: &MemoryLoader, usage: Option<&UsageIndex>) -> ConformanceReport {
        let mut checker = ShimContractChecker::new(loader, BuildTarget::Web);
        if let Some(usage) = usage {
            checker = checker.with_usage(usage);
        }
        checker
            .verify(&ModuleReference::new("maps-lib"), &ModuleReference::new("shims/maps.js"))
            .unwrap()
    }

    #[test]
    fn test_superset_shim_conforms() {
        let loader = loader_with_shim(
            "export default function MapView(props) { return null; }\n\
             export const Marker = (props) => null;\n\
             export const Polyline = (props) => null;\n\
             export const PROVIDER_GOOGLE = 'google';\n\
             export const Heatmap = () => null;\n",
        );
        let report = verify(&loader, None);
        assert!(report.is_conforming(), "{:?}", report.violations);
        assert_eq!(report.checked.len(), 4);
    }

    #[test]
    fn test_missing_used_symbol_is_one_violation() {
        let loader = loader_with_shim("export default function MapView() {}\nexport function Markr(p) {}\n");
        let index = usage("import MapView, { Marker } from 'maps-lib';");

        let report = verify(&loader, Some(&index));
        assert_eq!(report.violations.len(), 1);
        match &report.violations[0] {
            ConformanceViolation::MissingSymbol {
                symbol,
                uses,
                suggestions,
            } => {
                assert_eq!(symbol, "Marker");
                assert_eq!(uses.len(), 1);
                assert_eq!(suggestions, &vec!["Markr".to_string()]);
            }
            other => panic!("unexpected violation {:?}", other),
        }
    }

    #[test]
    fn test_unused_exports_are_not_required() {
        let loader = loader_with_shim("export default function MapView() {}\n");
        let index = usage("import MapView from 'maps-lib';\nimport type { MapViewProps } from 'maps-lib';");

        let report = verify(&loader, Some(&index));
        assert!(report.is_conforming());
        assert_eq!(report.checked, vec!["default".to_string()]);
    }

    #[test]
    fn test_shape_mismatch_reported_with_location() {
        let loader = loader_with_shim(
            "export default function MapView() {}\nexport const Marker = 'marker';\n",
        );
        let index = usage("import { Marker } from 'maps-lib';");

        let report = verify(&loader, Some(&index));
        assert_eq!(report.violations.len(), 1);
        match &report.violations[0] {
            ConformanceViolation::ShapeMismatch {
                expected,
                found,
                shim_location,
                ..
            } => {
                assert_eq!(*expected, ExportShape::callable(1));
                assert_eq!(*found, ExportShape::Constant);
                assert_eq!(shim_location.line, 2);
            }
            other => panic!("unexpected violation {:?}", other),
        }
        assert!(report.passes(CheckPolicy::Report));
        assert!(!report.passes(CheckPolicy::Strict));
    }

    #[test]
    fn test_star_reexports_followed_with_cycle_guard() {
        let mut loader = MemoryLoader::new();
        loader
            .add("maps-lib/index.js", "export * from './markers';\nexport default class MapView {}")
            .add("maps-lib/markers.js", "export * from './index';\nexport function Marker(p) {}")
            .add("shims/maps.js", "export default function MapView() {}");

        let report = verify(&loader, None);
        assert_eq!(report.checked, vec!["Marker".to_string(), "default".to_string()]);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].symbol(), "Marker");
    }

    #[test]
    fn test_require_passthrough_carries_default() {
        let mut loader = MemoryLoader::new();
        loader
            .add("maps-lib/index.js", "module.exports = require('./impl');")
            .add("maps-lib/impl.js", "module.exports = function MapView(props) {};")
            .add("shims/maps.js", "export const Marker = (props) => null;");
        let index = usage("import MapView from 'maps-lib';");

        let report = verify(&loader, Some(&index));
        assert_eq!(report.checked, vec!["default".to_string()]);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].symbol(), "default");
    }

    #[test]
    fn test_load_failure_is_fatal() {
        let mut loader = MemoryLoader::new();
        loader.add("maps-lib/index.js", REAL);

        let checker = ShimContractChecker::new(&loader, BuildTarget::Web);
        let err = checker
            .verify(&ModuleReference::new("maps-lib"), &ModuleReference::new("shims/missing.js"))
            .unwrap_err();
        assert!(matches!(err, ModuleLoadError::NotFound { .. }));
    }

    #[test]
    fn test_verify_table_collects_reports_and_failures() {
        let loader = loader_with_shim("export default function MapView() {}");
        let mut table = AliasTable::new();
        table.register("maps-lib", BuildTarget::Web, "shims/maps.js");
        table.register("gone-lib", BuildTarget::Web, "shims/gone.js");
        table.register_default("maps-lib", BuildTarget::Ios);

        let index = usage("import MapView from 'maps-lib';");
        let checker = ShimContractChecker::new(&loader, BuildTarget::Web).with_usage(&index);
        let result = checker.verify_table(&table);

        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0.as_str(), "gone-lib");
        assert!(!result.passes(CheckPolicy::Report));
    }

    #[test]
    fn test_diagnostics_follow_policy() {
        let loader = loader_with_shim("export default function MapView() {}");
        let index = usage("import { Marker } from 'maps-lib';");
        let report = verify(&loader, Some(&index));

        let mut engine = DiagnosticEngine::new();
        report.emit_diagnostics(&mut engine, CheckPolicy::Report);
        assert_eq!(engine.warning_count(), 1);
        assert!(!engine.has_errors());

        let mut engine = DiagnosticEngine::new();
        report.emit_diagnostics(&mut engine, CheckPolicy::Strict);
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.diagnostics()[0].span.file, "app/screen.tsx");
    }
}
