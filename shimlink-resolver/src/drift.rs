// Drift between two alias tables (near-duplicate configurations)

use serde::Serialize;
use shimlink_diagnostics::{error_codes, Diagnostic, Span};
use std::collections::BTreeSet;

use crate::alias::{AliasTable, ModuleIdentifier};
use crate::target::BuildTarget;

/// One `(module, target)` pair on which two tables disagree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Drift {
    OnlyLeft {
        module: String,
        target: BuildTarget,
        alias: String,
    },
    OnlyRight {
        module: String,
        target: BuildTarget,
        alias: String,
    },
    Changed {
        module: String,
        target: BuildTarget,
        left: String,
        right: String,
    },
}

impl Drift {
    /// Render against the two configuration files being compared
    pub fn to_diagnostic(&self, left_file: &str, right_file: &str) -> Diagnostic {
        match self {
            Drift::OnlyLeft { module, target, alias } => Diagnostic::warning(
                error_codes::DRIFT_ONLY_LEFT,
                format!("`{}` on `{}` is only aliased in {}", module, target, left_file),
                Span::new(left_file.to_string(), 0, 0, 0),
            )
            .with_note(format!("{} maps it to `{}`", left_file, alias)),
            Drift::OnlyRight { module, target, alias } => Diagnostic::warning(
                error_codes::DRIFT_ONLY_RIGHT,
                format!("`{}` on `{}` is only aliased in {}", module, target, right_file),
                Span::new(right_file.to_string(), 0, 0, 0),
            )
            .with_note(format!("{} maps it to `{}`", right_file, alias)),
            Drift::Changed {
                module,
                target,
                left,
                right,
            } => Diagnostic::warning(
                error_codes::DRIFT_CHANGED,
                format!("`{}` on `{}` is aliased differently", module, target),
                Span::new(left_file.to_string(), 0, 0, 0),
            )
            .with_related(Span::new(right_file.to_string(), 0, 0, 0), format!("maps it to `{}`", right))
            .with_note(format!("{} maps it to `{}`", left_file, left)),
        }
    }
}

/// Every pair on which `left` and `right` disagree, in sorted order.
///
/// A missing pair and an explicit use-default marker are different: the
/// first fails completeness, the second is a decision.
pub fn diff_tables(left: &AliasTable, right: &AliasTable) -> Vec<Drift> {
    let modules: BTreeSet<&ModuleIdentifier> = left.modules().chain(right.modules()).collect();
    let mut drift = Vec::new();

    for module in modules {
        for target in BuildTarget::all() {
            let l = left.get(module.as_str(), *target);
            let r = right.get(module.as_str(), *target);
            let name = module.to_string();

            match (l, r) {
                (Some(l), None) => drift.push(Drift::OnlyLeft {
                    module: name,
                    target: *target,
                    alias: l.to_string(),
                }),
                (None, Some(r)) => drift.push(Drift::OnlyRight {
                    module: name,
                    target: *target,
                    alias: r.to_string(),
                }),
                (Some(l), Some(r)) if l != r => drift.push(Drift::Changed {
                    module: name,
                    target: *target,
                    left: l.to_string(),
                    right: r.to_string(),
                }),
                _ => {}
            }
        }
    }

    drift
}

/// Whether two tables substitute the same references everywhere, ignoring
/// use-default markers
pub fn same_substitutes(left: &AliasTable, right: &AliasTable) -> bool {
    let modules: BTreeSet<&ModuleIdentifier> = left.modules().chain(right.modules()).collect();
    modules.iter().all(|module| {
        BuildTarget::all()
            .iter()
            .all(|t| left.lookup(module.as_str(), *t) == right.lookup(module.as_str(), *t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_tables_have_no_drift() {
        let mut a = AliasTable::new();
        a.register("maps", BuildTarget::Web, "./web-stubs/maps.js");
        let b = a.clone();
        assert!(diff_tables(&a, &b).is_empty());
    }

    #[test]
    fn test_drift_kinds() {
        let mut a = AliasTable::new();
        a.register("maps", BuildTarget::Web, "./web-stubs/maps.js");
        a.register("codegen", BuildTarget::Web, "./web-stubs/codegen.js");

        let mut b = AliasTable::new();
        b.register("maps", BuildTarget::Web, "./stubs/maps.web.js");
        b.register_default("maps", BuildTarget::Ios);

        let drift = diff_tables(&a, &b);
        assert_eq!(
            drift,
            vec![
                Drift::OnlyLeft {
                    module: "codegen".to_string(),
                    target: BuildTarget::Web,
                    alias: "./web-stubs/codegen.js".to_string(),
                },
                Drift::OnlyRight {
                    module: "maps".to_string(),
                    target: BuildTarget::Ios,
                    alias: "<use-default>".to_string(),
                },
                Drift::Changed {
                    module: "maps".to_string(),
                    target: BuildTarget::Web,
                    left: "./web-stubs/maps.js".to_string(),
                    right: "./stubs/maps.web.js".to_string(),
                },
            ]
        );
        assert!(!same_substitutes(&a, &b));
    }

    #[test]
    fn test_use_default_markers_do_not_change_substitutes() {
        let mut a = AliasTable::new();
        a.register("maps", BuildTarget::Web, "./web-stubs/maps.js");
        let mut b = a.clone();
        b.register_default("maps", BuildTarget::Android);

        assert_eq!(diff_tables(&a, &b).len(), 1);
        assert!(same_substitutes(&a, &b));
    }

    #[test]
    fn test_drift_diagnostic_names_both_files() {
        let drift = Drift::Changed {
            module: "maps".to_string(),
            target: BuildTarget::Web,
            left: "./a.js".to_string(),
            right: "./b.js".to_string(),
        };
        let diag = drift.to_diagnostic("metro.config.json", "shimlink.json");
        assert_eq!(diag.code, error_codes::DRIFT_CHANGED);
        assert_eq!(diag.related[0].span.file, "shimlink.json");
    }
}
