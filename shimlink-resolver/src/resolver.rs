// Target resolver: the bundler's module-resolution hook

use std::path::PathBuf;
use std::sync::Arc;

use crate::alias::{AliasTable, ModuleReference};
use crate::error::ModuleLoadError;
use crate::loader::ModuleLoader;
use crate::target::BuildTarget;

/// Resolves `(module id, build target)` to the reference a bundle loads.
///
/// Holds the alias table immutably, so clones can be handed to parallel
/// workers without locking.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    table: Arc<AliasTable>,
}

impl TargetResolver {
    pub fn new(table: AliasTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &AliasTable {
        &self.table
    }

    /// Substitute for `(id, target)` if one is registered, otherwise the
    /// module itself
    pub fn resolve(&self, id: &str, target: BuildTarget) -> ModuleReference {
        match self.table.lookup(id, target) {
            Some(substitute) => {
                log::debug!("resolve {} [{}] -> {}", id, target, substitute);
                substitute.clone()
            }
            None => ModuleReference::new(id),
        }
    }

    /// `resolve` for each id, in input order
    pub fn resolve_all<'a, I>(&self, ids: I, target: BuildTarget) -> Vec<ModuleReference>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().map(|id| self.resolve(id, target)).collect()
    }

    /// Resolve and then locate the file the bundler would load
    pub fn resolve_path(
        &self,
        id: &str,
        target: BuildTarget,
        loader: &dyn ModuleLoader,
    ) -> Result<PathBuf, ModuleLoadError> {
        let reference = self.resolve(id, target);
        loader.locate(reference.as_str(), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    fn maps_table() -> AliasTable {
        let mut table = AliasTable::new();
        table.register("maps-lib", BuildTarget::Web, "maps-lib/web-shim");
        table
    }

    #[test]
    fn test_resolve_substitute_and_canonical() {
        let resolver = TargetResolver::new(maps_table());

        assert_eq!(resolver.resolve("maps-lib", BuildTarget::Web).as_str(), "maps-lib/web-shim");
        assert_eq!(resolver.resolve("maps-lib", BuildTarget::Ios).as_str(), "maps-lib");
        assert_eq!(resolver.resolve("react", BuildTarget::Web).as_str(), "react");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = TargetResolver::new(maps_table());
        let first = resolver.resolve("maps-lib", BuildTarget::Web);
        for _ in 0..10 {
            assert_eq!(resolver.resolve("maps-lib", BuildTarget::Web), first);
        }
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let resolver = TargetResolver::new(maps_table());
        let resolved = resolver.resolve_all(["react", "maps-lib"], BuildTarget::Web);
        assert_eq!(
            resolved,
            vec![ModuleReference::new("react"), ModuleReference::new("maps-lib/web-shim")]
        );
    }

    #[test]
    fn test_parallel_resolution_shares_table() {
        let resolver = TargetResolver::new(maps_table());

        std::thread::scope(|scope| {
            let handles: Vec<_> = BuildTarget::all()
                .iter()
                .map(|target| {
                    let resolver = resolver.clone();
                    scope.spawn(move || resolver.resolve("maps-lib", *target))
                })
                .collect();

            for (handle, target) in handles.into_iter().zip(BuildTarget::all()) {
                let resolved = handle.join().unwrap();
                let expected = if *target == BuildTarget::Web {
                    "maps-lib/web-shim"
                } else {
                    "maps-lib"
                };
                assert_eq!(resolved.as_str(), expected);
            }
        });
    }

    #[test]
    fn test_resolve_path_through_loader() {
        let mut loader = MemoryLoader::new();
        loader.add("maps-lib/web-shim", "export default function MapView() {}");

        let resolver = TargetResolver::new(maps_table());
        let path = resolver
            .resolve_path("maps-lib", BuildTarget::Web, &loader)
            .unwrap();
        assert_eq!(path, PathBuf::from("maps-lib/web-shim"));

        let err = resolver
            .resolve_path("maps-lib", BuildTarget::Ios, &loader)
            .unwrap_err();
        assert!(matches!(err, ModuleLoadError::NotFound { .. }));
    }
}
