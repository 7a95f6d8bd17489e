// Export surface of one module

use crate::shape::ExportShape;
use crate::DEFAULT_EXPORT;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

/// A single exported binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedSymbol {
    pub name: String,
    pub shape: ExportShape,
    /// Byte range of the exported name in the module source
    #[serde(skip)]
    pub span: Range<usize>,
    /// Specifier of the module this name is re-exported from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ExportedSymbol {
    pub fn new(name: impl Into<String>, shape: ExportShape, span: Range<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
            span,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// `export * from '<specifier>'`, or `module.exports = require('<specifier>')`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarReexport {
    pub specifier: String,
    #[serde(skip)]
    pub span: Range<usize>,
    /// CommonJS passthrough: the whole module, `default` included
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub commonjs: bool,
}

/// Everything a module exports, keyed by exported name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSurface {
    symbols: BTreeMap<String, ExportedSymbol>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    star_reexports: Vec<StarReexport>,
}

impl ExportSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exported binding; a repeated name merges shapes
    pub fn insert(&mut self, symbol: ExportedSymbol) {
        match self.symbols.get_mut(&symbol.name) {
            Some(existing) => existing.shape = existing.shape.merge(symbol.shape),
            None => {
                self.symbols.insert(symbol.name.clone(), symbol);
            }
        }
    }

    pub fn add_star_reexport(&mut self, specifier: impl Into<String>, span: Range<usize>) {
        self.star_reexports.push(StarReexport {
            specifier: specifier.into(),
            span,
            commonjs: false,
        });
    }

    pub fn add_require_reexport(&mut self, specifier: impl Into<String>, span: Range<usize>) {
        self.star_reexports.push(StarReexport {
            specifier: specifier.into(),
            span,
            commonjs: true,
        });
    }

    /// Fold in the surface behind `star`.
    ///
    /// Local names shadow re-exported ones. `default` only comes through a
    /// CommonJS passthrough, never through `export *`.
    pub fn merge_star(&mut self, other: &ExportSurface, star: &StarReexport) {
        for (name, symbol) in &other.symbols {
            if (name == DEFAULT_EXPORT && !star.commonjs) || self.symbols.contains_key(name) {
                continue;
            }
            let mut symbol = symbol.clone();
            if symbol.origin.is_none() {
                symbol.origin = Some(star.specifier.clone());
            }
            self.symbols.insert(name.clone(), symbol);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExportedSymbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }

    /// Runtime bindings only (type-only exports are erased by bundlers)
    pub fn runtime_names(&self) -> Vec<String> {
        self.symbols
            .values()
            .filter(|s| !s.shape.is_type_only())
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportedSymbol> + '_ {
        self.symbols.values()
    }

    pub fn star_reexports(&self) -> &[StarReexport] {
        &self.star_reexports
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_merges_repeated_names() {
        let mut surface = ExportSurface::new();
        surface.insert(ExportedSymbol::new("Props", ExportShape::Type, 0..5));
        surface.insert(ExportedSymbol::new("Props", ExportShape::Class, 10..15));

        assert_eq!(surface.len(), 1);
        assert_eq!(surface.get("Props").unwrap().shape, ExportShape::Class);
        assert_eq!(surface.get("Props").unwrap().span, 0..5);
    }

    #[test]
    fn test_merge_star_skips_default_and_shadowed() {
        let mut inner = ExportSurface::new();
        inner.insert(ExportedSymbol::new("default", ExportShape::Class, 0..1));
        inner.insert(ExportedSymbol::new("Marker", ExportShape::callable(1), 0..1));
        inner.insert(ExportedSymbol::new("Polyline", ExportShape::Unknown, 0..1));

        let mut outer = ExportSurface::new();
        outer.insert(ExportedSymbol::new("Marker", ExportShape::Class, 0..1));
        outer.add_star_reexport("./components", 0..1);
        let star = outer.star_reexports()[0].clone();
        outer.merge_star(&inner, &star);

        assert_eq!(outer.names(), vec!["Marker".to_string(), "Polyline".to_string()]);
        assert_eq!(outer.get("Marker").unwrap().shape, ExportShape::Class);
        assert_eq!(
            outer.get("Polyline").unwrap().origin.as_deref(),
            Some("./components")
        );
    }

    #[test]
    fn test_require_passthrough_keeps_default() {
        let mut inner = ExportSurface::new();
        inner.insert(ExportedSymbol::new("default", ExportShape::callable(1), 0..1));
        inner.insert(ExportedSymbol::new("Marker", ExportShape::callable(1), 0..1));

        let mut outer = ExportSurface::new();
        outer.add_require_reexport("./impl", 0..1);
        let star = outer.star_reexports()[0].clone();
        assert!(star.commonjs);
        outer.merge_star(&inner, &star);

        assert_eq!(outer.names(), vec!["Marker".to_string(), "default".to_string()]);
        assert_eq!(outer.get("default").unwrap().shape, ExportShape::callable(1));
        assert_eq!(outer.get("default").unwrap().origin.as_deref(), Some("./impl"));
    }

    #[test]
    fn test_runtime_names_drop_types() {
        let mut surface = ExportSurface::new();
        surface.insert(ExportedSymbol::new("MapViewProps", ExportShape::Type, 0..1));
        surface.insert(ExportedSymbol::new("MapView", ExportShape::Unknown, 0..1));

        assert_eq!(surface.runtime_names(), vec!["MapView".to_string()]);
    }
}
