// shimlink-surface - static export/import analysis of JS and TS modules
//
// Builds the export surface of a module (what a shim must provide) and the
// import uses of application code (what a shim is actually asked for) from
// token streams. Nothing here executes or evaluates module code.

mod cursor;
pub mod exports;
pub mod imports;
pub mod shape;
pub mod surface;

pub use exports::extract_exports;
pub use imports::{extract_imports, ImportedSymbol};
pub use shape::ExportShape;
pub use surface::{ExportSurface, ExportedSymbol, StarReexport};

/// Name used for a module's default export
pub const DEFAULT_EXPORT: &str = "default";
