// Usage index: which symbols application code takes from each module

use shimlink_diagnostics::Span;
use shimlink_surface::extract_imports;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ModuleLoadError;

/// Used symbols per imported module id, with every use site
#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    modules: BTreeMap<String, BTreeMap<String, Vec<Span>>>,
    files_scanned: usize,
}

impl UsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the imports of one source file
    pub fn add_source(&mut self, file: &str, source: &str) {
        for import in extract_imports(source) {
            let span = Span::from_file_and_span(file, source, import.span);
            self.modules
                .entry(import.module)
                .or_default()
                .entry(import.symbol)
                .or_default()
                .push(span);
        }
        self.files_scanned += 1;
    }

    /// Scan every source file under `app_roots` (relative to `project_root`).
    /// `node_modules` and hidden directories are skipped; missing roots are
    /// ignored.
    pub fn scan(
        project_root: &Path,
        app_roots: &[String],
        source_exts: &[String],
    ) -> Result<Self, ModuleLoadError> {
        let mut index = Self::new();

        for root in app_roots {
            let dir = project_root.join(root);
            if dir.is_file() {
                index.scan_file(project_root, &dir)?;
            } else if dir.is_dir() {
                index.scan_dir(project_root, &dir, source_exts)?;
            } else {
                log::debug!("application root {} does not exist", dir.display());
            }
        }

        log::debug!(
            "usage index: {} files, {} imported modules",
            index.files_scanned,
            index.modules.len()
        );
        Ok(index)
    }

    fn scan_dir(&mut self, project_root: &Path, dir: &Path, source_exts: &[String]) -> Result<(), ModuleLoadError> {
        let io_error = |source: std::io::Error| ModuleLoadError::Io {
            path: dir.to_path_buf(),
            source,
        };

        // Sorted walk so use sites are reported in a stable order
        let mut entries: Vec<_> = fs::read_dir(dir)
            .map_err(io_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_error)?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if path.is_dir() {
                if name == "node_modules" || name.starts_with('.') {
                    continue;
                }
                self.scan_dir(project_root, &path, source_exts)?;
            } else if path
                .extension()
                .is_some_and(|ext| source_exts.iter().any(|e| ext == e.as_str()))
            {
                self.scan_file(project_root, &path)?;
            }
        }

        Ok(())
    }

    fn scan_file(&mut self, project_root: &Path, path: &Path) -> Result<(), ModuleLoadError> {
        let source = fs::read_to_string(path).map_err(|source| ModuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let display = path.strip_prefix(project_root).unwrap_or(path);
        self.add_source(&display.to_string_lossy(), &source);
        Ok(())
    }

    /// Symbols used from `module`, or `None` if nothing imports it
    pub fn symbols(&self, module: &str) -> Option<&BTreeMap<String, Vec<Span>>> {
        self.modules.get(module)
    }

    /// Use sites of `module`'s `symbol`
    pub fn uses(&self, module: &str, symbol: &str) -> &[Span] {
        self.modules
            .get(module)
            .and_then(|symbols| symbols.get(symbol))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules.keys().map(String::as_str)
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
