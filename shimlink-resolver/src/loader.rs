// Module loading: locate a reference on disk the way a bundler would,
// with platform-specific file selection

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ModuleLoadError;
use crate::target::BuildTarget;

/// Source text of a located module
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub path: PathBuf,
    pub source: String,
}

/// Where module sources come from
pub trait ModuleLoader: Send + Sync {
    /// File a reference (bare id or project-relative path) resolves to
    fn locate(&self, reference: &str, target: BuildTarget) -> Result<PathBuf, ModuleLoadError>;

    /// File a specifier imported from `from` resolves to
    fn locate_relative(
        &self,
        from: &Path,
        specifier: &str,
        target: BuildTarget,
    ) -> Result<PathBuf, ModuleLoadError>;

    fn read(&self, path: &Path) -> Result<String, ModuleLoadError>;

    fn load(&self, reference: &str, target: BuildTarget) -> Result<LoadedModule, ModuleLoadError> {
        let path = self.locate(reference, target)?;
        let source = self.read(&path)?;
        Ok(LoadedModule { path, source })
    }

    fn load_relative(
        &self,
        from: &Path,
        specifier: &str,
        target: BuildTarget,
    ) -> Result<LoadedModule, ModuleLoadError> {
        let path = self.locate_relative(from, specifier, target)?;
        let source = self.read(&path)?;
        Ok(LoadedModule { path, source })
    }
}

fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".."
}

/// Split a bare id into package name and subpath
/// Example: "@scope/pkg/lib/x" -> ("@scope/pkg", Some("lib/x"))
fn split_package(id: &str) -> (&str, Option<&str>) {
    let split_at = if id.starts_with('@') {
        id.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        id.find('/')
    };

    match split_at {
        Some(i) => (
            id.get(..i).unwrap_or(id),
            id.get(i + 1..).filter(|rest| !rest.is_empty()),
        ),
        None => (id, None),
    }
}

/// Candidate file names for `base`, in priority order
///
/// Priority, for each extension in order:
/// 1. {base}.{target}.{ext}
/// 2. {base}.native.{ext} (native targets only)
/// 3. {base}.{ext}
///
/// then the same for {base}/index. A base that already carries a source
/// extension tries its platform variants first, then itself.
pub fn platform_candidates(base: &str, target: BuildTarget, exts: &[String]) -> Vec<String> {
    let mut candidates = Vec::new();

    if let Some((stem, ext)) = base.rsplit_once('.') {
        if exts.iter().any(|e| e == ext) && !stem.ends_with('/') {
            candidates.push(format!("{}.{}.{}", stem, target.as_str(), ext));
            if target.is_native() && target != BuildTarget::Native {
                candidates.push(format!("{}.native.{}", stem, ext));
            }
            candidates.push(base.to_string());
            return candidates;
        }
    }

    let base = base.trim_end_matches('/');
    for prefix in [base.to_string(), format!("{}/index", base)] {
        for ext in exts {
            candidates.push(format!("{}.{}.{}", prefix, target.as_str(), ext));
            if target.is_native() && target != BuildTarget::Native {
                candidates.push(format!("{}.native.{}", prefix, ext));
            }
            candidates.push(format!("{}.{}", prefix, ext));
        }
    }

    candidates
}

/// Loads modules from a project directory and its `node_modules`
#[derive(Debug, Clone)]
pub struct FsModuleLoader {
    root: PathBuf,
    source_exts: Vec<String>,
    main_fields: Vec<String>,
}

impl FsModuleLoader {
    pub fn new(root: impl Into<PathBuf>, source_exts: Vec<String>, main_fields: Vec<String>) -> Self {
        Self {
            root: root.into(),
            source_exts,
            main_fields,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn select_file(&self, base: &Path, target: BuildTarget) -> Option<PathBuf> {
        let base_str = base.to_string_lossy();
        platform_candidates(&base_str, target, &self.source_exts)
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
    }

    fn locate_file(&self, base: &Path, specifier: &str, target: BuildTarget) -> Result<PathBuf, ModuleLoadError> {
        self.select_file(base, target)
            .ok_or_else(|| not_found(specifier, target))
    }

    fn locate_package(&self, id: &str, target: BuildTarget) -> Result<PathBuf, ModuleLoadError> {
        let (package, subpath) = split_package(id);
        let package_dir = self.root.join("node_modules").join(package);
        if !package_dir.is_dir() {
            return Err(not_found(id, target));
        }

        if let Some(subpath) = subpath {
            return self.locate_file(&package_dir.join(subpath), id, target);
        }

        let manifest_path = package_dir.join("package.json");
        if manifest_path.is_file() {
            let content = self.read(&manifest_path)?;
            let manifest: Value = serde_json::from_str(&content).map_err(|e| ModuleLoadError::InvalidPackage {
                path: manifest_path.clone(),
                message: e.to_string(),
            })?;

            // First main field present wins, in configured order
            for field in &self.main_fields {
                if let Some(entry) = manifest.get(field).and_then(Value::as_str) {
                    log::debug!("{}: using `{}` entry {}", id, field, entry);
                    if let Some(path) = self.select_file(&package_dir.join(entry), target) {
                        return Ok(path);
                    }
                }
            }
        }

        self.locate_file(&package_dir.join("index"), id, target)
    }
}

fn not_found(specifier: &str, target: BuildTarget) -> ModuleLoadError {
    ModuleLoadError::NotFound {
        specifier: specifier.to_string(),
        target,
    }
}

impl ModuleLoader for FsModuleLoader {
    fn locate(&self, reference: &str, target: BuildTarget) -> Result<PathBuf, ModuleLoadError> {
        if Path::new(reference).is_absolute() {
            self.locate_file(Path::new(reference), reference, target)
        } else if is_relative_specifier(reference) {
            self.locate_file(&self.root.join(reference), reference, target)
        } else {
            self.locate_package(reference, target)
        }
    }

    fn locate_relative(
        &self,
        from: &Path,
        specifier: &str,
        target: BuildTarget,
    ) -> Result<PathBuf, ModuleLoadError> {
        if !is_relative_specifier(specifier) {
            return self.locate(specifier, target);
        }
        let dir = from.parent().unwrap_or(self.root.as_path());
        self.locate_file(&dir.join(specifier), specifier, target)
    }

    fn read(&self, path: &Path) -> Result<String, ModuleLoadError> {
        fs::read_to_string(path).map_err(|source| ModuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// In-memory module sources keyed by normalized path
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
    source_exts: Vec<String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            source_exts: ["js", "jsx", "ts", "tsx"].iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn add(&mut self, path: &str, source: &str) -> &mut Self {
        self.files.insert(normalize(path), source.to_string());
        self
    }

    fn select(&self, base: &str, target: BuildTarget) -> Option<PathBuf> {
        let base = normalize(base);
        if self.files.contains_key(&base) {
            return Some(PathBuf::from(base));
        }
        platform_candidates(&base, target, &self.source_exts)
            .into_iter()
            .find(|candidate| self.files.contains_key(candidate))
            .map(PathBuf::from)
    }
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexically resolve `.` and `..` and drop a leading `./`
fn normalize(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::RootDir => parts.push(String::new()),
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

impl ModuleLoader for MemoryLoader {
    fn locate(&self, reference: &str, target: BuildTarget) -> Result<PathBuf, ModuleLoadError> {
        self.select(reference, target)
            .ok_or_else(|| not_found(reference, target))
    }

    fn locate_relative(
        &self,
        from: &Path,
        specifier: &str,
        target: BuildTarget,
    ) -> Result<PathBuf, ModuleLoadError> {
        if !is_relative_specifier(specifier) {
            return self.locate(specifier, target);
        }
        let joined = from.parent().unwrap_or(Path::new("")).join(specifier);
        self.select(&joined.to_string_lossy(), target)
            .ok_or_else(|| not_found(specifier, target))
    }

    fn read(&self, path: &Path) -> Result<String, ModuleLoadError> {
        self.files
            .get(&normalize(&path.to_string_lossy()))
            .cloned()
            .ok_or_else(|| ModuleLoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}
