// shimlink subcommands

use anyhow::{Context, Result};
use shimlink_diagnostics::{error_codes, Diagnostic, DiagnosticEngine, Span};
use shimlink_resolver::{
    diff_tables, AliasTable, BuildTarget, CheckPolicy, LockFile, LockIssue, ModuleLoader, ShimConfig,
    ShimContractChecker, TargetResolver, UsageIndex, CONFIG_FILE, LOCK_FILE,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Project root plus the configuration loaded from it
pub struct Project {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: ShimConfig,
}

impl Project {
    /// Load `config` (relative paths are taken from `root`)
    pub fn open(root: &Path, config: &Path) -> Result<Self> {
        let config_path = if config.is_absolute() {
            config.to_path_buf()
        } else {
            root.join(config)
        };
        let config = ShimConfig::from_file(&config_path)?;

        Ok(Self {
            root: root.to_path_buf(),
            config_path,
            config,
        })
    }

    fn config_name(&self) -> String {
        self.config_path
            .strip_prefix(&self.root)
            .unwrap_or(&self.config_path)
            .display()
            .to_string()
    }

    /// Build the alias table, reporting duplicates as warnings and failing
    /// on anything fatal
    pub fn table(&self, engine: &mut DiagnosticEngine) -> Result<AliasTable> {
        let name = self.config_name();
        match self.config.build_table() {
            Ok(table) => {
                for warning in table.warnings() {
                    engine.emit(warning.to_diagnostic(&name));
                }
                Ok(table)
            }
            Err(invalid) => {
                for err in &invalid.errors {
                    engine.emit(err.to_diagnostic(&name));
                }
                Err(invalid).with_context(|| format!("Failed to load {}", name))
            }
        }
    }

    fn source_of(&self, file: &str) -> Option<String> {
        fs::read_to_string(self.root.join(file)).ok()
    }

    /// Print collected diagnostics with source snippets where available
    pub fn report(&self, engine: &DiagnosticEngine) {
        engine.print_all(|file| self.source_of(file));
        engine.print_summary();
    }
}

/// Targets named on the command line, or every configured platform
fn selected_targets(config: &ShimConfig, target: Option<&str>) -> Result<Vec<BuildTarget>> {
    match target {
        Some(name) => Ok(vec![name.parse()?]),
        None => Ok(config.supported_targets()?),
    }
}

/// Write a default shimlink.json
pub fn init(path: Option<PathBuf>) -> Result<PathBuf> {
    let project_path = path.unwrap_or_else(|| PathBuf::from("."));

    let config_path = project_path.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{} already exists in {}", CONFIG_FILE, project_path.display());
    }

    let project_name = project_path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .unwrap_or_else(|| "app".to_string());

    let config = ShimConfig {
        name: project_name,
        ..ShimConfig::default()
    };
    config.to_file(&config_path)?;

    println!("✅ Initialized {} in {}", CONFIG_FILE, project_path.display());

    Ok(config_path)
}

/// Print the alias table
pub fn list(project: &Project, target: Option<&str>) -> Result<()> {
    let mut engine = DiagnosticEngine::new();
    let table = project.table(&mut engine);
    project.report(&engine);
    let table = table?;

    let targets = selected_targets(&project.config, target)?;
    let rows: Vec<_> = table.iter().filter(|(_, t, _)| targets.contains(t)).collect();

    if rows.is_empty() {
        println!("No aliases found.");
        return Ok(());
    }

    println!("📦 Aliases ({}):", project.config.name);
    println!();
    for (id, target, alias) in &rows {
        println!("  {:<15} {} -> {}", target.long_name(), id, alias);
    }
    println!();
    println!("Total: {} entries", rows.len());

    Ok(())
}

/// Print what each id resolves to, or the file it loads with `show_path`
pub fn resolve(project: &Project, ids: &[String], target: &str, show_path: bool) -> Result<Vec<String>> {
    let target: BuildTarget = target.parse()?;
    let mut engine = DiagnosticEngine::new();
    let table = project.table(&mut engine);
    project.report(&engine);

    let resolver = TargetResolver::new(table?);
    let loader = project.config.loader(&project.root);
    let mut resolved = Vec::with_capacity(ids.len());

    for id in ids {
        let line = if show_path {
            resolver
                .resolve_path(id, target, &loader)
                .with_context(|| format!("Failed to resolve {} for {}", id, target))?
                .display()
                .to_string()
        } else {
            resolver.resolve(id, target).to_string()
        };
        println!("{}", line);
        resolved.push(line);
    }

    Ok(resolved)
}

/// Options for `shimlink check`
#[derive(Debug, Default, Clone)]
pub struct CheckOptions {
    pub target: Option<String>,
    pub strict: bool,
    pub json: bool,
    pub locked: bool,
}

/// Run the shim contract checker; `Ok(false)` means the check failed
pub fn check(project: &Project, options: &CheckOptions) -> Result<bool> {
    let mut engine = DiagnosticEngine::new();
    let table = match project.table(&mut engine) {
        Ok(table) => table,
        Err(e) => {
            emit_report(project, &engine, options.json)?;
            return Err(e);
        }
    };

    let policy = if options.strict {
        CheckPolicy::Strict
    } else {
        project.config.policy()
    };
    let targets = selected_targets(&project.config, options.target.as_deref())?;
    let loader = project.config.loader(&project.root);
    let usage = UsageIndex::scan(
        &project.root,
        &project.config.checker.app_roots,
        &project.config.source_exts,
    )?;
    log::info!("scanned {} application files", usage.files_scanned());

    let mut passed = true;
    let mut checked = 0;

    for target in targets {
        log::debug!("checking {} substitutes", target.long_name());
        let checker = ShimContractChecker::new(&loader, target).with_usage(&usage);
        let result = checker.verify_table(&table);

        for report in &result.reports {
            report.emit_diagnostics(&mut engine, policy);
            checked += 1;
        }
        for (_, err) in &result.failures {
            engine.emit(err.to_diagnostic());
        }
        passed &= result.passes(policy);
    }

    if options.locked {
        passed &= check_lock(project, &table, &loader, &mut engine)?;
    }

    emit_report(project, &engine, options.json)?;
    if !options.json {
        if passed {
            println!("✅ {} shim(s) checked", checked);
        } else {
            eprintln!("❌ shim check failed");
        }
    }

    Ok(passed)
}

fn check_lock(
    project: &Project,
    table: &AliasTable,
    loader: &dyn ModuleLoader,
    engine: &mut DiagnosticEngine,
) -> Result<bool> {
    let lock_span = Span::new(LOCK_FILE.to_string(), 0, 0, 0);

    if !LockFile::exists(&project.root) {
        engine.emit(
            Diagnostic::error(
                error_codes::LOCK_STALE,
                format!("{} not found", LOCK_FILE),
                lock_span,
            )
            .with_help("run `shimlink lock` to create it".to_string()),
        );
        return Ok(false);
    }

    let lockfile = LockFile::from_file(project.root.join(LOCK_FILE))?;
    let issues = lockfile.validate(table, loader);
    for issue in &issues {
        let code = match issue {
            LockIssue::IntegrityMismatch { .. } => error_codes::LOCK_INTEGRITY,
            _ => error_codes::LOCK_STALE,
        };
        engine.emit(Diagnostic::error(code, issue.to_string(), lock_span.clone()));
    }

    Ok(issues.is_empty())
}

fn emit_report(project: &Project, engine: &DiagnosticEngine, json: bool) -> Result<()> {
    if json {
        println!("{}", engine.to_json().context("Failed to serialize diagnostics")?);
    } else {
        project.report(engine);
    }
    Ok(())
}

/// Regenerate shimlink.lock
pub fn lock(project: &Project) -> Result<PathBuf> {
    let mut engine = DiagnosticEngine::new();
    let table = project.table(&mut engine);
    project.report(&engine);

    let loader = project.config.loader(&project.root);
    let lockfile = LockFile::generate(&table?, &loader)?;

    let path = project.root.join(LOCK_FILE);
    lockfile.to_file(&path)?;

    println!("✅ Locked {} shim(s) in {}", lockfile.aliases.len(), LOCK_FILE);

    Ok(path)
}

/// Report drift between two configurations; never fails on drift itself
pub fn diff(left: &Path, right: &Path, json: bool) -> Result<usize> {
    let load = |path: &Path| -> Result<AliasTable> {
        let config = ShimConfig::from_file(path)?;
        config
            .build_table()
            .with_context(|| format!("Failed to load {}", path.display()))
    };
    let drift = diff_tables(&load(left)?, &load(right)?);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&drift).context("Failed to serialize drift report")?
        );
        return Ok(drift.len());
    }

    if drift.is_empty() {
        println!("✅ {} and {} alias the same modules", left.display(), right.display());
        return Ok(0);
    }

    let mut engine = DiagnosticEngine::new();
    let (left_name, right_name) = (left.display().to_string(), right.display().to_string());
    for entry in &drift {
        engine.emit(entry.to_diagnostic(&left_name, &right_name));
    }
    engine.print_all(|_| None);
    engine.print_summary();

    Ok(drift.len())
}
