// Diagnostics for alias configuration, module loading and shim conformance
// Rust-style rendering with spans, colors and "did you mean" suggestions

use colored::Colorize;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Location in a source or configuration file. `line == 0` means the
/// whole file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize, // Length of the highlighted span
}

impl Span {
    pub fn new(file: String, line: usize, column: usize, length: usize) -> Self {
        Self {
            file,
            line,
            column,
            length,
        }
    }

    /// Convert a byte range in `source` to a line/column span
    pub fn from_file_and_span(file: &str, source: &str, span: std::ops::Range<usize>) -> Self {
        let before = source.get(..span.start).unwrap_or(source);
        let line = before.chars().filter(|&c| c == '\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count() + 1, |pos| {
                before.get(pos + 1..).map_or(1, |l| l.chars().count() + 1)
            });
        let length = span.end.saturating_sub(span.start).max(1);

        Self {
            file: file.to_string(),
            line,
            column,
            length,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    /// Span naming a whole file (no line information)
    pub fn from_path(path: &Path) -> Self {
        Self {
            file: path.display().to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
    Note,
    Help,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorLevel::Error => write!(f, "{}", "error".red().bold()),
            ErrorLevel::Warning => write!(f, "{}", "warning".yellow().bold()),
            ErrorLevel::Info => write!(f, "{}", "info".blue().bold()),
            ErrorLevel::Note => write!(f, "{}", "note".cyan().bold()),
            ErrorLevel::Help => write!(f, "{}", "help".green().bold()),
        }
    }
}

/// One reportable problem
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub code: String, // e.g., "S0001" for a symbol missing from a shim
    pub message: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Related>,
}

/// Replacement text offered for a span
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub message: String,
    pub replacement: String,
    pub span: Span,
}

/// Secondary location, e.g. the shim a violation was found in
#[derive(Debug, Clone, Serialize)]
pub struct Related {
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: ErrorLevel, code: &str, message: String, span: Span) -> Self {
        Self {
            level,
            code: code.to_string(),
            message,
            span,
            notes: Vec::new(),
            help: None,
            suggestion: None,
            related: Vec::new(),
        }
    }

    pub fn error(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Error, code, message, span)
    }

    pub fn warning(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Warning, code, message, span)
    }

    pub fn info(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Info, code, message, span)
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn with_suggestion(mut self, message: String, replacement: String, span: Span) -> Self {
        self.suggestion = Some(Suggestion {
            message,
            replacement,
            span,
        });
        self
    }

    pub fn with_related(mut self, span: Span, message: String) -> Self {
        self.related.push(Related { span, message });
        self
    }

    /// Render with a source snippet taken from `source_code`
    pub fn format(&self, source_code: &str) -> String {
        let mut output = self.format_header();

        if let Some(snippet) = self.get_source_snippet(source_code) {
            output.push_str(&snippet);
        }

        self.format_trailer(&mut output);

        if let Some(suggestion) = &self.suggestion {
            output.push_str(&format!(
                " {} {}\n",
                "help:".green().bold(),
                suggestion.message
            ));
            if let Some(suggested_snippet) = self.get_suggestion_snippet(source_code) {
                output.push_str(&suggested_snippet);
            }
        }

        output
    }

    fn format_simple(&self) -> String {
        let mut output = self.format_header();
        self.format_trailer(&mut output);
        output
    }

    fn format_header(&self) -> String {
        let mut output = String::new();

        // Header: error[S0001]: message
        output.push_str(&format!(
            "{}[{}]: {}\n",
            self.level,
            self.code,
            self.message.bold()
        ));

        // Location: --> app/map.tsx:12:15
        output.push_str(&format!(" {} {}\n", "-->".cyan().bold(), self.span));
        output
    }

    fn format_trailer(&self, output: &mut String) {
        for related in &self.related {
            output.push_str(&format!(
                " {} {}: {}\n",
                "::".cyan().bold(),
                related.span,
                related.message
            ));
        }

        for note in &self.notes {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), note.cyan()));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }
    }

    /// Offending source line with a `^^^` marker under the span
    fn get_source_snippet(&self, source_code: &str) -> Option<String> {
        if self.span.line == 0 {
            return None;
        }
        let line = source_code.lines().nth(self.span.line - 1)?;

        let mut snippet = String::new();

        let line_num_width = self.span.line.to_string().len().max(2);

        snippet.push_str(&format!(" {}\n", " ".repeat(line_num_width + 1).cyan()));

        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", self.span.line, width = line_num_width)
                .cyan()
                .bold(),
            "|".cyan().bold(),
            line
        ));

        // Error indicator (^^^)
        let padding = " ".repeat(self.span.column.saturating_sub(1));
        let underline = "^".repeat(self.span.length.max(1));
        snippet.push_str(&format!(
            " {} {} {}{}\n",
            " ".repeat(line_num_width),
            "|".cyan().bold(),
            padding,
            underline.red().bold()
        ));

        Some(snippet)
    }

    /// The span's line with the suggestion applied
    fn get_suggestion_snippet(&self, source_code: &str) -> Option<String> {
        let suggestion = self.suggestion.as_ref()?;
        if suggestion.span.line == 0 {
            return None;
        }
        let line = source_code.lines().nth(suggestion.span.line - 1)?;

        let line_num_width = suggestion.span.line.to_string().len().max(2);

        let col = suggestion.span.column.saturating_sub(1);
        let before: String = line.chars().take(col).collect();
        let after: String = line.chars().skip(col + suggestion.span.length).collect();
        let modified_line = format!("{}{}{}", before, suggestion.replacement, after);

        let mut snippet = String::new();
        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", suggestion.span.line, width = line_num_width)
                .cyan()
                .bold(),
            "|".cyan().bold(),
            modified_line
        ));

        // `+` under the inserted text
        let padding = " ".repeat(col);
        let indicator = "+".repeat(suggestion.replacement.chars().count());
        snippet.push_str(&format!(
            " {} {} {}{}\n",
            " ".repeat(line_num_width),
            "|".cyan().bold(),
            padding,
            indicator.green().bold()
        ));

        Some(snippet)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

#[derive(Serialize)]
struct DiagnosticsDocument<'a> {
    diagnostics: &'a [Diagnostic],
    summary: Summary,
}

#[derive(Serialize)]
struct Summary {
    errors: usize,
    warnings: usize,
    infos: usize,
}

/// Collects diagnostics for one command run and renders them at the end
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            ErrorLevel::Error => self.error_count += 1,
            ErrorLevel::Warning => self.warning_count += 1,
            ErrorLevel::Info => self.info_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn emit_error(&mut self, code: &str, message: String, span: Span) {
        self.emit(Diagnostic::error(code, message, span));
    }

    pub fn emit_warning(&mut self, code: &str, message: String, span: Span) {
        self.emit(Diagnostic::warning(code, message, span));
    }

    pub fn emit_info(&mut self, code: &str, message: String, span: Span) {
        self.emit(Diagnostic::info(code, message, span));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn info_count(&self) -> usize {
        self.info_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr; `source_for` supplies the text of
    /// the file a diagnostic points into, when available
    pub fn print_all<F>(&self, mut source_for: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for diag in &self.diagnostics {
            match source_for(&diag.span.file) {
                Some(source) => eprintln!("{}", diag.format(&source)),
                None => eprintln!("{}", diag),
            }
        }
    }

    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "\n{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }

        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }

        if self.info_count > 0 {
            eprintln!(
                "{}: {} info message{} emitted",
                "info".blue().bold(),
                self.info_count,
                if self.info_count == 1 { "" } else { "s" }
            );
        }
    }

    /// Export diagnostics as JSON for editors and CI
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&DiagnosticsDocument {
            diagnostics: &self.diagnostics,
            summary: Summary {
                errors: self.error_count,
                warnings: self.warning_count,
                infos: self.info_count,
            },
        })
    }

    /// Clear all diagnostics
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
        self.info_count = 0;
    }
}

/// Shorthands for the diagnostics `check` and config loading emit most
impl DiagnosticEngine {
    /// A symbol used by the application is missing from a shim
    pub fn missing_symbol(
        &mut self,
        level: ErrorLevel,
        module: &str,
        shim: &str,
        symbol: &str,
        span: Span,
        suggestions: &[String],
    ) {
        let mut diag = Diagnostic::new(
            level,
            error_codes::MISSING_SYMBOL,
            format!("shim `{}` does not export `{}`", shim, symbol),
            span.clone(),
        )
        .with_note(format!("`{}` is imported from `{}` here", symbol, module));

        if let Some(best) = suggestions.first() {
            diag = diag
                .with_help(format!("did you mean `{}`?", suggestions.join("`, `")))
                .with_suggestion(
                    format!("the shim exports `{}`", best),
                    best.clone(),
                    span,
                );
        }

        self.emit(diag);
    }

    /// A shim exports a symbol whose shape disagrees with the real module
    pub fn shape_mismatch(
        &mut self,
        level: ErrorLevel,
        shim: &str,
        symbol: &str,
        expected: &str,
        found: &str,
        span: Span,
    ) {
        self.emit(
            Diagnostic::new(
                level,
                error_codes::SHAPE_MISMATCH,
                format!("shim `{}` exports `{}` with a different shape", shim, symbol),
                span,
            )
            .with_note(format!("expected {}, found {}", expected, found)),
        );
    }

    /// The same (module, target) pair was aliased twice
    pub fn duplicate_alias(&mut self, module: &str, target: &str, previous: &str, current: &str, span: Span) {
        self.emit(
            Diagnostic::warning(
                error_codes::DUPLICATE_ALIAS,
                format!("`{}` is aliased twice for target `{}`", module, target),
                span,
            )
            .with_note(format!("`{}` replaces `{}`", current, previous))
            .with_help("remove one of the entries; the last one wins".to_string()),
        );
    }
}

/// Common error codes
pub mod error_codes {
    // Configuration (C0001-C0099)
    pub const DUPLICATE_ALIAS: &str = "C0001";
    pub const INCOMPLETE_ALIAS: &str = "C0002";
    pub const UNKNOWN_TARGET: &str = "C0003";
    pub const INVALID_ENTRY: &str = "C0004";
    pub const CONFIG_PARSE: &str = "C0005";

    // Module loading (L0001-L0099)
    pub const MODULE_NOT_FOUND: &str = "L0001";
    pub const MODULE_READ: &str = "L0002";
    pub const INVALID_PACKAGE: &str = "L0003";

    // Shim conformance (S0001-S0099)
    pub const MISSING_SYMBOL: &str = "S0001";
    pub const SHAPE_MISMATCH: &str = "S0002";

    // Lock file (K0001-K0099)
    pub const LOCK_INTEGRITY: &str = "K0001";
    pub const LOCK_STALE: &str = "K0002";

    // Configuration drift (D0001-D0099)
    pub const DRIFT_ONLY_LEFT: &str = "D0001";
    pub const DRIFT_ONLY_RIGHT: &str = "D0002";
    pub const DRIFT_CHANGED: &str = "D0003";
}

/// "did you mean" support for misspelled export names
pub mod fuzzy {
    use strsim::jaro_winkler;

    /// Candidates whose Jaro-Winkler similarity to `target` exceeds
    /// `threshold`, best first, at most `max_suggestions` of them
    pub fn find_similar_names(
        target: &str,
        candidates: &[String],
        threshold: f64,
        max_suggestions: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .map(|candidate| {
                let similarity = jaro_winkler(target, candidate);
                (candidate.clone(), similarity)
            })
            .filter(|(_, score)| *score > threshold)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(max_suggestions)
            .map(|(name, _)| name)
            .collect()
    }

    /// Suggestions for an export name missing from a shim
    pub fn find_similar_exports(target: &str, candidates: &[String]) -> Vec<String> {
        find_similar_names(target, candidates, 0.8, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let source = "import MapView, { Markr } from 'react-native-maps';\n";

        let span = Span::new("app/map.tsx".to_string(), 1, 19, 5);
        let diag = Diagnostic::error(
            error_codes::MISSING_SYMBOL,
            "shim `./web-stubs/maps.js` does not export `Markr`".to_string(),
            span.clone(),
        )
        .with_note("`Markr` is imported from `react-native-maps` here".to_string())
        .with_suggestion("the shim exports `Marker`".to_string(), "Marker".to_string(), span);

        let formatted = diag.format(source);

        assert!(formatted.contains("S0001"));
        assert!(formatted.contains("does not export"));
        assert!(formatted.contains("app/map.tsx:1:19"));
        assert!(formatted.contains("{ Marker }"));
    }

    #[test]
    fn test_span_from_byte_range() {
        let source = "import a from 'a';\nimport { Marker } from 'm';";
        let start = source.find("Marker").unwrap();
        let span = Span::from_file_and_span("x.js", source, start..start + 6);

        assert_eq!(span.line, 2);
        assert_eq!(span.column, 10);
        assert_eq!(span.length, 6);
    }

    #[test]
    fn test_engine_counts_levels() {
        let mut engine = DiagnosticEngine::new();
        engine.duplicate_alias("maps", "web", "./a.js", "./b.js", Span::unknown());
        engine.shape_mismatch(ErrorLevel::Error, "./a.js", "Marker", "function", "constant", Span::unknown());

        assert_eq!(engine.warning_count(), 1);
        assert_eq!(engine.error_count(), 1);
        assert!(engine.has_errors());

        engine.clear();
        assert!(!engine.has_diagnostics());
    }

    #[test]
    fn test_missing_symbol_suggests_closest_export() {
        let mut engine = DiagnosticEngine::new();
        let span = Span::new("app/map.tsx".to_string(), 1, 10, 5);
        engine.missing_symbol(
            ErrorLevel::Warning,
            "react-native-maps",
            "./web-stubs/maps.js",
            "Markr",
            span,
            &["Marker".to_string()],
        );

        let diag = &engine.diagnostics()[0];
        assert_eq!(diag.level, ErrorLevel::Warning);
        assert_eq!(diag.code, error_codes::MISSING_SYMBOL);
        assert_eq!(diag.suggestion.as_ref().unwrap().replacement, "Marker");
        assert_eq!(engine.warning_count(), 1);
    }

    #[test]
    fn test_fuzzy_suggestions() {
        let candidates = vec![
            "MapView".to_string(),
            "Marker".to_string(),
            "PROVIDER_GOOGLE".to_string(),
        ];
        assert_eq!(fuzzy::find_similar_exports("Markr", &candidates), vec!["Marker"]);
        assert!(fuzzy::find_similar_exports("Heatmap", &candidates).is_empty());
    }
}
