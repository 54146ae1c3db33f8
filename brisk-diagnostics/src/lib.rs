// Diagnostics for the Brisk compiler
// Structured errors with spans, notes and help, rendered as colored text or JSON

use colored::Colorize;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Source code location (line, column, file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize, // Length of the error span
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

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    /// Create span from file path
    pub fn from_path(path: &Path) -> Self {
        Self {
            file: path.display().to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    /// Same file, different position
    pub fn at(&self, line: usize, column: usize, length: usize) -> Self {
        Self {
            file: self.file.clone(),
            line,
            column,
            length,
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

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    Warning,
    Note,
    Help,
}

impl ErrorLevel {
    fn label(&self) -> &'static str {
        match self {
            ErrorLevel::Error => "error",
            ErrorLevel::Warning => "warning",
            ErrorLevel::Note => "note",
            ErrorLevel::Help => "help",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorLevel::Error => write!(f, "{}", self.label().red().bold()),
            ErrorLevel::Warning => write!(f, "{}", self.label().yellow().bold()),
            ErrorLevel::Note => write!(f, "{}", self.label().cyan().bold()),
            ErrorLevel::Help => write!(f, "{}", self.label().green().bold()),
        }
    }
}

/// Structured diagnostic message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub code: String, // e.g. "E0701" for a cyclic import
    pub message: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
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
        }
    }

    pub fn error(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Error, code, message, span)
    }

    pub fn warning(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Warning, code, message, span)
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == ErrorLevel::Error
    }

    /// Format diagnostic in Rust-style, with the offending source line if available
    pub fn format(&self, source_code: &str) -> String {
        let mut output = self.header();

        if let Some(snippet) = self.get_source_snippet(source_code) {
            output.push_str(&snippet);
        }

        output.push_str(&self.trailer());
        output
    }

    // error[E0701]: message
    //  --> file.brk:12:15
    fn header(&self) -> String {
        let mut output = format!("{}[{}]: {}\n", self.level, self.code, self.message.bold());
        output.push_str(&format!(" {} {}\n", "-->".cyan().bold(), self.span));
        output
    }

    fn trailer(&self) -> String {
        let mut output = String::new();
        for note in &self.notes {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), note.cyan()));
        }
        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }
        output
    }

    /// Extract source code snippet with error highlight
    fn get_source_snippet(&self, source_code: &str) -> Option<String> {
        let line = source_code.lines().nth(self.span.line.checked_sub(1)?)?;

        let mut snippet = String::new();

        // Line number with padding
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
        let padding = " ".repeat(line_num_width + 3 + self.span.column.saturating_sub(1));
        let underline = "^".repeat(self.span.length.max(1));
        snippet.push_str(&format!(
            " {} {}{}\n",
            " ".repeat(line_num_width + 1).cyan(),
            padding,
            underline.red().bold()
        ));

        Some(snippet)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.header(), self.trailer())
    }
}

/// Diagnostic collection and reporting engine
#[derive(Debug, Default, Clone)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    diagnostics: &'a [Diagnostic],
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            ErrorLevel::Error => self.error_count += 1,
            ErrorLevel::Warning => self.warning_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn emit_error(&mut self, code: &str, message: String, span: Span) {
        self.emit(Diagnostic::error(code, message, span));
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Print all diagnostics to stderr; `source_of` supplies file contents for snippets
    pub fn print_all(&self, source_of: impl Fn(&str) -> Option<String>) {
        for diag in &self.diagnostics {
            match source_of(&diag.span.file) {
                Some(source) => eprintln!("{}", diag.format(&source)),
                None => eprintln!("{}", diag),
            }
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "{}: {} error{} emitted",
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
    }

    /// Export diagnostics as JSON for IDEs
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&JsonReport {
            diagnostics: &self.diagnostics,
        })
    }

    /// Clear all diagnostics
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }
}

/// Error codes of the module system
pub mod error_codes {
    // Import path and module name errors (E0600-E0699)
    pub const MALFORMED_IMPORT_PATH: &str = "E0601";
    pub const OUTSIDE_SOURCE_ROOT: &str = "E0602";
    pub const INVALID_MODULE_NAME: &str = "E0603";
    pub const MODULE_NOT_FOUND: &str = "E0604";
    pub const UNREADABLE_SOURCE: &str = "E0605";
    pub const FRONTEND_ERROR: &str = "E0606";

    // Import graph errors (E0700-E0799)
    pub const CYCLIC_IMPORT: &str = "E0701";
    pub const MULTIPLE_IMPORT: &str = "E0702";
    pub const ILLEGAL_WHITEBOX_IMPORT: &str = "E0703";
    pub const CANNOT_COMPILE_IMPORT: &str = "E0704";
    pub const PROGRAM_IMPORT: &str = "E0705";
    pub const ILLEGAL_IMPORT_OF_INTERNAL: &str = "E0706";

    // Export inference errors (E0800-E0899)
    pub const NAME_LESS_ACCESSIBLE: &str = "E0801";
    pub const IMPLICIT_NAME_LESS_ACCESSIBLE: &str = "E0802";
    pub const INTERNAL_MODULE_REQUIRED: &str = "E0803";
    pub const IMPORT_INTERNAL_REQUIRED: &str = "E0804";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_diagnostic_format() {
        plain();
        let source = "module exposes f\nimport m \"../x\"\n";

        let span = Span::new("a.brk".to_string(), 2, 10, 6);
        let diag = Diagnostic::error(
            error_codes::OUTSIDE_SOURCE_ROOT,
            "import ascends outside the source root".to_string(),
            span,
        )
        .with_note("importing module: a".to_string())
        .with_help("move the imported module below the source root".to_string());

        let formatted = diag.format(source);

        assert!(formatted.contains("error[E0602]"));
        assert!(formatted.contains("a.brk:2:10"));
        assert!(formatted.contains("import m \"../x\""));
        assert!(formatted.contains("^^^^^^"));
        assert!(formatted.contains("importing module: a"));
    }

    #[test]
    fn test_format_without_position_skips_snippet() {
        plain();
        let diag = Diagnostic::error(
            error_codes::MODULE_NOT_FOUND,
            "module not found".to_string(),
            Span::from_path(Path::new("lib/a.brk")),
        );
        let formatted = diag.format("anything");
        assert!(formatted.contains(" --> lib/a.brk\n"));
        assert!(!formatted.contains("^"));
    }

    #[test]
    fn test_engine_counts_and_json() {
        let mut engine = DiagnosticEngine::new();
        engine.emit_error(
            error_codes::CYCLIC_IMPORT,
            "cyclic import of \"b\"".to_string(),
            Span::new("a.brk".to_string(), 1, 1, 3),
        );
        engine.emit(Diagnostic::warning(
            "W0001",
            "unused import".to_string(),
            Span::unknown(),
        ));

        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);

        let json: serde_json::Value = serde_json::from_str(&engine.to_json().unwrap()).unwrap();
        let first = &json["diagnostics"][0];
        assert_eq!(first["level"], "error");
        assert_eq!(first["code"], "E0701");
        assert_eq!(first["message"], "cyclic import of \"b\"");
        assert_eq!(first["span"]["line"], 1);
        assert!(first.get("help").is_none());

        engine.clear();
        assert!(!engine.has_errors());
        assert!(engine.diagnostics().is_empty());
    }
}
