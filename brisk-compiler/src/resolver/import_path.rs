/**
 * Import Paths
 * Grammar of import strings and their resolution against the importing module
 *
 *   import := prefix (ident "/")* ident
 *   prefix := "@" ident "/" | "/" | ("../")+ | "./" | <nothing>
 */
use super::module_path::{is_valid_identifier_component, ModulePath};
use std::fmt;
use thiserror::Error;

/// How an import path navigates from the importing module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPrefix {
    /// `@pkg/...`, crosses into another package
    ExternalPackage(String),
    /// `/...`, from the root of the current package
    AbsoluteInPackage,
    /// `../../...`, number of directories to ascend
    RelativeUp(usize),
    /// `./...` or no prefix
    RelativeHere,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub prefix: ImportPrefix,
    pub dirs: Vec<String>,
    pub file: String,
}

impl fmt::Display for ParsedImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            ImportPrefix::ExternalPackage(package) => write!(f, "@{}/", package)?,
            ImportPrefix::AbsoluteInPackage => write!(f, "/")?,
            ImportPrefix::RelativeUp(levels) => write!(f, "{}", "../".repeat(*levels))?,
            ImportPrefix::RelativeHere => write!(f, "./")?,
        }
        for dir in &self.dirs {
            write!(f, "{}/", dir)?;
        }
        write!(f, "{}", self.file)
    }
}

/// Malformed import path; `column` is 1-based
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (column {column})")]
pub struct ImportPathError {
    pub message: String,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("'{import}' ascends {levels} level{} from '{current}', outside the source root", if .levels.eq(&1) { "" } else { "s" })]
    AscendsOutsideSourceRoot {
        import: String,
        levels: usize,
        current: ModulePath,
    },
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn column(&self) -> usize {
        self.pos + 1
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let matches = s
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c));
        if matches {
            self.pos += s.chars().count();
        }
        matches
    }

    fn error(&self, message: String) -> ImportPathError {
        ImportPathError {
            message,
            column: self.column(),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, ImportPathError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }

        if start == self.pos {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected {}, found '{}'", what, c)),
                None => self.error(format!("expected {}", what)),
            });
        }

        let ident: String = self.chars[start..self.pos].iter().collect();
        if !is_valid_identifier_component(&ident) {
            return Err(ImportPathError {
                message: format!("'{}' is not a valid {}", ident, what),
                column: start + 1,
            });
        }
        Ok(ident)
    }
}

/// Parse an import string; the whole input must match the grammar
pub fn parse_import_path(text: &str) -> Result<ParsedImport, ImportPathError> {
    let mut cursor = Cursor::new(text);

    let prefix = if cursor.eat('@') {
        let package = cursor.identifier("package name")?;
        if !cursor.eat('/') {
            return Err(cursor.error("expected '/' after package name".to_string()));
        }
        ImportPrefix::ExternalPackage(package)
    } else if cursor.eat('/') {
        ImportPrefix::AbsoluteInPackage
    } else if cursor.eat_str("../") {
        let mut levels = 1;
        while cursor.eat_str("../") {
            levels += 1;
        }
        ImportPrefix::RelativeUp(levels)
    } else {
        cursor.eat_str("./");
        ImportPrefix::RelativeHere
    };

    let mut dirs = Vec::new();
    let file = loop {
        let segment = cursor.identifier("identifier")?;
        if cursor.eat('/') {
            dirs.push(segment);
        } else {
            break segment;
        }
    };

    if let Some(c) = cursor.peek() {
        return Err(cursor.error(format!("unexpected character '{}'", c)));
    }

    Ok(ParsedImport { prefix, dirs, file })
}

/// Resolve a parsed import against the module containing the import
pub fn resolve_against_current(
    current: &ModulePath,
    parsed: &ParsedImport,
) -> Result<ModulePath, ResolveError> {
    let (package, mut dirs) = match &parsed.prefix {
        ImportPrefix::ExternalPackage(package) => (Some(package.clone()), Vec::new()),
        ImportPrefix::AbsoluteInPackage => (current.package.clone(), Vec::new()),
        ImportPrefix::RelativeUp(levels) => {
            if *levels > current.dirs.len() {
                return Err(ResolveError::AscendsOutsideSourceRoot {
                    import: parsed.to_string(),
                    levels: *levels,
                    current: current.clone(),
                });
            }
            let keep = current.dirs.len() - levels;
            (
                current.package.clone(),
                current.dirs.iter().take(keep).cloned().collect(),
            )
        }
        ImportPrefix::RelativeHere => (current.package.clone(), current.dirs.clone()),
    };

    dirs.extend(parsed.dirs.iter().cloned());

    Ok(ModulePath {
        package,
        dirs,
        file: parsed.file.clone(),
    })
}

/// Parse and resolve in one step
pub fn resolve_import(current: &ModulePath, text: &str) -> Result<ModulePath, ImportTargetError> {
    let parsed = parse_import_path(text)?;
    Ok(resolve_against_current(current, &parsed)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportTargetError {
    #[error(transparent)]
    Syntax(#[from] ImportPathError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
