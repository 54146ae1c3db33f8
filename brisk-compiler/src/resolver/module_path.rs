/**
 * Module Paths
 * Structured identity of a compilation unit: package, directories, file name
 */
use super::import_path::{parse_import_path, ImportPathError, ImportPrefix};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Syntactically an identifier, but never accepted as a module path segment
pub const RESERVED_WORD: &str = "brisk";

/// Source file suffixes
pub const IMPLEMENTATION_EXT: &str = "brk";
pub const INTERFACE_EXT: &str = "brh";

/// Generated output suffixes
pub const C_SOURCE_EXT: &str = "c";
pub const C_HEADER_EXT: &str = "h";

const IDENTIFIER_PATTERN: &str = r"^_*[A-Za-z]+[_A-Za-z0-9]*$";

static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();

/// Check a single path or module name component against the identifier grammar
///
/// # Example
/// ```
/// # use brisk_compiler::resolver::is_valid_identifier_component;
/// assert!(is_valid_identifier_component("my_file"));
/// assert!(!is_valid_identifier_component("my-file"));
/// assert!(!is_valid_identifier_component("brisk"));
/// ```
pub fn is_valid_identifier_component(component: &str) -> bool {
    let identifier = IDENTIFIER.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).ok());
    component != RESERVED_WORD && identifier.as_ref().is_some_and(|re| re.is_match(component))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleNameError {
    #[error("file '{}' is not below the source root '{}'", .file.display(), .root.display())]
    NotUnderSourceRoot { file: PathBuf, root: PathBuf },

    #[error("'{}' is not a .brk or .brh source file", .0.display())]
    NotASourceFile(PathBuf),

    #[error("invalid module name component{}: {}", if .0.len() == 1 { "" } else { "s" }, .0.join(", "))]
    InvalidComponents(Vec<String>),

    #[error("malformed module path: {0}")]
    Malformed(#[from] ImportPathError),

    #[error("module path '{0}' must have the form dir/file or @package/dir/file")]
    Relative(String),
}

/// Identity of a compilation unit, used as the cache key across the module graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    pub package: Option<String>,
    pub dirs: Vec<String>,
    pub file: String,
}

impl ModulePath {
    pub fn new(package: Option<&str>, dirs: &[&str], file: &str) -> Self {
        Self {
            package: package.map(str::to_string),
            dirs: dirs.iter().map(|d| d.to_string()).collect(),
            file: file.to_string(),
        }
    }

    /// Same module seen from inside its own package
    pub fn without_package(&self) -> Self {
        Self {
            package: None,
            dirs: self.dirs.clone(),
            file: self.file.clone(),
        }
    }

    pub fn is_in_package(&self, package: Option<&str>) -> bool {
        self.package.as_deref() == package
    }

    /// Package, directories and file name in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.package
            .iter()
            .chain(self.dirs.iter())
            .chain(std::iter::once(&self.file))
            .map(String::as_str)
    }

    /// `pkg/dir/file.ext`, joined with the platform separator
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension(extension);
        path
    }

    /// Implementation files live in the compiling package, never below a package directory
    pub fn implementation_file_name(&self) -> PathBuf {
        self.without_package().relative_path(IMPLEMENTATION_EXT)
    }

    pub fn interface_file_name(&self) -> PathBuf {
        self.relative_path(INTERFACE_EXT)
    }

    pub fn c_file_name(&self) -> PathBuf {
        self.relative_path(C_SOURCE_EXT)
    }

    pub fn h_file_name(&self) -> PathBuf {
        self.relative_path(C_HEADER_EXT)
    }

    /// Identifier-safe prefix for generated C symbols
    pub fn c_name(&self) -> String {
        self.segments().collect::<Vec<_>>().join("_")
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(package) = &self.package {
            write!(f, "@{}/", package)?;
        }
        for dir in &self.dirs {
            write!(f, "{}/", dir)?;
        }
        write!(f, "{}", self.file)
    }
}

/// Parses the display form: `dir/file` or `@pkg/dir/file`
impl FromStr for ModulePath {
    type Err = ModuleNameError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parsed = parse_import_path(text)?;
        let package = match parsed.prefix {
            ImportPrefix::ExternalPackage(package) => Some(package),
            ImportPrefix::RelativeHere if !text.starts_with("./") => None,
            _ => return Err(ModuleNameError::Relative(text.to_string())),
        };
        Ok(Self {
            package,
            dirs: parsed.dirs,
            file: parsed.file,
        })
    }
}

/// Path relative to `root`, ignoring `.` components
///
/// Falls back to the canonical forms of both paths when they are spelled
/// differently (one absolute and one relative, or through `..`).
fn relative_to_root(file: &Path, root: &Path) -> Option<PathBuf> {
    let lexical = |path: &Path| -> PathBuf {
        path.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    let file_lexical = lexical(file);
    if let Ok(relative) = file_lexical.strip_prefix(lexical(root)) {
        if !relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return Some(relative.to_path_buf());
        }
    }

    let file = fs::canonicalize(file).ok()?;
    let root = fs::canonicalize(root).ok()?;
    file.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// Derive the module path of a source file below `source_root`
///
/// Only `.brk` and `.brh` files name modules. Every directory and file
/// component is validated; on failure all invalid components are reported,
/// not only the first.
pub fn derive_module_path(
    file: &Path,
    source_root: &Path,
    package: Option<&str>,
) -> Result<ModulePath, ModuleNameError> {
    let relative =
        relative_to_root(file, source_root).ok_or_else(|| ModuleNameError::NotUnderSourceRoot {
            file: file.to_path_buf(),
            root: source_root.to_path_buf(),
        })?;

    let is_source = relative
        .extension()
        .is_some_and(|ext| ext == IMPLEMENTATION_EXT || ext == INTERFACE_EXT);
    if !is_source {
        return Err(ModuleNameError::NotASourceFile(file.to_path_buf()));
    }

    let mut components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    components.pop();

    let file_name = relative
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let invalid: Vec<String> = package
        .into_iter()
        .chain(components.iter().map(String::as_str))
        .chain(std::iter::once(file_name.as_str()))
        .filter(|c| !is_valid_identifier_component(c))
        .map(str::to_string)
        .collect();

    if !invalid.is_empty() {
        return Err(ModuleNameError::InvalidComponents(invalid));
    }

    Ok(ModulePath {
        package: package.map(str::to_string),
        dirs: components,
        file: file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_components() {
        for rejected in ["my file", "my-file", "file ", " dir", "", "1abc", "_", "brisk"] {
            assert!(
                !is_valid_identifier_component(rejected),
                "'{}' should be rejected",
                rejected
            );
        }
        for accepted in ["my_file", "my_dir", "__x1", "Brisk", "a"] {
            assert!(
                is_valid_identifier_component(accepted),
                "'{}' should be accepted",
                accepted
            );
        }
    }

    #[test]
    fn test_file_names() {
        let path = ModulePath::new(Some("lib"), &["collections"], "ring");
        assert_eq!(
            path.implementation_file_name(),
            Path::new("collections").join("ring.brk")
        );
        assert_eq!(
            path.interface_file_name(),
            Path::new("lib").join("collections").join("ring.brh")
        );
        assert_eq!(path.h_file_name(), Path::new("lib/collections/ring.h"));
        assert_eq!(path.c_name(), "lib_collections_ring");
        assert_eq!(path.to_string(), "@lib/collections/ring");
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["file", "a/b/file", "@pkg/a/file"] {
            let path: ModulePath = text.parse().unwrap();
            assert_eq!(path.to_string(), text);
        }
        assert!(matches!(
            "../a".parse::<ModulePath>(),
            Err(ModuleNameError::Relative(_))
        ));
        assert!(matches!(
            "a b".parse::<ModulePath>(),
            Err(ModuleNameError::Malformed(_))
        ));
    }

    #[test]
    fn test_derive_module_path() {
        let path = derive_module_path(
            Path::new("src/ctrl/pid.brk"),
            Path::new("src"),
            Some("plant"),
        )
        .unwrap();
        assert_eq!(path, ModulePath::new(Some("plant"), &["ctrl"], "pid"));

        let top = derive_module_path(Path::new("./main.brk"), Path::new("."), None).unwrap();
        assert_eq!(top, ModulePath::new(None, &[], "main"));
    }

    #[test]
    fn test_derive_reports_all_invalid_components() {
        let err = derive_module_path(
            Path::new("root/my dir/ok/bad-name.brk"),
            Path::new("root"),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModuleNameError::InvalidComponents(vec!["my dir".to_string(), "bad-name".to_string()])
        );
    }

    #[test]
    fn test_derive_outside_root() {
        let err = derive_module_path(Path::new("other/a.brk"), Path::new("src"), None).unwrap_err();
        assert!(matches!(err, ModuleNameError::NotUnderSourceRoot { .. }));
    }

    #[test]
    fn test_derive_with_current_dir_root() {
        let top = derive_module_path(Path::new("main.brk"), Path::new("."), None).unwrap();
        assert_eq!(top, ModulePath::new(None, &[], "main"));

        let pid = derive_module_path(Path::new("src/ctrl/pid.brk"), Path::new("./src"), None)
            .unwrap();
        assert_eq!(pid, ModulePath::new(None, &["ctrl"], "pid"));

        let a = derive_module_path(Path::new("./src/a.brh"), Path::new("src/"), None).unwrap();
        assert_eq!(a, ModulePath::new(None, &[], "a"));
    }

    #[test]
    fn test_derive_through_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("io")).unwrap();
        fs::write(root.join("io").join("adc.brk"), "{}").unwrap();

        let via_dots = root.join("io").join("..").join("io").join("adc.brk");
        let path = derive_module_path(&via_dots, &root, None).unwrap();
        assert_eq!(path, ModulePath::new(None, &["io"], "adc"));
    }

    #[test]
    fn test_derive_rejects_other_extensions() {
        for file in ["src/notes.txt", "src/notes"] {
            let err = derive_module_path(Path::new(file), Path::new("src"), None).unwrap_err();
            assert_eq!(err, ModuleNameError::NotASourceFile(PathBuf::from(file)));
        }
    }
}
