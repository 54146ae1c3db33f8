/**
 * Search Paths
 * Ordered directory lists probed left to right for module files
 */
use super::module_path::{ModulePath, IMPLEMENTATION_EXT, INTERFACE_EXT};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Separates directories in search path text: `.;lib;/opt/brisk/lib`
pub const SEARCH_PATH_SEPARATOR: char = ';';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Empty entries are skipped
    pub fn parse(text: &str) -> Self {
        Self {
            dirs: text
                .split(SEARCH_PATH_SEPARATOR)
                .map(str::trim)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .collect(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dir) in self.dirs.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEARCH_PATH_SEPARATOR)?;
            }
            write!(f, "{}", dir.display())?;
        }
        Ok(())
    }
}

fn is_readable(candidate: &Path) -> bool {
    if !candidate.is_file() {
        return false;
    }
    match File::open(candidate) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("skipping unreadable {}: {}", candidate.display(), e);
            false
        }
    }
}

/// Find `dir/<module path>.<extension>` in the first search directory that has it
///
/// On failure returns every candidate tried, in search order.
pub fn search(
    module: &ModulePath,
    search_path: &SearchPath,
    extension: &str,
) -> Result<PathBuf, Vec<PathBuf>> {
    let relative = module.relative_path(extension);
    let mut tried = Vec::with_capacity(search_path.dirs.len());

    for dir in &search_path.dirs {
        let candidate = dir.join(&relative);
        if is_readable(&candidate) {
            log::debug!("module {} found at {}", module, candidate.display());
            return Ok(candidate);
        }
        tried.push(candidate);
    }

    Err(tried)
}

/// Implementation files are only looked up inside the compiling package
pub fn find_implementation(
    module: &ModulePath,
    search_path: &SearchPath,
) -> Result<PathBuf, Vec<PathBuf>> {
    search(&module.without_package(), search_path, IMPLEMENTATION_EXT)
}

/// Interface files keep the package qualifier: `<dir>/<pkg>/<dirs>/<file>.brh`
pub fn find_interface(
    module: &ModulePath,
    search_path: &SearchPath,
) -> Result<PathBuf, Vec<PathBuf>> {
    search(module, search_path, INTERFACE_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_search_path() {
        let path = SearchPath::parse(".;C:/somewhere;;lib ");
        assert_eq!(
            path.dirs(),
            &[
                PathBuf::from("."),
                PathBuf::from("C:/somewhere"),
                PathBuf::from("lib")
            ]
        );
        assert_eq!(path.to_string(), ".;C:/somewhere;lib");
    }

    #[test]
    fn test_search_reports_candidates_in_order() {
        let search_path = SearchPath::parse(".;C:/somewhere");
        let module = ModulePath::new(None, &[], "a");

        let tried = search(&module, &search_path, "brk").unwrap_err();
        assert_eq!(
            tried,
            vec![PathBuf::from("./a.brk"), PathBuf::from("C:/somewhere/a.brk")]
        );
    }

    #[test]
    fn test_first_readable_candidate_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(second.path().join("io")).unwrap();
        fs::write(second.path().join("io/adc.brk"), "{}").unwrap();
        fs::create_dir_all(first.path().join("io/adc.brk")).unwrap(); // a directory, not a file

        let search_path = SearchPath::new(vec![first.path().into(), second.path().into()]);
        let module = ModulePath::new(None, &["io"], "adc");

        let found = find_implementation(&module, &search_path).unwrap();
        assert_eq!(found, second.path().join("io/adc.brk"));
    }

    #[test]
    fn test_package_qualifier_policies() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("util")).unwrap();
        fs::write(dir.path().join("vec.brk"), "{}").unwrap();
        fs::write(dir.path().join("util/vec.brh"), "{}").unwrap();

        let search_path = SearchPath::new(vec![dir.path().into()]);
        let module = ModulePath::new(Some("util"), &[], "vec");

        assert_eq!(
            find_implementation(&module, &search_path).unwrap(),
            dir.path().join("vec.brk")
        );
        assert_eq!(
            find_interface(&module, &search_path).unwrap(),
            dir.path().join("util/vec.brh")
        );
    }
}
