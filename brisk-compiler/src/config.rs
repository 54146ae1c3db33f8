// Compiler configuration
// Source root, search paths and package name, optionally read from a brisk.json manifest

use crate::resolver::{is_valid_identifier_component, SearchPath};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "brisk.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read manifest '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid manifest '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid package name '{0}'")]
    InvalidPackageName(String),
}

/// Package manifest, e.g.
/// `{ "name": "plant", "sourcePath": "src;gen", "interfacePath": "deps" }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_root: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub interface_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Module paths of compiled files are derived relative to this directory
    pub source_root: PathBuf,
    /// Where implementation files of the own package are searched
    pub source_path: SearchPath,
    /// Where interface files of other packages are searched
    pub interface_path: SearchPath,
    /// Package being compiled; `None` for a standalone program
    pub package: Option<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            source_path: SearchPath::parse("."),
            interface_path: SearchPath::default(),
            package: None,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    pub fn with_source_path(mut self, path: SearchPath) -> Self {
        self.source_path = path;
        self
    }

    pub fn with_interface_path(mut self, path: SearchPath) -> Self {
        self.interface_path = path;
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Result<Self, ConfigError> {
        let package = package.into();
        if !is_valid_identifier_component(&package) {
            return Err(ConfigError::InvalidPackageName(package));
        }
        self.package = Some(package);
        Ok(self)
    }

    /// Read a manifest; relative directories are taken relative to the manifest's directory
    pub fn from_manifest(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        log::debug!("loaded manifest {}", path.display());
        Self::from_parts(&manifest, base)
    }

    pub fn from_parts(manifest: &Manifest, base: &Path) -> Result<Self, ConfigError> {
        let mut options = Self::new();

        let root = manifest.source_root.as_deref().unwrap_or(".");
        options.source_root = base.join(root);
        options.source_path = relative_to(
            base,
            &SearchPath::parse(manifest.source_path.as_deref().unwrap_or(root)),
        );
        if let Some(interface_path) = &manifest.interface_path {
            options.interface_path = relative_to(base, &SearchPath::parse(interface_path));
        }

        match &manifest.name {
            Some(name) => options.with_package(name.as_str()),
            None => Ok(options),
        }
    }
}

fn relative_to(base: &Path, path: &SearchPath) -> SearchPath {
    SearchPath::new(path.dirs().iter().map(|dir| base.join(dir)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompilerOptions::default();
        assert_eq!(options.source_root, PathBuf::from("."));
        assert_eq!(options.source_path.dirs(), &[PathBuf::from(".")]);
        assert!(options.interface_path.is_empty());
        assert_eq!(options.package, None);
    }

    #[test]
    fn test_manifest_paths_are_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join(MANIFEST_FILE);
        fs::write(
            &manifest,
            r#"{ "name": "plant", "sourceRoot": "src", "interfacePath": "deps;/opt/brisk" }"#,
        )
        .unwrap();

        let options = CompilerOptions::from_manifest(&manifest).unwrap();
        assert_eq!(options.package.as_deref(), Some("plant"));
        assert_eq!(options.source_root, dir.path().join("src"));
        assert_eq!(options.source_path.dirs(), &[dir.path().join("src")]);
        assert_eq!(
            options.interface_path.dirs(),
            &[dir.path().join("deps"), PathBuf::from("/opt/brisk")]
        );
    }

    #[test]
    fn test_invalid_package_name() {
        let manifest = Manifest {
            name: Some("my-package".to_string()),
            ..Manifest::default()
        };
        assert!(matches!(
            CompilerOptions::from_parts(&manifest, Path::new(".")),
            Err(ConfigError::InvalidPackageName(name)) if name == "my-package"
        ));
    }

    #[test]
    fn test_missing_manifest() {
        let err = CompilerOptions::from_manifest(Path::new("/nonexistent/brisk.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
