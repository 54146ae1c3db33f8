// Module resolution driver for the Brisk compiler
// Locates, parses and checks modules recursively, caching one result per module path

use crate::cache::CompilationCache;
use crate::config::CompilerOptions;
use crate::export_inference::{infer_exports, ExportContext};
use crate::facts::InferenceFacts;
use crate::import_checker::{check_imports, ImportChain, Imports};
use crate::module_info::{CompileFailure, CompileResult, ModuleInfo};
use crate::resolver::{derive_module_path, find_implementation, find_interface, ModulePath};
use crate::symbols::SymbolTable;
use brisk_ast::CompilationUnit;
use brisk_diagnostics::{error_codes, Diagnostic, Span};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parsing and type checking, supplied by the rest of the compiler
pub trait Frontend {
    /// Type-check context and typed module kept in the compiled module
    type Checked;

    fn parse(
        &self,
        file: &Path,
        source: &str,
        module: &ModulePath,
    ) -> Result<CompilationUnit, Vec<Diagnostic>>;

    fn type_check(
        &self,
        unit: &CompilationUnit,
        imports: &Imports<Self::Checked>,
        exports: &ExportContext,
    ) -> Result<Self::Checked, Vec<Diagnostic>>;
}

/// Module resolver - compiles modules on demand and caches them by path
pub struct ModuleResolver<F: Frontend> {
    options: CompilerOptions,
    frontend: F,
    cache: CompilationCache<F::Checked>,
}

impl<F: Frontend> ModuleResolver<F> {
    pub fn new(options: CompilerOptions, frontend: F) -> Self {
        Self {
            options,
            frontend,
            cache: CompilationCache::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn cache(&self) -> &CompilationCache<F::Checked> {
        &self.cache
    }

    /// Module path of a file below the configured source root
    pub fn module_path_of(&self, file: &Path) -> Result<ModulePath, Diagnostic> {
        derive_module_path(file, &self.options.source_root, self.options.package.as_deref())
            .map_err(|e| {
                Diagnostic::error(
                    error_codes::INVALID_MODULE_NAME,
                    e.to_string(),
                    Span::from_path(file),
                )
            })
    }

    /// Compile `file` as the outermost module of a module graph
    pub fn compile_file(
        &self,
        file: &Path,
    ) -> Result<Arc<ModuleInfo<F::Checked>>, Vec<Diagnostic>> {
        let path = self.module_path_of(file).map_err(|d| vec![d])?;
        let chain = ImportChain::root(&path);

        self.cache
            .require_with(&path, || self.compile(&path, &chain, file))
            .map_err(|failure| failure.diagnostics)
    }

    /// Compile the module at `path` on behalf of the modules in `chain`
    ///
    /// `chain` ends with `path`; cycles must already have been rejected.
    pub fn require(&self, path: &ModulePath, chain: &ImportChain) -> CompileResult<F::Checked> {
        self.cache.require_with(path, || {
            let file = self.locate(path)?;
            self.compile(path, chain, &file)
        })
    }

    /// Implementation file for the own package, interface file otherwise
    pub fn locate(&self, path: &ModulePath) -> Result<PathBuf, CompileFailure> {
        let own_package = path.is_in_package(self.options.package.as_deref());
        let found = if own_package {
            find_implementation(path, &self.options.source_path)
        } else {
            find_interface(path, &self.options.interface_path)
        };

        found.map_err(|tried| {
            let mut diagnostic = Diagnostic::error(
                error_codes::MODULE_NOT_FOUND,
                format!("cannot find module {}", path),
                Span::unknown(),
            );
            for candidate in &tried {
                diagnostic = diagnostic.with_note(format!("tried {}", candidate.display()));
            }
            if tried.is_empty() {
                let which = if own_package { "source" } else { "interface" };
                diagnostic = diagnostic.with_help(format!("the {} path is empty", which));
            }
            CompileFailure::single(path, diagnostic)
        })
    }

    fn compile(
        &self,
        path: &ModulePath,
        chain: &ImportChain,
        file: &Path,
    ) -> CompileResult<F::Checked> {
        log::debug!("compiling {} from {}", path, file.display());
        let span = Span::from_path(file);

        let source = fs::read_to_string(file).map_err(|e| {
            CompileFailure::single(
                path,
                Diagnostic::error(
                    error_codes::UNREADABLE_SOURCE,
                    format!("cannot read {}: {}", file.display(), e),
                    span.clone(),
                ),
            )
        })?;

        let unit = self
            .frontend
            .parse(file, &source, path)
            .map_err(|diagnostics| CompileFailure::new(path, diagnostics))?;

        let imports = check_imports(&unit, path, chain, |target, chain| {
            self.require(target, chain)
        })
        .map_err(|errors| {
            let diagnostics = errors
                .iter()
                .flat_map(|error| error.to_diagnostics(&span))
                .collect();
            CompileFailure::new(path, diagnostics)
        })?;

        let symbols = SymbolTable::from_unit(&unit);
        let facts = InferenceFacts::collect(&unit, &imports);
        let exports = infer_exports(&unit, path, &symbols, &facts, imports.internal_modules())
            .map_err(|errors| {
                let diagnostics = errors
                    .iter()
                    .map(|error| error.to_diagnostic(&span))
                    .collect();
                CompileFailure::new(path, diagnostics)
            })?;

        let checked = self
            .frontend
            .type_check(&unit, &imports, &exports)
            .map_err(|diagnostics| CompileFailure::new(path, diagnostics))?;

        log::info!(
            "compiled module {} ({} import(s), {} exported name(s))",
            path,
            imports.len(),
            exports.export_scope.len()
        );

        Ok(Arc::new(ModuleInfo {
            path: path.clone(),
            file: file.to_path_buf(),
            imports: imports.module_names().cloned().collect(),
            singletons: exports.singleton_signatures.keys().cloned().collect(),
            abstract_types: exports.opaque_types.keys().cloned().collect(),
            spec: unit.spec,
            symbols,
            exports,
            checked,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_frontend::AstFrontend;
    use crate::resolver::SearchPath;
    use brisk_ast::{Import, ModuleSpec};

    fn write_unit(dir: &Path, relative: &str, unit: &CompilationUnit) {
        let file = dir.join(relative);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file, serde_json::to_string(unit).unwrap()).unwrap();
    }

    fn library(imports: Vec<Import>) -> CompilationUnit {
        CompilationUnit {
            imports,
            spec: Some(ModuleSpec::default()),
            members: vec![],
        }
    }

    fn resolver(root: &Path) -> ModuleResolver<AstFrontend> {
        let options = CompilerOptions::new()
            .with_source_root(root)
            .with_source_path(SearchPath::new(vec![root.to_path_buf()]));
        ModuleResolver::new(options, AstFrontend)
    }

    #[test]
    fn test_locate_reports_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        let failure = resolver
            .locate(&ModulePath::new(None, &["io"], "missing"))
            .unwrap_err();

        let diagnostic = &failure.diagnostics[0];
        assert_eq!(diagnostic.code, error_codes::MODULE_NOT_FOUND);
        assert_eq!(
            diagnostic.notes,
            vec![format!(
                "tried {}",
                dir.path().join("io").join("missing.brk").display()
            )]
        );
    }

    #[test]
    fn test_compile_file_with_import() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(dir.path(), "util/math.brk", &library(vec![]));
        write_unit(
            dir.path(),
            "main.brk",
            &CompilationUnit {
                imports: vec![Import::new("math", "util/math")],
                spec: None,
                members: vec![],
            },
        );

        let resolver = resolver(dir.path());
        let info = resolver.compile_file(&dir.path().join("main.brk")).unwrap();
        assert!(info.is_program());
        assert_eq!(info.imports, vec![ModulePath::new(None, &["util"], "math")]);
        assert!(resolver
            .cache()
            .is_compiled(&ModulePath::new(None, &["util"], "math")));
    }

    #[test]
    fn test_file_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(&dir.path().join("src"));
        let errors = resolver
            .compile_file(&dir.path().join("main.brk"))
            .unwrap_err();
        assert_eq!(errors[0].code, error_codes::INVALID_MODULE_NAME);
    }
}
