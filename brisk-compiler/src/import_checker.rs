/**
 * Import Checker
 * Validates one module's import list against the module graph and collects
 * the compiled imports for export inference and type checking
 */
use crate::module_info::{CompileFailure, CompileResult, ModuleInfo};
use crate::resolver::{
    parse_import_path, resolve_against_current, ImportPathError, ModulePath, ResolveError,
};
use crate::symbols::SymbolTable;
use brisk_ast::{CompilationUnit, Import, Loc};
use brisk_diagnostics::{error_codes, Diagnostic, Span};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Modules currently being compiled, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportChain {
    modules: Vec<ModulePath>,
}

impl ImportChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain for compiling `root` as the outermost module
    pub fn root(root: &ModulePath) -> Self {
        Self::new().extended(root)
    }

    pub fn extended(&self, module: &ModulePath) -> Self {
        let mut modules = self.modules.clone();
        modules.push(module.clone());
        Self { modules }
    }

    pub fn contains(&self, module: &ModulePath) -> bool {
        self.modules.contains(module)
    }

    pub fn modules(&self) -> &[ModulePath] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Display for ImportChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, module) in self.modules.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", module)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ImportError {
    #[error("invalid import path '{import}': {error}")]
    InvalidImportPath {
        import: String,
        error: ImportPathError,
        loc: Loc,
    },

    #[error("{error}")]
    ImportOutsideSourceRoot { error: ResolveError, loc: Loc },

    #[error("cyclic import of {target}: {} -> {target}", .chain)]
    CyclicImport {
        target: ModulePath,
        chain: ImportChain,
        loc: Loc,
    },

    #[error("module {target} is imported more than once")]
    MultipleImport { target: ModulePath, loc: Loc },

    #[error("whitebox import of {target} from another package")]
    IllegalWhiteboxImport { target: ModulePath, loc: Loc },

    #[error("cannot compile imported module {target}")]
    CannotCompileImport {
        target: ModulePath,
        failure: CompileFailure,
        loc: Loc,
    },

    #[error("{target} is a program and cannot be imported")]
    ProgramImport { target: ModulePath, loc: Loc },

    #[error("internal module {target} cannot be imported from another package")]
    IllegalImportOfInternal { target: ModulePath, loc: Loc },
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::InvalidImportPath { .. } => error_codes::MALFORMED_IMPORT_PATH,
            ImportError::ImportOutsideSourceRoot { .. } => error_codes::OUTSIDE_SOURCE_ROOT,
            ImportError::CyclicImport { .. } => error_codes::CYCLIC_IMPORT,
            ImportError::MultipleImport { .. } => error_codes::MULTIPLE_IMPORT,
            ImportError::IllegalWhiteboxImport { .. } => error_codes::ILLEGAL_WHITEBOX_IMPORT,
            ImportError::CannotCompileImport { .. } => error_codes::CANNOT_COMPILE_IMPORT,
            ImportError::ProgramImport { .. } => error_codes::PROGRAM_IMPORT,
            ImportError::IllegalImportOfInternal { .. } => error_codes::ILLEGAL_IMPORT_OF_INTERNAL,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            ImportError::InvalidImportPath { loc, .. }
            | ImportError::ImportOutsideSourceRoot { loc, .. }
            | ImportError::CyclicImport { loc, .. }
            | ImportError::MultipleImport { loc, .. }
            | ImportError::IllegalWhiteboxImport { loc, .. }
            | ImportError::CannotCompileImport { loc, .. }
            | ImportError::ProgramImport { loc, .. }
            | ImportError::IllegalImportOfInternal { loc, .. } => *loc,
        }
    }

    /// The error itself, followed by the diagnostics of a failed imported module
    pub fn to_diagnostics(&self, file: &Span) -> Vec<Diagnostic> {
        let loc = self.loc();
        let span = file.at(loc.line, loc.column, 0);
        let diagnostic = Diagnostic::error(self.code(), self.to_string(), span);

        match self {
            ImportError::InvalidImportPath { error, .. } => {
                // Point at the offending character inside the quoted path
                let column = loc.column + error.column;
                let span = file.at(loc.line, column, 1);
                vec![Diagnostic::error(self.code(), self.to_string(), span)]
            }
            ImportError::CyclicImport { .. } => vec![diagnostic.with_help(
                "move the shared declarations into a module both sides can import".to_string(),
            )],
            ImportError::MultipleImport { .. } => {
                vec![diagnostic.with_help("remove the duplicate import".to_string())]
            }
            ImportError::IllegalWhiteboxImport { .. } => vec![diagnostic.with_note(
                "whitebox imports are only allowed within the same package".to_string(),
            )],
            ImportError::ProgramImport { .. } => vec![diagnostic.with_note(
                "only units with a module declaration can be imported".to_string(),
            )],
            ImportError::IllegalImportOfInternal { .. } => vec![diagnostic.with_note(
                "internal modules are only visible within their own package".to_string(),
            )],
            ImportError::CannotCompileImport { failure, .. } => std::iter::once(diagnostic)
                .chain(failure.diagnostics.iter().cloned())
                .collect(),
            ImportError::ImportOutsideSourceRoot { .. } => vec![diagnostic],
        }
    }
}

/// Compiled imports of one module; dropped when that module is finished
#[derive(Debug)]
pub struct Imports<T> {
    chain: ImportChain,
    modules: BTreeMap<ModulePath, Arc<ModuleInfo<T>>>,
    /// alias -> module path, in source order
    aliases: Vec<(String, ModulePath)>,
    internal: BTreeSet<ModulePath>,
}

impl<T> Imports<T> {
    pub fn new(chain: ImportChain) -> Self {
        Self {
            chain,
            modules: BTreeMap::new(),
            aliases: Vec::new(),
            internal: BTreeSet::new(),
        }
    }

    /// Registering the same path and module again has no effect
    pub fn register(&mut self, alias: &str, path: &ModulePath, info: Arc<ModuleInfo<T>>) {
        if info.is_internal() {
            self.internal.insert(path.clone());
        }
        if !self.aliases.iter().any(|(a, p)| a == alias && p == path) {
            self.aliases.push((alias.to_string(), path.clone()));
        }
        self.modules.entry(path.clone()).or_insert(info);
    }

    pub fn chain(&self) -> &ImportChain {
        &self.chain
    }

    pub fn contains(&self, path: &ModulePath) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Compiled module imported under `alias`
    pub fn get(&self, alias: &str) -> Option<&Arc<ModuleInfo<T>>> {
        self.aliases
            .iter()
            .find(|(a, _)| a == alias)
            .and_then(|(_, path)| self.modules.get(path))
    }

    pub fn module(&self, path: &ModulePath) -> Option<&Arc<ModuleInfo<T>>> {
        self.modules.get(path)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &ModulePath> {
        self.aliases.iter().map(|(_, path)| path)
    }

    pub fn lookup_tables(&self) -> BTreeMap<&ModulePath, &SymbolTable> {
        self.modules
            .iter()
            .map(|(path, info)| (path, &info.symbols))
            .collect()
    }

    pub fn export_scopes(&self) -> BTreeMap<&ModulePath, &BTreeSet<String>> {
        self.modules
            .iter()
            .map(|(path, info)| (path, info.export_scope()))
            .collect()
    }

    pub fn singletons(&self) -> Vec<(&ModulePath, &str)> {
        self.in_source_order()
            .flat_map(|(path, info)| info.singletons.iter().map(move |s| (path, s.as_str())))
            .collect()
    }

    pub fn abstract_types(&self) -> Vec<(&ModulePath, &str)> {
        self.in_source_order()
            .flat_map(|(path, info)| info.abstract_types.iter().map(move |t| (path, t.as_str())))
            .collect()
    }

    /// Frontend results of the imported modules, in source order
    pub fn artifacts(&self) -> Vec<&T> {
        self.in_source_order().map(|(_, info)| &info.checked).collect()
    }

    /// Imported modules that are themselves internal
    pub fn internal_modules(&self) -> &BTreeSet<ModulePath> {
        &self.internal
    }

    fn in_source_order(&self) -> impl Iterator<Item = (&ModulePath, &Arc<ModuleInfo<T>>)> {
        self.aliases
            .iter()
            .filter_map(|(_, path)| self.modules.get_key_value(path))
    }
}

/// Check every import of `unit`, the module at `current`
///
/// `chain` already contains `current`. Each import is checked on its own, so
/// a failing import does not stop the following ones; `require` compiles an
/// imported module under the extended chain.
pub fn check_imports<T, R>(
    unit: &CompilationUnit,
    current: &ModulePath,
    chain: &ImportChain,
    mut require: R,
) -> Result<Imports<T>, Vec<ImportError>>
where
    R: FnMut(&ModulePath, &ImportChain) -> CompileResult<T>,
{
    let mut imports = Imports::new(chain.clone());
    let mut errors = Vec::new();

    for import in &unit.imports {
        match check_import(import, current, &imports, &mut require) {
            Ok((target, info)) => {
                log::debug!("{} imports {} as '{}'", current, target, import.local_name.id);
                imports.register(&import.local_name.id, &target, info);
            }
            Err(error) => {
                log::debug!("{}: {}", current, error);
                errors.push(error);
            }
        }
    }

    if errors.is_empty() {
        Ok(imports)
    } else {
        Err(errors)
    }
}

fn check_import<T, R>(
    import: &Import,
    current: &ModulePath,
    imports: &Imports<T>,
    require: &mut R,
) -> Result<(ModulePath, Arc<ModuleInfo<T>>), ImportError>
where
    R: FnMut(&ModulePath, &ImportChain) -> CompileResult<T>,
{
    let loc = import.path_loc;
    let parsed = parse_import_path(&import.path).map_err(|error| ImportError::InvalidImportPath {
        import: import.path.clone(),
        error,
        loc,
    })?;
    let target = resolve_against_current(current, &parsed)
        .map_err(|error| ImportError::ImportOutsideSourceRoot { error, loc })?;

    if imports.chain.contains(&target) {
        return Err(ImportError::CyclicImport {
            target,
            chain: imports.chain.clone(),
            loc,
        });
    }
    if imports.contains(&target) {
        return Err(ImportError::MultipleImport { target, loc });
    }
    if import.whitebox && target.package != current.package {
        return Err(ImportError::IllegalWhiteboxImport { target, loc });
    }

    let info = match require(&target, &imports.chain.extended(&target)) {
        Ok(info) => info,
        Err(failure) => {
            return Err(ImportError::CannotCompileImport {
                target,
                failure,
                loc,
            })
        }
    };

    if info.is_program() {
        return Err(ImportError::ProgramImport { target, loc });
    }
    if info.is_internal() && target.package != current.package {
        return Err(ImportError::IllegalImportOfInternal { target, loc });
    }

    Ok((target, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export_inference::ExportContext;
    use brisk_ast::{ModuleSpec, Name};
    use std::path::PathBuf;

    fn compiled(path: &ModulePath, spec: Option<ModuleSpec>) -> Arc<ModuleInfo<()>> {
        Arc::new(ModuleInfo {
            path: path.clone(),
            file: PathBuf::from(path.to_string()),
            imports: vec![],
            spec,
            symbols: SymbolTable::default(),
            exports: ExportContext::new(),
            singletons: BTreeSet::from(["tick".to_string()]),
            abstract_types: BTreeSet::new(),
            checked: (),
        })
    }

    fn library(path: &ModulePath, internal: bool) -> Arc<ModuleInfo<()>> {
        let spec = ModuleSpec {
            internal,
            exposes: vec![Name::new("f")],
            loc: Loc::default(),
        };
        compiled(path, Some(spec))
    }

    fn program(path: &ModulePath) -> Arc<ModuleInfo<()>> {
        compiled(path, None)
    }

    fn unit(imports: Vec<Import>) -> CompilationUnit {
        CompilationUnit {
            imports,
            spec: None,
            members: vec![],
        }
    }

    fn current() -> ModulePath {
        ModulePath::new(Some("app"), &["ctrl"], "main")
    }

    #[test]
    fn test_successful_imports_in_source_order() {
        let unit = unit(vec![Import::new("b", "b"), Import::new("a", "/util/a")]);
        let chain = ImportChain::root(&current());

        let mut required = Vec::new();
        let imports = check_imports(&unit, &current(), &chain, |path, chain| {
            required.push((path.clone(), chain.len()));
            Ok(library(path, false))
        })
        .unwrap();

        let b = ModulePath::new(Some("app"), &["ctrl"], "b");
        let a = ModulePath::new(Some("app"), &["util"], "a");
        assert_eq!(required, vec![(b.clone(), 2), (a.clone(), 2)]);
        assert_eq!(imports.module_names().collect::<Vec<_>>(), vec![&b, &a]);
        assert_eq!(imports.get("a").map(|info| &info.path), Some(&a));
        assert_eq!(imports.singletons(), vec![(&b, "tick"), (&a, "tick")]);
        assert_eq!(imports.artifacts().len(), 2);
        assert!(imports.internal_modules().is_empty());
    }

    #[test]
    fn test_self_import_is_cyclic() {
        let unit = unit(vec![Import::new("me", "main")]);
        let chain = ImportChain::root(&current());

        let errors = check_imports::<(), _>(&unit, &current(), &chain, |_, _| {
            panic!("a cyclic import must be rejected before requiring it")
        })
        .unwrap_err();
        assert!(matches!(&errors[..], [ImportError::CyclicImport { .. }]));
    }

    #[test]
    fn test_cycle_is_attributed_to_closing_edge() {
        let a = ModulePath::new(None, &[], "a");
        let b = ModulePath::new(None, &[], "b");
        let chain = ImportChain::root(&a).extended(&b);

        let errors = check_imports::<(), _>(&unit(vec![Import::new("a", "a")]), &b, &chain, |_, _| {
            unreachable!()
        })
        .unwrap_err();
        match &errors[..] {
            [ImportError::CyclicImport { target, chain, .. }] => {
                assert_eq!(target, &a);
                assert_eq!(chain.to_string(), "a -> b");
            }
            other => panic!("unexpected errors: {:?}", other),
        }
    }

    #[test]
    fn test_multiple_import_after_unrelated_error() {
        let unit = unit(vec![
            Import::new("bad", "no-such"),
            Import::new("b", "b"),
            Import::new("again", "./b"),
        ]);
        let chain = ImportChain::root(&current());

        let errors = check_imports(&unit, &current(), &chain, |path, _| Ok(library(path, false)))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ImportError::InvalidImportPath { .. }));
        assert!(matches!(errors[1], ImportError::MultipleImport { .. }));
    }

    #[test]
    fn test_whitebox_across_packages() {
        let mut foreign = Import::new("raw", "@hw/raw");
        foreign.whitebox = true;
        let mut local = Import::new("regs", "/hw/regs");
        local.whitebox = true;
        let chain = ImportChain::root(&current());

        let errors = check_imports(&unit(vec![foreign, local]), &current(), &chain, |path, _| {
            Ok(library(path, true))
        })
        .unwrap_err();
        assert!(matches!(&errors[..], [ImportError::IllegalWhiteboxImport { .. }]));
    }

    #[test]
    fn test_internal_module_from_other_package() {
        let unit = unit(vec![Import::new("raw", "@hw/raw"), Import::new("regs", "/hw/regs")]);
        let chain = ImportChain::root(&current());

        let errors = check_imports(&unit, &current(), &chain, |path, _| Ok(library(path, true)))
            .unwrap_err();
        match &errors[..] {
            [ImportError::IllegalImportOfInternal { target, .. }] => {
                assert_eq!(target.package.as_deref(), Some("hw"))
            }
            other => panic!("unexpected errors: {:?}", other),
        }
    }

    #[test]
    fn test_internal_subset() {
        let unit = unit(vec![Import::new("regs", "/hw/regs"), Import::new("b", "b")]);
        let chain = ImportChain::root(&current());

        let imports = check_imports(&unit, &current(), &chain, |path, _| {
            Ok(library(path, path.file == "regs"))
        })
        .unwrap();
        assert_eq!(
            imports.internal_modules(),
            &BTreeSet::from([ModulePath::new(Some("app"), &["hw"], "regs")])
        );
    }

    #[test]
    fn test_program_import_and_failed_compile() {
        let unit = unit(vec![Import::new("p", "tool"), Import::new("x", "broken")]);
        let chain = ImportChain::root(&current());

        let errors = check_imports(&unit, &current(), &chain, |path, _| {
            if path.file == "tool" {
                Ok(program(path))
            } else {
                Err(CompileFailure::new(path, vec![]))
            }
        })
        .unwrap_err();
        assert!(matches!(errors[0], ImportError::ProgramImport { .. }));
        assert!(matches!(errors[1], ImportError::CannotCompileImport { .. }));
    }

    #[test]
    fn test_outside_source_root() {
        let unit = unit(vec![Import::new("x", "../../x")]);
        let chain = ImportChain::root(&current());

        let errors = check_imports::<(), _>(&unit, &current(), &chain, |_, _| unreachable!())
            .unwrap_err();
        assert!(matches!(&errors[..], [ImportError::ImportOutsideSourceRoot { .. }]));
        assert_eq!(errors[0].code(), error_codes::OUTSIDE_SOURCE_ROOT);
    }

    #[test]
    fn test_register_is_idempotent() {
        let path = ModulePath::new(None, &[], "b");
        let info = library(&path, false);
        let mut imports = Imports::new(ImportChain::new());
        imports.register("b", &path, info.clone());
        imports.register("b", &path, info);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports.module_names().count(), 1);
    }
}
