// Compiled module record shared across the module graph

use crate::export_inference::ExportContext;
use crate::resolver::ModulePath;
use crate::symbols::SymbolTable;
use brisk_ast::ModuleSpec;
use brisk_diagnostics::Diagnostic;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result of compiling one module; immutable once created
#[derive(Debug)]
pub struct ModuleInfo<T> {
    pub path: ModulePath,
    pub file: PathBuf,
    /// Resolved imports in source order
    pub imports: Vec<ModulePath>,
    /// `None` for a program
    pub spec: Option<ModuleSpec>,
    pub symbols: SymbolTable,
    pub exports: ExportContext,
    /// Singletons visible to importers
    pub singletons: BTreeSet<String>,
    /// Types importers see by name only
    pub abstract_types: BTreeSet<String>,
    /// Whatever the frontend produced from type checking
    pub checked: T,
}

impl<T> ModuleInfo<T> {
    pub fn is_program(&self) -> bool {
        self.spec.is_none()
    }

    pub fn is_internal(&self) -> bool {
        self.spec.as_ref().is_some_and(|spec| spec.internal)
    }

    pub fn export_scope(&self) -> &BTreeSet<String> {
        &self.exports.export_scope
    }
}

#[derive(Debug, Clone, Error)]
#[error("cannot compile module {module}")]
pub struct CompileFailure {
    pub module: ModulePath,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    pub fn new(module: &ModulePath, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            module: module.clone(),
            diagnostics,
        }
    }

    pub fn single(module: &ModulePath, diagnostic: Diagnostic) -> Self {
        Self::new(module, vec![diagnostic])
    }
}

pub type CompileResult<T> = Result<Arc<ModuleInfo<T>>, CompileFailure>;
