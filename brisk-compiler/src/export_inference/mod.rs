/**
 * Export Inference
 * Computes a module's export scope, the imports its interface re-exposes,
 * singleton signatures and opaque types, and reports accessibility leaks
 */
pub mod context;
mod walk;

pub use context::{
    AbstractKind, AbstractType, ExportContext, InternalKind, SingletonSignature, SingletonTag,
};

use crate::facts::InferenceFacts;
use crate::resolver::{resolve_import, ModulePath};
use crate::symbols::SymbolEnv;
use brisk_ast::{CompilationUnit, Loc, Member, TypeDeclKind};
use brisk_diagnostics::{error_codes, Diagnostic, Span};
use std::collections::BTreeSet;
use thiserror::Error;
use walk::Walker;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("'{name}' is less accessible than '{exposing}', which exposes it")]
    NameLessAccessible {
        name: String,
        exposing: String,
        loc: Loc,
    },

    #[error("'{name}' is implicitly used by '{exposing}' but is less accessible")]
    ImplicitNameLessAccessible {
        name: String,
        exposing: String,
        loc: Loc,
    },

    #[error("'{exposing}' exposes '{name}' from '{module}', which is an internal module")]
    InternalModuleRequired {
        name: String,
        module: String,
        exposing: String,
        loc: Loc,
    },

    #[error("'{exposing}' exposes '{name}' from the internal import '{module}'")]
    ImportInternalRequired {
        name: String,
        module: String,
        exposing: String,
        loc: Loc,
    },
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::NameLessAccessible { .. } => error_codes::NAME_LESS_ACCESSIBLE,
            ExportError::ImplicitNameLessAccessible { .. } => {
                error_codes::IMPLICIT_NAME_LESS_ACCESSIBLE
            }
            ExportError::InternalModuleRequired { .. } => error_codes::INTERNAL_MODULE_REQUIRED,
            ExportError::ImportInternalRequired { .. } => error_codes::IMPORT_INTERNAL_REQUIRED,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            ExportError::NameLessAccessible { loc, .. }
            | ExportError::ImplicitNameLessAccessible { loc, .. }
            | ExportError::InternalModuleRequired { loc, .. }
            | ExportError::ImportInternalRequired { loc, .. } => *loc,
        }
    }

    pub fn to_diagnostic(&self, file: &Span) -> Diagnostic {
        let loc = self.loc();
        let span = file.at(loc.line, loc.column, 0);
        let diagnostic = Diagnostic::error(self.code(), self.to_string(), span);
        match self {
            ExportError::NameLessAccessible { name, exposing, .. }
            | ExportError::ImplicitNameLessAccessible { name, exposing, .. } => diagnostic
                .with_note(format!("'{}' is declared but not exposed", name))
                .with_help(format!(
                    "add '{}' to the module's exposes list or stop revealing it through '{}'",
                    name, exposing
                )),
            ExportError::InternalModuleRequired { module, .. } => diagnostic.with_help(format!(
                "declare this module internal or keep '{}' out of its public interface",
                module
            )),
            ExportError::ImportInternalRequired { module, .. } => diagnostic.with_help(format!(
                "declare this module internal or keep the whitebox import '{}' out of its public interface",
                module
            )),
        }
    }
}

/// Infer the exports of `unit`, the module at `current`
///
/// `internal_modules` holds the resolved imports already known to be internal;
/// together with whitebox imports they are classified before the walk.
pub fn infer_exports<E: SymbolEnv + ?Sized>(
    unit: &CompilationUnit,
    current: &ModulePath,
    env: &E,
    facts: &InferenceFacts,
    internal_modules: &BTreeSet<ModulePath>,
) -> Result<ExportContext, Vec<ExportError>> {
    let ctx = classify_imports(ExportContext::new(), unit, current, internal_modules);
    let ctx = seed(ctx, unit, env);

    let walker = Walker {
        env,
        facts,
        module_internal: unit.is_internal(),
    };
    let ctx = unit
        .members
        .iter()
        .fold(ctx, |ctx, member| walker.member(ctx, member));

    log::debug!(
        "inferred exports of {}: {} name(s), {} error(s)",
        current,
        ctx.export_scope.len(),
        ctx.errors().len()
    );
    ctx.finalize()
}

fn classify_imports(
    ctx: ExportContext,
    unit: &CompilationUnit,
    current: &ModulePath,
    internal_modules: &BTreeSet<ModulePath>,
) -> ExportContext {
    unit.imports.iter().fold(ctx, |ctx, import| {
        let alias = import.local_name.id.as_str();
        if import.whitebox {
            return ctx.classify_import(alias, InternalKind::Whitebox);
        }
        match resolve_import(current, &import.path) {
            Ok(path) if internal_modules.contains(&path) => {
                ctx.classify_import(alias, InternalKind::Transitive)
            }
            _ => ctx,
        }
    })
}

/// Exposed names, singleton signatures and abstract type candidates
fn seed<E: SymbolEnv + ?Sized>(
    ctx: ExportContext,
    unit: &CompilationUnit,
    env: &E,
) -> ExportContext {
    unit.members.iter().fold(ctx, |ctx, member| {
        let name = member.name().id.as_str();
        let exposed = env.is_exposed_toplevel(name);
        let ctx = if exposed { ctx.export(name) } else { ctx };

        let ctx = if member.is_singleton() {
            let tag = if exposed {
                SingletonTag::Translucent
            } else {
                SingletonTag::Opaque
            };
            ctx.declare_singleton(name, tag)
        } else {
            ctx
        };

        match member {
            Member::Type(decl) if !exposed => {
                let kind = match decl.kind {
                    TypeDeclKind::Struct(_) => AbstractKind::Struct,
                    TypeDeclKind::NewType(_) => AbstractKind::NewType,
                    TypeDeclKind::Opaque => AbstractKind::Opaque,
                };
                ctx.declare_abstract_type(AbstractType {
                    name: name.to_string(),
                    kind,
                })
            }
            _ => ctx,
        }
    })
}
