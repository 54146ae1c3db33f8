// Export inference walk
// One fold over a module's members; every step consumes the context and returns it

use super::context::{ExportContext, InternalKind};
use super::ExportError;
use crate::facts::InferenceFacts;
use crate::symbols::{AliasTarget, SymbolEnv};
use crate::visibility::Visibility;
use brisk_ast::{
    Access, Call, DynamicAccessPath, Expr, Loc, Member, ParamDecl, StaticAccessPath, Stmt,
    TypeDeclKind, TypeSpec, VarDecl,
};

/// How a name was referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Explicit,
    /// Extension member reached through `:`
    Implicit,
}

pub(super) struct Walker<'a, E: SymbolEnv + ?Sized> {
    pub env: &'a E,
    pub facts: &'a InferenceFacts,
    pub module_internal: bool,
}

impl<'a, E: SymbolEnv + ?Sized> Walker<'a, E> {
    pub fn member(&self, ctx: ExportContext, member: &Member) -> ExportContext {
        let exposing = member.name().id.as_str();
        let exposed = self.env.is_exposed_toplevel(exposing);

        match member {
            Member::Var(decl) => {
                self.var_decl(ctx, Visibility::for_value(exposed), exposing, decl)
            }
            Member::Type(decl) => {
                let exp = Visibility::for_declaration(exposed);
                match &decl.kind {
                    TypeDeclKind::Struct(fields) => fields
                        .iter()
                        .fold(ctx, |ctx, field| self.var_decl(ctx, exp, exposing, field)),
                    TypeDeclKind::NewType(spec) => self.type_spec(ctx, exp, exposing, spec),
                    TypeDeclKind::Opaque => ctx,
                }
            }
            Member::Subprogram(decl) => {
                let exp = Visibility::for_declaration(exposed);
                let ctx =
                    self.signature(ctx, exp, exposing, &decl.inputs, &decl.outputs, &decl.result);
                let body_exp = if decl.compile_time { exp } else { exp.weaken() };
                self.stmts(ctx, body_exp, exposing, &decl.body)
            }
            Member::Prototype(decl) => {
                let exp = Visibility::for_declaration(exposed);
                self.signature(ctx, exp, exposing, &decl.inputs, &decl.outputs, &decl.result)
            }
        }
    }

    fn signature(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        inputs: &[ParamDecl],
        outputs: &[ParamDecl],
        result: &Option<TypeSpec>,
    ) -> ExportContext {
        let ctx = inputs
            .iter()
            .chain(outputs)
            .fold(ctx, |ctx, param| self.type_spec(ctx, exp, exposing, &param.datatype));
        match result {
            Some(spec) => self.type_spec(ctx, exp, exposing, spec),
            None => ctx,
        }
    }

    fn var_decl(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        decl: &VarDecl,
    ) -> ExportContext {
        let ctx = match &decl.datatype {
            Some(spec) => self.type_spec(ctx, exp, exposing, spec),
            None => ctx,
        };
        match &decl.init {
            Some(init) => self.expr(ctx, exp, exposing, init),
            None => ctx,
        }
    }

    fn type_spec(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        spec: &TypeSpec,
    ) -> ExportContext {
        match spec {
            TypeSpec::Bool
            | TypeSpec::Int(_)
            | TypeSpec::Nat(_)
            | TypeSpec::Bits(_)
            | TypeSpec::Float(_) => ctx,
            TypeSpec::Named(path) => self.static_path(ctx, exp, exposing, path),
            TypeSpec::Array { size, element } => {
                // Array sizes are compile-time values, always fully revealed
                let ctx = self.expr(ctx, exp.strengthen(), exposing, size);
                self.type_spec(ctx, exp, exposing, element)
            }
            TypeSpec::Slice(element) => self.type_spec(ctx, exp, exposing, element),
        }
    }

    fn expr(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        expr: &Expr,
    ) -> ExportContext {
        match expr {
            Expr::Literal(_) => ctx,
            Expr::Path(path) | Expr::Prev(path) => self.dynamic_path(ctx, exp, exposing, path),
            Expr::Call(call) => self.call(ctx, exp, exposing, call),
            Expr::Unary { operand, .. } => self.expr(ctx, exp, exposing, operand),
            Expr::Binary { lhs, rhs, .. } => {
                let ctx = self.expr(ctx, exp, exposing, lhs);
                self.expr(ctx, exp, exposing, rhs)
            }
            Expr::Convert { expr, target } => {
                let ctx = self.expr(ctx, exp, exposing, expr);
                self.type_spec(ctx, exp, exposing, target)
            }
            Expr::Array(elements) => elements
                .iter()
                .fold(ctx, |ctx, element| self.expr(ctx, exp, exposing, element)),
            Expr::Struct { datatype, fields } => {
                let ctx = match datatype {
                    Some(spec) => self.type_spec(ctx, exp, exposing, spec),
                    None => ctx,
                };
                fields
                    .iter()
                    .fold(ctx, |ctx, (_, value)| self.expr(ctx, exp, exposing, value))
            }
        }
    }

    fn stmts(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        stmts: &[Stmt],
    ) -> ExportContext {
        stmts
            .iter()
            .fold(ctx, |ctx, stmt| self.stmt(ctx, exp, exposing, stmt))
    }

    fn stmt(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        stmt: &Stmt,
    ) -> ExportContext {
        match stmt {
            Stmt::Var(decl) => self.var_decl(ctx, exp, exposing, decl),
            Stmt::Assign { lhs, rhs } => {
                let ctx = self.dynamic_path(ctx, exp, exposing, lhs);
                self.expr(ctx, exp, exposing, rhs)
            }
            Stmt::Call(call) => self.call(ctx, exp, exposing, call),
            Stmt::Run { receiver, call } => {
                let ctx = match receiver {
                    Some(path) => self.dynamic_path(ctx, exp, exposing, path),
                    None => ctx,
                };
                self.call(ctx, exp, exposing, call)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let ctx = self.expr(ctx, exp, exposing, cond);
                let ctx = self.stmts(ctx, exp, exposing, then_branch);
                self.stmts(ctx, exp, exposing, else_branch)
            }
            Stmt::While { cond, body } | Stmt::Abort { cond, body } => {
                let ctx = self.expr(ctx, exp, exposing, cond);
                self.stmts(ctx, exp, exposing, body)
            }
            Stmt::Repeat { body, until } => {
                let ctx = self.stmts(ctx, exp, exposing, body);
                match until {
                    Some(cond) => self.expr(ctx, exp, exposing, cond),
                    None => ctx,
                }
            }
            Stmt::Await(expr) | Stmt::Assert(expr) => self.expr(ctx, exp, exposing, expr),
            Stmt::Cobegin(threads) => threads
                .iter()
                .fold(ctx, |ctx, thread| self.stmts(ctx, exp, exposing, thread)),
            Stmt::Return(value) => match value {
                Some(expr) => self.expr(ctx, exp, exposing, expr),
                None => ctx,
            },
        }
    }

    fn call(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        call: &Call,
    ) -> ExportContext {
        let ctx = self.dynamic_path(ctx, exp, exposing, &call.callee);
        let ctx = self.singleton_call(ctx, call);

        let ctx = call
            .captures
            .iter()
            .fold(ctx, |ctx, capture| self.static_path(ctx, exp, exposing, capture));
        let ctx = call
            .inputs
            .iter()
            .fold(ctx, |ctx, input| self.expr(ctx, exp, exposing, input));
        call.outputs
            .iter()
            .fold(ctx, |ctx, output| self.dynamic_path(ctx, exp, exposing, output))
    }

    /// Singleton identity must reach the call site whatever the visibility
    fn singleton_call(&self, ctx: ExportContext, call: &Call) -> ExportContext {
        let callee = call.callee.static_prefix();
        let key = callee.join(".");
        if !self.facts.singletons.contains(&key) {
            return ctx;
        }

        let first = call.callee.first.id.as_str();
        let ctx = self.require_if_imported(ctx, first);

        if ctx.singleton_signatures.contains_key(&key) {
            let captures = call.captures.iter().map(StaticAccessPath::dotted).collect();
            ctx.record_usage(&key, captures)
        } else {
            ctx
        }
    }

    fn static_path(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        path: &StaticAccessPath,
    ) -> ExportContext {
        self.reference(ctx, exp, exposing, &path.ids(), path.first.loc, Reference::Explicit)
    }

    fn dynamic_path(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        path: &DynamicAccessPath,
    ) -> ExportContext {
        let ctx = self.reference(
            ctx,
            exp,
            exposing,
            &path.static_prefix(),
            path.first.loc,
            Reference::Explicit,
        );

        path.accesses.iter().fold(ctx, |ctx, access| match access {
            Access::Field(_) => ctx,
            Access::Index(index) => self.expr(ctx, exp, exposing, index),
            Access::Point(member) => self.reference(
                ctx,
                exp,
                exposing,
                &[member.id.as_str()],
                member.loc,
                Reference::Implicit,
            ),
        })
    }

    fn reference(
        &self,
        ctx: ExportContext,
        exp: Visibility,
        exposing: &str,
        path: &[&str],
        loc: Loc,
        kind: Reference,
    ) -> ExportContext {
        let Some(&first) = path.first() else {
            return ctx;
        };

        match exp {
            Visibility::Invisible => ctx,
            Visibility::Semitransparent => {
                let ctx = if self.env.is_hidden(first)
                    && (self.facts.abstract_types.contains(first) || ctx.is_opaque_singleton(first))
                {
                    ctx.export(first)
                } else {
                    ctx
                };
                self.require_if_imported(ctx, first)
            }
            Visibility::Transparent => {
                let ctx = if self.env.is_hidden(first) {
                    let name = self.env.declaring_name(path);
                    let exposing = exposing.to_string();
                    ctx.report(match kind {
                        Reference::Explicit => ExportError::NameLessAccessible { name, exposing, loc },
                        Reference::Implicit => {
                            ExportError::ImplicitNameLessAccessible { name, exposing, loc }
                        }
                    })
                } else {
                    ctx
                };
                let ctx = self.require_if_imported(ctx, first);
                self.check_internal_leak(ctx, exposing, path, loc)
            }
        }
    }

    fn require_if_imported(&self, ctx: ExportContext, name: &str) -> ExportContext {
        match self.env.imported_alias(name) {
            Some(AliasTarget::Module) => ctx.require_import(name, None),
            Some(AliasTarget::Member { module }) => ctx.require_import(name, Some(module)),
            None => ctx,
        }
    }

    fn check_internal_leak(
        &self,
        ctx: ExportContext,
        exposing: &str,
        path: &[&str],
        loc: Loc,
    ) -> ExportContext {
        if self.module_internal {
            return ctx;
        }
        let Some(module) = path.first().and_then(|first| self.env.module_alias_of(first)) else {
            return ctx;
        };
        let Some(kind) = ctx.internal_imports.get(&module).copied() else {
            return ctx;
        };

        let name = self.env.declaring_name(path);
        let exposing = exposing.to_string();
        ctx.report(match kind {
            InternalKind::Transitive => ExportError::InternalModuleRequired {
                name,
                module,
                exposing,
                loc,
            },
            InternalKind::Whitebox => ExportError::ImportInternalRequired {
                name,
                module,
                exposing,
                loc,
            },
        })
    }
}
