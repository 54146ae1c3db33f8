// Symbol environment for export inference
// Answers which top-level names are exposed or hidden and which names come from imports

use brisk_ast::CompilationUnit;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// What an imported name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// The name is the local alias of an imported module
    Module,
    /// The name was brought in by `exposes` of the import aliased `module`
    Member { module: String },
}

pub trait SymbolEnv {
    /// Top-level name listed in the module's `exposes` clause
    fn is_exposed_toplevel(&self, name: &str) -> bool;

    /// Top-level name declared in this module and not exposed
    fn is_hidden(&self, name: &str) -> bool;

    fn imported_alias(&self, name: &str) -> Option<AliasTarget>;

    /// Name under which the declaration referenced by `path` is known, e.g. `m.T`
    fn declaring_name(&self, path: &[&str]) -> String;

    /// Local alias of the module owning `name`, if the name is imported
    fn module_alias_of(&self, name: &str) -> Option<String> {
        match self.imported_alias(name)? {
            AliasTarget::Module => Some(name.to_string()),
            AliasTarget::Member { module } => Some(module),
        }
    }
}

/// Symbol environment built directly from one compilation unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    toplevel: BTreeSet<String>,
    exposed: BTreeSet<String>,
    modules: BTreeSet<String>,
    /// exposed import member -> alias of the module it comes from
    members: BTreeMap<String, String>,
}

impl SymbolTable {
    pub fn from_unit(unit: &CompilationUnit) -> Self {
        let mut table = Self::default();

        for member in &unit.members {
            table.toplevel.insert(member.name().id.clone());
        }
        if let Some(spec) = &unit.spec {
            table
                .exposed
                .extend(spec.exposes.iter().map(|name| name.id.clone()));
        }
        for import in &unit.imports {
            let alias = &import.local_name.id;
            table.modules.insert(alias.clone());
            for name in &import.exposing {
                table.members.insert(name.id.clone(), alias.clone());
            }
        }

        table
    }

    pub fn toplevel(&self) -> impl Iterator<Item = &str> {
        self.toplevel.iter().map(String::as_str)
    }

    pub fn exposed(&self) -> impl Iterator<Item = &str> {
        self.exposed.iter().map(String::as_str)
    }

    pub fn is_toplevel(&self, name: &str) -> bool {
        self.toplevel.contains(name)
    }
}

impl SymbolEnv for SymbolTable {
    fn is_exposed_toplevel(&self, name: &str) -> bool {
        self.exposed.contains(name)
    }

    fn is_hidden(&self, name: &str) -> bool {
        self.toplevel.contains(name) && !self.exposed.contains(name)
    }

    fn imported_alias(&self, name: &str) -> Option<AliasTarget> {
        // Local declarations shadow imported names
        if self.toplevel.contains(name) {
            return None;
        }
        if self.modules.contains(name) {
            return Some(AliasTarget::Module);
        }
        self.members
            .get(name)
            .map(|module| AliasTarget::Member {
                module: module.clone(),
            })
    }

    fn declaring_name(&self, path: &[&str]) -> String {
        match path {
            [] => String::new(),
            [first, rest @ ..] => match self.imported_alias(first) {
                Some(AliasTarget::Module) => match rest.first() {
                    Some(member) => format!("{}.{}", first, member),
                    None => first.to_string(),
                },
                Some(AliasTarget::Member { module }) => format!("{}.{}", module, first),
                None => first.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_ast::{Import, Member, ModuleSpec, Name, SubprogramDecl, TypeDecl, TypeDeclKind};

    fn unit() -> CompilationUnit {
        let mut exposing = Import::new("io", "/io/adc");
        exposing.exposing = vec![Name::new("Sample")];
        CompilationUnit {
            imports: vec![Import::new("m", "util/m"), exposing],
            spec: Some(ModuleSpec {
                internal: false,
                exposes: vec![Name::new("f")],
                loc: Default::default(),
            }),
            members: vec![
                Member::Subprogram(SubprogramDecl::function("f")),
                Member::Type(TypeDecl {
                    name: Name::new("Hidden"),
                    kind: TypeDeclKind::Opaque,
                }),
            ],
        }
    }

    #[test]
    fn test_exposed_and_hidden() {
        let table = SymbolTable::from_unit(&unit());
        assert!(table.is_exposed_toplevel("f"));
        assert!(!table.is_hidden("f"));
        assert!(table.is_hidden("Hidden"));
        assert!(!table.is_hidden("m"));
        assert!(!table.is_hidden("unknown"));
    }

    #[test]
    fn test_imported_aliases() {
        let table = SymbolTable::from_unit(&unit());
        assert_eq!(table.imported_alias("m"), Some(AliasTarget::Module));
        assert_eq!(
            table.imported_alias("Sample"),
            Some(AliasTarget::Member {
                module: "io".to_string()
            })
        );
        assert_eq!(table.imported_alias("f"), None);
        assert_eq!(table.module_alias_of("Sample").as_deref(), Some("io"));
    }

    #[test]
    fn test_declaring_names() {
        let table = SymbolTable::from_unit(&unit());
        assert_eq!(table.declaring_name(&["Hidden"]), "Hidden");
        assert_eq!(table.declaring_name(&["m", "T", "x"]), "m.T");
        assert_eq!(table.declaring_name(&["Sample"]), "io.Sample");
    }
}
