// Singleton and abstract-type facts consulted by export inference

use crate::import_checker::Imports;
use brisk_ast::{CompilationUnit, Member};
use std::collections::BTreeSet;

/// Names are as seen from the current module: `f` for local or exposed-import
/// members, `m.f` for members reached through a module alias
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceFacts {
    pub singletons: BTreeSet<String>,
    pub abstract_types: BTreeSet<String>,
}

impl InferenceFacts {
    /// Facts declared by the unit itself
    pub fn local(unit: &CompilationUnit) -> Self {
        let exposed: BTreeSet<&str> = unit
            .spec
            .iter()
            .flat_map(|spec| spec.exposes.iter().map(|name| name.id.as_str()))
            .collect();

        let mut facts = Self::default();
        for member in &unit.members {
            let name = &member.name().id;
            if member.is_singleton() {
                facts.singletons.insert(name.clone());
            }
            if matches!(member, Member::Type(_)) && !exposed.contains(name.as_str()) {
                facts.abstract_types.insert(name.clone());
            }
        }
        facts
    }

    /// Local facts plus everything the compiled imports export
    pub fn collect<T>(unit: &CompilationUnit, imports: &Imports<T>) -> Self {
        let mut facts = Self::local(unit);

        for import in &unit.imports {
            let alias = &import.local_name.id;
            let Some(info) = imports.get(alias) else {
                continue;
            };

            for singleton in &info.singletons {
                facts.singletons.insert(format!("{}.{}", alias, singleton));
            }
            for abstract_type in &info.abstract_types {
                facts
                    .abstract_types
                    .insert(format!("{}.{}", alias, abstract_type));
            }
            for name in &import.exposing {
                if info.singletons.contains(&name.id) {
                    facts.singletons.insert(name.id.clone());
                }
                if info.abstract_types.contains(&name.id) {
                    facts.abstract_types.insert(name.id.clone());
                }
            }
        }

        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_ast::{ModuleSpec, Name, SubprogramDecl, TypeDecl, TypeDeclKind};

    #[test]
    fn test_local_facts() {
        let mut tick = SubprogramDecl::activity("tick");
        tick.singleton = true;
        let unit = CompilationUnit {
            imports: vec![],
            spec: Some(ModuleSpec {
                internal: false,
                exposes: vec![Name::new("Public")],
                loc: Default::default(),
            }),
            members: vec![
                Member::Subprogram(tick),
                Member::Subprogram(SubprogramDecl::function("plain")),
                Member::Type(TypeDecl {
                    name: Name::new("Public"),
                    kind: TypeDeclKind::Opaque,
                }),
                Member::Type(TypeDecl {
                    name: Name::new("Secret"),
                    kind: TypeDeclKind::Opaque,
                }),
            ],
        };

        let facts = InferenceFacts::local(&unit);
        assert_eq!(facts.singletons, BTreeSet::from(["tick".to_string()]));
        assert_eq!(facts.abstract_types, BTreeSet::from(["Secret".to_string()]));
    }
}
