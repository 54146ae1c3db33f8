// Export context
// Accumulator threaded by value through the export inference walk

use super::ExportError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SingletonTag {
    /// Not exposed directly; exported by name only when demanded
    Opaque,
    /// Exposed directly, including its capture usages
    Translucent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingletonSignature {
    pub tag: SingletonTag,
    /// Distinct capture lists in order of first appearance
    pub usages: Vec<Vec<String>>,
}

impl SingletonSignature {
    pub fn new(tag: SingletonTag) -> Self {
        Self {
            tag,
            usages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbstractKind {
    Struct,
    NewType,
    Opaque,
}

/// What remains of a type declaration whose structure is withheld
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbstractType {
    pub name: String,
    pub kind: AbstractKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InternalKind {
    /// Explicit `internal import`
    Whitebox,
    /// Target module is itself internal
    Transitive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportContext {
    pub export_scope: BTreeSet<String>,
    /// local name -> owning module alias, `None` if the name is a module alias
    pub required_imports: BTreeMap<String, Option<String>>,
    pub singleton_signatures: BTreeMap<String, SingletonSignature>,
    pub opaque_types: BTreeMap<String, AbstractType>,
    pub internal_imports: BTreeMap<String, InternalKind>,
    #[serde(skip)]
    errors: Vec<ExportError>,
}

impl ExportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export(mut self, name: &str) -> Self {
        self.export_scope.insert(name.to_string());
        self
    }

    pub fn require_import(mut self, name: &str, owner: Option<String>) -> Self {
        self.required_imports.entry(name.to_string()).or_insert(owner);
        self
    }

    /// Seeds a singleton; an existing tag is never changed
    pub fn declare_singleton(mut self, name: &str, tag: SingletonTag) -> Self {
        self.singleton_signatures
            .entry(name.to_string())
            .or_insert_with(|| SingletonSignature::new(tag));
        self
    }

    /// Appends a capture list unless it is already recorded
    pub fn record_usage(mut self, singleton: &str, captures: Vec<String>) -> Self {
        if let Some(signature) = self.singleton_signatures.get_mut(singleton) {
            if !signature.usages.contains(&captures) {
                signature.usages.push(captures);
            }
        }
        self
    }

    pub fn declare_abstract_type(mut self, abstract_type: AbstractType) -> Self {
        self.opaque_types
            .insert(abstract_type.name.clone(), abstract_type);
        self
    }

    pub fn classify_import(mut self, alias: &str, kind: InternalKind) -> Self {
        self.internal_imports.insert(alias.to_string(), kind);
        self
    }

    pub fn report(mut self, error: ExportError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn is_opaque_singleton(&self, name: &str) -> bool {
        self.singleton_signatures
            .get(name)
            .is_some_and(|signature| signature.tag == SingletonTag::Opaque)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ExportError] {
        &self.errors
    }

    /// Keeps opaque types and singleton signatures only where the export scope demands them
    pub fn finalize(mut self) -> Result<Self, Vec<ExportError>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let scope = &self.export_scope;
        self.opaque_types.retain(|name, _| scope.contains(name));
        self.singleton_signatures
            .retain(|name, _| scope.contains(name));
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usages_are_distinct_and_ordered() {
        let ctx = ExportContext::new()
            .declare_singleton("s", SingletonTag::Opaque)
            .record_usage("s", vec!["f".into(), "g".into()])
            .record_usage("s", vec!["h".into()])
            .record_usage("s", vec!["f".into(), "g".into()])
            .record_usage("s", vec![])
            .record_usage("s", vec![]);

        assert_eq!(
            ctx.singleton_signatures["s"].usages,
            vec![
                vec!["f".to_string(), "g".to_string()],
                vec!["h".to_string()],
                vec![]
            ]
        );
    }

    #[test]
    fn test_tag_is_never_changed() {
        let ctx = ExportContext::new()
            .declare_singleton("s", SingletonTag::Translucent)
            .declare_singleton("s", SingletonTag::Opaque);
        assert_eq!(ctx.singleton_signatures["s"].tag, SingletonTag::Translucent);
        assert!(!ctx.is_opaque_singleton("s"));
    }

    #[test]
    fn test_finalize_filters_undemanded_entries() {
        let ctx = ExportContext::new()
            .declare_abstract_type(AbstractType {
                name: "Used".into(),
                kind: AbstractKind::Struct,
            })
            .declare_abstract_type(AbstractType {
                name: "Unused".into(),
                kind: AbstractKind::Opaque,
            })
            .declare_singleton("tick", SingletonTag::Opaque)
            .export("Used")
            .finalize()
            .unwrap();

        assert_eq!(ctx.opaque_types.keys().collect::<Vec<_>>(), vec!["Used"]);
        assert!(ctx.singleton_signatures.is_empty());
    }
}
