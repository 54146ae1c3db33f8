// Compilation cache
// At most one compiled result per module path across the whole module graph

use crate::module_info::CompileResult;
use crate::resolver::ModulePath;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

/// Memoizes compilation once per module path
///
/// The first caller for a path runs `compile`; concurrent callers for the same
/// path block on the same cell until it is filled. Callers must reject cyclic
/// imports before calling `require_with`, since re-entering a cell that is
/// still being filled never completes.
pub struct CompilationCache<T> {
    entries: DashMap<ModulePath, Arc<OnceLock<CompileResult<T>>>>,
}

impl<T> CompilationCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn require_with<F>(&self, path: &ModulePath, compile: F) -> CompileResult<T>
    where
        F: FnOnce() -> CompileResult<T>,
    {
        // Clone the cell out so the shard lock is released before compiling
        let cell = self.entries.entry(path.clone()).or_default().clone();
        cell.get_or_init(|| {
            log::debug!("cache miss for {}", path);
            compile()
        })
        .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_compiled(&self, path: &ModulePath) -> bool {
        self.entries
            .get(path)
            .is_some_and(|cell| cell.get().is_some())
    }

    pub fn get(&self, path: &ModulePath) -> Option<CompileResult<T>> {
        let cell = self.entries.get(path)?.clone();
        cell.get().cloned()
    }
}

impl<T> Default for CompilationCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
