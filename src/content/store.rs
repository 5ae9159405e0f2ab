//! In-memory content store.
//!
//! All access goes through one `RwLock`. Multi-step flows (find-or-create
//! then append, delete, edit) run inside a single write-lock section, and
//! readers receive clones rather than references into the store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::StoreError;
use super::types::{ContentItem, Module};

/// Ordered collection of modules, unique by `module_title`.
///
/// Cheap to clone — clones share the same underlying modules.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    modules: Arc<RwLock<Vec<Module>>>,
}

/// What a [`ContentStore::delete`] call removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deleted {
    /// The whole module.
    Module,
    /// Items matching a key; `0` when nothing matched.
    Items(usize),
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module at the end of the store.
    ///
    /// Titles are unique: appending a title that already exists fails with
    /// [`StoreError::DuplicateModule`].
    pub async fn append_module(&self, module: Module) -> Result<(), StoreError> {
        let mut modules = self.modules.write().await;
        if modules.iter().any(|m| m.module_title == module.module_title) {
            return Err(StoreError::DuplicateModule(module.module_title));
        }
        debug!(module_title = %module.module_title, "module appended");
        modules.push(module);
        Ok(())
    }

    /// Snapshot of every module in insertion order.
    pub async fn list_modules(&self) -> Vec<Module> {
        self.modules.read().await.clone()
    }

    /// Snapshot of the module with this title, if any.
    pub async fn find_module(&self, module_title: &str) -> Option<Module> {
        self.modules
            .read()
            .await
            .iter()
            .find(|m| m.module_title == module_title)
            .cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.modules.read().await.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.modules.read().await.len()
    }

    /// Find or create `module_title`, then append one item per value under
    /// auto-generated `{key_prefix}_{n}` keys, preserving input order.
    ///
    /// Returns the full module after the append.
    pub async fn upsert_content(
        &self,
        module_title: &str,
        key_prefix: &str,
        values: Vec<String>,
    ) -> Module {
        let mut modules = self.modules.write().await;

        let idx = match modules.iter().position(|m| m.module_title == module_title) {
            Some(idx) => idx,
            None => {
                debug!(%module_title, "creating module");
                modules.push(Module::new(module_title));
                modules.len() - 1
            }
        };

        let module = &mut modules[idx];
        let added = values.len();
        for value in values {
            let key = module.next_key(key_prefix);
            module.content_parts.push(ContentItem { key, value });
        }

        debug!(%module_title, %key_prefix, added, total = module.content_parts.len(), "content upserted");
        module.clone()
    }

    /// Remove a whole module (`key == None`) or every item with `key`.
    ///
    /// Removing a key that matches nothing is not an error; an unknown module
    /// is.
    pub async fn delete(&self, module_title: &str, key: Option<&str>) -> Result<Deleted, StoreError> {
        let mut modules = self.modules.write().await;

        let idx = modules
            .iter()
            .position(|m| m.module_title == module_title)
            .ok_or_else(|| StoreError::ModuleNotFound(module_title.to_string()))?;

        match key {
            Some(key) => {
                let parts = &mut modules[idx].content_parts;
                let before = parts.len();
                parts.retain(|item| item.key != key);
                let removed = before - parts.len();
                debug!(%module_title, %key, removed, "content items deleted");
                Ok(Deleted::Items(removed))
            }
            None => {
                modules.remove(idx);
                debug!(%module_title, "module deleted");
                Ok(Deleted::Module)
            }
        }
    }

    /// Replace the value of the first item with `key` and return the updated
    /// module.
    pub async fn edit(&self, module_title: &str, key: &str, new_value: &str) -> Result<Module, StoreError> {
        let mut modules = self.modules.write().await;

        let module = modules
            .iter_mut()
            .find(|m| m.module_title == module_title)
            .ok_or_else(|| StoreError::ModuleNotFound(module_title.to_string()))?;

        let item = module
            .content_parts
            .iter_mut()
            .find(|item| item.key == key)
            .ok_or_else(|| StoreError::KeyNotFound {
                module_title: module_title.to_string(),
                key: key.to_string(),
            })?;

        item.value = new_value.to_string();
        debug!(%module_title, %key, "content item edited");
        Ok(module.clone())
    }
}
