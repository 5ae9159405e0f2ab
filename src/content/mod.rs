//! Course content — modules of ordered key/value items held in memory.
//!
//! - **types** — `Module` / `ContentItem` and their prompt rendering.
//! - **store** — the shared, lock-guarded `ContentStore`.

mod store;
mod types;

pub use store::{ContentStore, Deleted};
pub use types::{ContentItem, Module};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("module '{0}' not found")]
    ModuleNotFound(String),
    #[error("key '{key}' not found in module '{module_title}'")]
    KeyNotFound { module_title: String, key: String },
    #[error("module '{0}' already exists")]
    DuplicateModule(String),
}
