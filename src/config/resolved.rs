//! Canonical resource: every name filled in, hook table attached.

use crate::hooks::HookTable;
use crate::model::Model;
use std::fmt;
use std::sync::{Arc, RwLock};

pub struct Resource {
    pub model: Arc<dyn Model>,
    /// Path segment of the collection routes (e.g. "books").
    pub collection_name: String,
    /// Singular name used for item hook setters (e.g. "book").
    pub item_name: String,
    /// Field matched against the `:identifier` path segment.
    pub identifier: String,
    /// Written while hooks are registered, read on every request.
    pub hooks: RwLock<HookTable>,
}

impl Resource {
    pub fn collection_path(&self) -> String {
        format!("/{}", self.collection_name)
    }

    pub fn item_path(&self) -> String {
        format!("/{}/:identifier", self.collection_name)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read().map(|t| format!("{:?}", *t)).unwrap_or_default();
        f.debug_struct("Resource")
            .field("model", &self.model.name())
            .field("collection_name", &self.collection_name)
            .field("item_name", &self.item_name)
            .field("identifier", &self.identifier)
            .field("hooks", &hooks)
            .finish()
    }
}
