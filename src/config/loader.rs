//! Build canonical resources from declarations, and read router options from the environment.

use crate::case::{default_collection_name, default_item_name};
use crate::config::resolved::Resource;
use crate::config::types::{Pagination, ResourceConfig, ResourceDescriptor, RouterOptions};
use crate::error::ConfigError;
use crate::hooks::HookTable;
use std::sync::RwLock;

/// Environment variable holding the pagination JSON (`false` or `{"itemsPerPage": n}`).
pub const PAGINATION_ENV: &str = "RESOURCE_ROUTER_PAGINATION";
/// Environment variable holding the request body limit in bytes.
pub const BODY_LIMIT_ENV: &str = "RESOURCE_ROUTER_BODY_LIMIT";

/// Fill in derived names and attach an empty hook table.
pub fn normalize(config: ResourceConfig) -> Resource {
    let descriptor = match config {
        ResourceConfig::Model(model) => ResourceDescriptor::new(model.0),
        ResourceConfig::Descriptor(d) => d,
    };
    let model_name = descriptor.model.name().to_string();
    let collection_name = descriptor
        .collection_name
        .unwrap_or_else(|| default_collection_name(&model_name));
    let item_name = descriptor
        .item_name
        .unwrap_or_else(|| default_item_name(&model_name));
    let identifier = descriptor
        .identifier
        .unwrap_or_else(|| descriptor.model.id_attribute().to_string());

    Resource {
        model: descriptor.model,
        collection_name,
        item_name,
        identifier,
        hooks: RwLock::new(HookTable::new()),
    }
}

/// Router options from process environment. Unset variables leave the defaults in place.
pub fn options_from_env() -> Result<RouterOptions, ConfigError> {
    options_from_vars(|key| std::env::var(key).ok())
}

/// Router options from an arbitrary variable lookup.
pub fn options_from_vars<F>(lookup: F) -> Result<RouterOptions, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut options = RouterOptions::new();
    if let Some(raw) = lookup(PAGINATION_ENV).filter(|s| !s.trim().is_empty()) {
        let pagination: Pagination = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Load(format!("{}: {}", PAGINATION_ENV, e)))?;
        options = options.pagination(pagination);
    }
    if let Some(raw) = lookup(BODY_LIMIT_ENV).filter(|s| !s.trim().is_empty()) {
        let bytes: usize = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Load(format!("{}: expected a byte count, got '{}'", BODY_LIMIT_ENV, raw)))?;
        options = options.body_limit(bytes);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Operation, Phase};
    use crate::model::MemoryModel;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn bare_model_gets_derived_names() {
        let resource = normalize(Arc::new(MemoryModel::new("Book")).into());
        assert_eq!(resource.collection_name, "books");
        assert_eq!(resource.item_name, "book");
        assert_eq!(resource.identifier, "id");
        assert_eq!(resource.collection_path(), "/books");
        assert_eq!(resource.item_path(), "/books/:identifier");
    }

    #[test]
    fn descriptor_names_win_over_defaults() {
        let model = Arc::new(MemoryModel::new("Person").with_id_attribute("uuid"));
        let resource = normalize(
            ResourceDescriptor::new(model)
                .collection_name("people")
                .item_name("person")
                .into(),
        );
        assert_eq!(resource.collection_name, "people");
        assert_eq!(resource.item_name, "person");
        assert_eq!(resource.identifier, "uuid");
    }

    #[test]
    fn descriptor_identifier_overrides_model() {
        let model = Arc::new(MemoryModel::new("Tag"));
        let resource = normalize(ResourceDescriptor::new(model).identifier("slug").into());
        assert_eq!(resource.identifier, "slug");
        assert_eq!(resource.collection_name, "tags");
    }

    #[test]
    fn every_resource_gets_its_own_empty_hooks() {
        let model = Arc::new(MemoryModel::new("Book"));
        let a = normalize(model.clone().into());
        let b = normalize(model.into());
        let table_a = a.hooks.read().unwrap();
        let table_b = b.hooks.read().unwrap();
        for phase in Phase::ALL {
            assert_eq!(table_a.phase(phase).len(), 5);
            assert_eq!(table_b.phase(phase).len(), 5);
            for op in Operation::ALL {
                assert!(table_a.hooks(phase, op).is_empty());
            }
        }
    }

    #[test]
    fn options_read_from_vars() {
        let vars: HashMap<&str, &str> = [(PAGINATION_ENV, r#"{"itemsPerPage": 10}"#), (BODY_LIMIT_ENV, "2048")]
            .into_iter()
            .collect();
        let options = options_from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(options.pagination, Some(Pagination::enabled(10)));
        assert_eq!(options.body_limit, Some(2048));

        let options = options_from_vars(|_| None).unwrap();
        assert!(options.pagination.is_none());

        let err = options_from_vars(|k| (k == BODY_LIMIT_ENV).then(|| "lots".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
