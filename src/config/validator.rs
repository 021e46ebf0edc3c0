//! Config validation: pagination bounds and route naming consistency.

use crate::config::{Pagination, Resource, RouterConfig};
use crate::error::ConfigError;
use std::collections::HashSet;
use std::sync::Arc;

pub fn validate(config: &RouterConfig) -> Result<(), ConfigError> {
    if let Pagination::Enabled {
        items_per_page: Some(0),
    } = config.pagination
    {
        return Err(ConfigError::Validation("itemsPerPage must be greater than 0".into()));
    }
    if config.body_limit == 0 {
        return Err(ConfigError::Validation("body limit must be greater than 0".into()));
    }
    Ok(())
}

/// Collection names become path segments, so they must be usable and unique.
pub fn validate_resources(resources: &[Arc<Resource>]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for r in resources {
        let name = r.collection_name.as_str();
        if name.is_empty() || name.contains('/') || name.starts_with(':') || name.starts_with('*') {
            return Err(ConfigError::Validation(format!("invalid collection name: '{}'", name)));
        }
        if r.identifier.is_empty() {
            return Err(ConfigError::Validation(format!("empty identifier for collection '{}'", name)));
        }
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateCollection(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{normalize, ResourceDescriptor};
    use crate::model::MemoryModel;

    #[test]
    fn zero_page_size_rejected() {
        let config = RouterConfig {
            pagination: Pagination::enabled(0),
            ..RouterConfig::default()
        };
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
        assert!(validate(&RouterConfig::default()).is_ok());
    }

    #[test]
    fn duplicate_collections_rejected() {
        let a = Arc::new(normalize(Arc::new(MemoryModel::new("Book")).into()));
        let b = Arc::new(normalize(
            ResourceDescriptor::new(Arc::new(MemoryModel::new("Novel")))
                .collection_name("books")
                .into(),
        ));
        let err = validate_resources(&[a, b]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCollection(ref n) if n == "books"));
    }

    #[test]
    fn path_like_names_rejected() {
        let r = Arc::new(normalize(
            ResourceDescriptor::new(Arc::new(MemoryModel::new("Book")))
                .collection_name("a/b")
                .into(),
        ));
        assert!(validate_resources(&[r]).is_err());
    }
}
