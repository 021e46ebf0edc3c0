//! Router configuration as supplied by the caller, and its merge over defaults.

use crate::model::Model;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_ITEMS_PER_PAGE: u32 = 50;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Collection pagination. JSON form: `false`, `true`, or `{ "itemsPerPage": n }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pagination {
    Disabled,
    Enabled { items_per_page: Option<u32> },
}

impl Pagination {
    pub fn enabled(items_per_page: u32) -> Self {
        Pagination::Enabled {
            items_per_page: Some(items_per_page),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Pagination::Enabled { .. })
    }

    /// Page size used when the request gives none; `None` when pagination is off.
    pub fn default_size(&self) -> Option<u32> {
        match self {
            Pagination::Disabled => None,
            Pagination::Enabled { items_per_page } => Some(items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE)),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::enabled(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl<'de> Deserialize<'de> for Pagination {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(Pagination::Disabled),
            serde_json::Value::Bool(true) => Ok(Pagination::Enabled { items_per_page: None }),
            serde_json::Value::Object(obj) => {
                let raw = obj.get("itemsPerPage").or_else(|| obj.get("items_per_page"));
                let items_per_page = match raw {
                    None | Some(serde_json::Value::Null) => None,
                    Some(n) => {
                        let n = n.as_u64().ok_or_else(|| {
                            D::Error::custom(format!("itemsPerPage must be a positive integer; got {}", n))
                        })?;
                        let n = u32::try_from(n)
                            .map_err(|_| D::Error::custom(format!("itemsPerPage too large: {}", n)))?;
                        Some(n)
                    }
                };
                Ok(Pagination::Enabled { items_per_page })
            }
            other => Err(D::Error::custom(format!(
                "pagination must be false or {{ \"itemsPerPage\": n }}; got {}",
                other
            ))),
        }
    }
}

/// A resource given with explicit names. Missing names are derived from the model.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub model: Arc<dyn Model>,
    pub collection_name: Option<String>,
    pub item_name: Option<String>,
    pub identifier: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(model: Arc<dyn Model>) -> Self {
        ResourceDescriptor {
            model,
            collection_name: None,
            item_name: None,
            identifier: None,
        }
    }

    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    pub fn item_name(mut self, name: impl Into<String>) -> Self {
        self.item_name = Some(name.into());
        self
    }

    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = Some(field.into());
        self
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("model", &self.model.name())
            .field("collection_name", &self.collection_name)
            .field("item_name", &self.item_name)
            .field("identifier", &self.identifier)
            .finish()
    }
}

/// One entry of `resources`: a bare model or a descriptor.
#[derive(Clone, Debug)]
pub enum ResourceConfig {
    Model(ModelRef),
    Descriptor(ResourceDescriptor),
}

/// Shared model handle with a readable `Debug`.
#[derive(Clone)]
pub struct ModelRef(pub Arc<dyn Model>);

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.0.name()).finish()
    }
}

impl<M: Model> From<Arc<M>> for ResourceConfig {
    fn from(model: Arc<M>) -> Self {
        ResourceConfig::Model(ModelRef(model))
    }
}

impl From<ResourceDescriptor> for ResourceConfig {
    fn from(descriptor: ResourceDescriptor) -> Self {
        ResourceConfig::Descriptor(descriptor)
    }
}

/// Caller-supplied options; every present field replaces the default wholesale.
#[derive(Clone, Debug, Default)]
pub struct RouterOptions {
    pub pagination: Option<Pagination>,
    pub resources: Option<Vec<ResourceConfig>>,
    pub body_limit: Option<usize>,
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn resources(mut self, resources: Vec<ResourceConfig>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Append one resource, starting the list if none was set.
    pub fn resource(mut self, resource: impl Into<ResourceConfig>) -> Self {
        self.resources.get_or_insert_with(Vec::new).push(resource.into());
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }
}

/// Effective configuration after merging options over defaults.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub pagination: Pagination,
    /// `None`: no generated routes.
    pub resources: Option<Vec<ResourceConfig>>,
    pub body_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            pagination: Pagination::default(),
            resources: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RouterConfig {
    /// Shallow merge: fields present in `options` override, others keep their current value.
    pub fn merge(self, options: RouterOptions) -> Self {
        RouterConfig {
            pagination: options.pagination.unwrap_or(self.pagination),
            resources: options.resources.or(self.resources),
            body_limit: options.body_limit.unwrap_or(self.body_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;

    #[test]
    fn pagination_from_json() {
        let p: Pagination = serde_json::from_str("false").unwrap();
        assert_eq!(p, Pagination::Disabled);
        let p: Pagination = serde_json::from_str(r#"{"itemsPerPage": 20}"#).unwrap();
        assert_eq!(p, Pagination::enabled(20));
        assert_eq!(p.default_size(), Some(20));
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.default_size(), Some(DEFAULT_ITEMS_PER_PAGE));
        assert!(serde_json::from_str::<Pagination>(r#"{"itemsPerPage": "x"}"#).is_err());
        assert!(serde_json::from_str::<Pagination>("12").is_err());
    }

    #[test]
    fn merge_replaces_only_present_fields() {
        let merged = RouterConfig::default().merge(RouterOptions::new().pagination(Pagination::Disabled));
        assert_eq!(merged.pagination, Pagination::Disabled);
        assert!(merged.resources.is_none());
        assert_eq!(merged.body_limit, DEFAULT_BODY_LIMIT);

        let merged = RouterConfig::default().merge(RouterOptions::new().resource(Arc::new(MemoryModel::new("Book"))));
        assert_eq!(merged.pagination, Pagination::default());
        assert_eq!(merged.resources.map(|r| r.len()), Some(1));
    }
}
