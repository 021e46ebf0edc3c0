//! `init`: compile resource declarations into one router plus its hook setters.

use crate::config::{normalize, validate, validate_resources, Pagination, Resource, RouterConfig, RouterOptions};
use crate::error::{AppError, ConfigError};
use crate::hooks::{HookRegistrar, ResourceHooks};
use crate::routes::resource_routes;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// The assembled router together with the resources it serves.
///
/// Hooks may be registered at any time; handlers read the current hook lists on every request.
#[derive(Clone, Debug)]
pub struct ResourceRouter {
    router: Router,
    pagination: Pagination,
    resources: Vec<Arc<Resource>>,
    setters: HashMap<String, HookRegistrar>,
}

impl ResourceRouter {
    /// Router to merge or nest into an application.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }

    pub fn resource(&self, collection_name: &str) -> Option<&Arc<Resource>> {
        self.resources.iter().find(|r| r.collection_name == collection_name)
    }

    /// Typed setters for the resource mounted at `/{collection_name}`.
    pub fn hooks(&self, collection_name: &str) -> Option<ResourceHooks> {
        self.resource(collection_name).map(|r| ResourceHooks::new(Arc::clone(r)))
    }

    /// Setter by conventional name, e.g. "beforeGetBooks" or "afterDeleteBook".
    pub fn hook_setter(&self, name: &str) -> Result<&HookRegistrar, AppError> {
        self.setters
            .get(name)
            .ok_or_else(|| AppError::InvalidArgument(format!("no hook setter named '{}'", name)))
    }

    /// Every setter name, sorted.
    pub fn hook_setter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.setters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Merge `options` over the defaults, then mount every declared resource.
/// Each call builds an independent router; nothing is shared between calls.
pub fn init(options: RouterOptions) -> Result<ResourceRouter, ConfigError> {
    let config = RouterConfig::default().merge(options);
    validate(&config)?;

    let resources: Vec<Arc<Resource>> = config
        .resources
        .unwrap_or_default()
        .into_iter()
        .map(|rc| Arc::new(normalize(rc)))
        .collect();
    validate_resources(&resources)?;

    let mut router = Router::new();
    let mut setters = HashMap::new();
    for resource in &resources {
        router = router.merge(resource_routes(Arc::clone(resource), config.pagination));
        for registrar in ResourceHooks::new(Arc::clone(resource)).registrars() {
            let name = registrar.name().to_string();
            if setters.insert(name.clone(), registrar).is_some() {
                return Err(ConfigError::Validation(format!("duplicate hook setter name: {}", name)));
            }
        }
        tracing::info!(
            collection = %resource.collection_name,
            identifier = %resource.identifier,
            model = resource.model.name(),
            "resource mounted"
        );
    }

    Ok(ResourceRouter {
        router: router.layer(RequestBodyLimitLayer::new(config.body_limit)),
        pagination: config.pagination,
        resources,
        setters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceDescriptor;
    use crate::model::MemoryModel;

    #[test]
    fn no_resources_means_no_setters() {
        let router = init(RouterOptions::new()).unwrap();
        assert!(router.resources().is_empty());
        assert!(router.hook_setter_names().is_empty());
        assert_eq!(router.pagination(), Pagination::default());
    }

    #[test]
    fn ten_setters_per_resource() {
        let router = init(
            RouterOptions::new()
                .resource(Arc::new(MemoryModel::new("Book")))
                .resource(
                    ResourceDescriptor::new(Arc::new(MemoryModel::new("Person")))
                        .collection_name("people")
                        .item_name("person"),
                ),
        )
        .unwrap();
        let names = router.hook_setter_names();
        assert_eq!(names.len(), 20);
        assert!(names.contains(&"beforeGetBooks"));
        assert!(names.contains(&"afterGetPeople"));
        assert!(names.contains(&"beforeDeletePerson"));
        assert!(router.hooks("people").is_some());
        assert!(router.hooks("persons").is_none());
    }

    #[test]
    fn unknown_setter_is_invalid_argument_and_mutates_nothing() {
        let router = init(RouterOptions::new().resource(Arc::new(MemoryModel::new("Book")))).unwrap();
        let err = router.hook_setter("beforeFrobnicateBook").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        let table = router.resource("books").unwrap().hooks.read().unwrap();
        assert!(table.phase(crate::hooks::Phase::Before).values().all(Vec::is_empty));
        assert!(table.phase(crate::hooks::Phase::After).values().all(Vec::is_empty));
    }

    #[test]
    fn colliding_item_names_rejected() {
        let result = init(
            RouterOptions::new()
                .resource(Arc::new(MemoryModel::new("Book")))
                .resource(
                    ResourceDescriptor::new(Arc::new(MemoryModel::new("Book")))
                        .collection_name("archive"),
                ),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_items_per_page_rejected() {
        let result = init(RouterOptions::new().pagination(Pagination::enabled(0)));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
