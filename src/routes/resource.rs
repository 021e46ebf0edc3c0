//! CRUD routes for one resource: `/{collection}` and `/{collection}/:identifier`.

use crate::config::{Pagination, Resource};
use crate::handlers::resource::{create, delete as delete_handler, list, read, update};
use crate::state::ResourceState;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn resource_routes(resource: Arc<Resource>, pagination: Pagination) -> Router {
    let collection_path = resource.collection_path();
    let item_path = resource.item_path();
    Router::new()
        .route(&collection_path, get(list).post(create))
        .route(&item_path, get(read).put(update).delete(delete_handler))
        .with_state(ResourceState { resource, pagination })
}
