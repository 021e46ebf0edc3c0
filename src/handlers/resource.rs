//! Generated endpoint handlers: list, read, create, update, delete.

use crate::config::Pagination;
use crate::error::AppError;
use crate::hooks::{exec_hooks, HookArgs, Operation, Phase};
use crate::model::{Criteria, FetchQuery};
use crate::response::{item_created, item_ok, Listing, PageInfo};
use crate::state::ResourceState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Collection query parameters after defaults are applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListParams {
    /// Set only when pagination is enabled.
    pub page: Option<PageInfo>,
    pub sort: String,
    pub expand: Vec<String>,
}

impl ListParams {
    pub fn offset(&self) -> Option<u64> {
        self.page.map(|p| (p.page - 1) * p.size)
    }

    pub fn limit(&self) -> Option<u64> {
        self.page.map(|p| p.size)
    }
}

fn query_param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Largest page, size or offset a store can be asked for (PostgreSQL bigint).
const MAX_WINDOW: u64 = i64::MAX as u64;

fn positive(params: &HashMap<String, String>, key: &str) -> Result<Option<u64>, AppError> {
    match query_param(params, key) {
        None => Ok(None),
        Some(s) => match s.parse::<u64>() {
            Ok(n) if n > 0 && n <= MAX_WINDOW => Ok(Some(n)),
            _ => Err(AppError::BadRequest(format!(
                "{} must be an integer between 1 and {}",
                key, MAX_WINDOW
            ))),
        },
    }
}

/// page: query or 1; size: query, else configured page size (only when paginating).
/// sort: query or the identifier field. expand: comma-separated relation names.
pub fn resolve_list_params(
    params: &HashMap<String, String>,
    pagination: &Pagination,
    identifier: &str,
) -> Result<ListParams, AppError> {
    let page = match pagination.default_size() {
        None => None,
        Some(default_size) => {
            let page = positive(params, "page")?.unwrap_or(1);
            let size = positive(params, "size")?.unwrap_or(u64::from(default_size));
            let offset = (page - 1).checked_mul(size);
            if offset.map_or(true, |n| n > MAX_WINDOW) {
                return Err(AppError::BadRequest("page out of range".into()));
            }
            Some(PageInfo { page, size })
        }
    };
    let sort = query_param(params, "sort").unwrap_or(identifier).to_string();
    let expand = query_param(params, "expand")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    Ok(ListParams { page, sort, expand })
}

fn body_to_map(value: &Value) -> Result<Map<String, Value>, AppError> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| AppError::BadRequest("body must be a JSON object".into()))
}

fn not_found(state: &ResourceState, identifier: &str) -> AppError {
    AppError::NotFound(format!("{}/{}", state.resource.collection_name, identifier))
}

pub async fn list(
    State(state): State<ResourceState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    exec_hooks(
        resource,
        Phase::Before,
        Operation::GetCollection,
        HookArgs {
            query: Some(&params),
            ..HookArgs::default()
        },
    );

    let list_params = resolve_list_params(&params, &state.pagination, &resource.identifier)?;
    tracing::debug!(resource = %resource.collection_name, params = ?list_params, "list");

    // Filtering from query parameters is not supported; every listing matches all rows.
    let criteria = Criteria::new();
    let fetch = FetchQuery {
        criteria: criteria.clone(),
        order_by: list_params.sort.clone(),
        with_related: list_params.expand.clone(),
        offset: list_params.offset(),
        limit: list_params.limit(),
    };
    // Both run to completion even if one fails.
    let (total, items) = tokio::join!(resource.model.count(&criteria), resource.model.fetch_all(&fetch));
    let total = total?;
    let items = Value::Array(items?);

    exec_hooks(
        resource,
        Phase::After,
        Operation::GetCollection,
        HookArgs {
            query: Some(&params),
            result: Some(&items),
            ..HookArgs::default()
        },
    );

    Ok(Listing {
        items,
        total,
        page: list_params.page,
    })
}

pub async fn read(
    State(state): State<ResourceState>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let args = HookArgs {
        identifier: Some(&identifier),
        ..HookArgs::default()
    };
    exec_hooks(resource, Phase::Before, Operation::GetItem, args);
    tracing::debug!(resource = %resource.collection_name, %identifier, "read");

    let criteria = Criteria::matching(resource.identifier.as_str(), identifier.as_str());
    let item = resource
        .model
        .fetch_one(&criteria)
        .await?
        .ok_or_else(|| not_found(&state, &identifier))?;

    exec_hooks(
        resource,
        Phase::After,
        Operation::GetItem,
        HookArgs {
            result: Some(&item),
            ..args
        },
    );
    Ok(item_ok(item))
}

pub async fn create(
    State(state): State<ResourceState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let args = HookArgs {
        body: Some(&body),
        ..HookArgs::default()
    };
    exec_hooks(resource, Phase::Before, Operation::CreateItem, args);
    tracing::debug!(resource = %resource.collection_name, "create");

    let attributes = body_to_map(&body)?;
    let item = resource.model.create(attributes).await?;

    exec_hooks(
        resource,
        Phase::After,
        Operation::CreateItem,
        HookArgs {
            result: Some(&item),
            ..args
        },
    );
    Ok(item_created(item))
}

pub async fn update(
    State(state): State<ResourceState>,
    Path(identifier): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let args = HookArgs {
        identifier: Some(&identifier),
        body: Some(&body),
        ..HookArgs::default()
    };
    exec_hooks(resource, Phase::Before, Operation::UpdateItem, args);
    tracing::debug!(resource = %resource.collection_name, %identifier, "update");

    let attributes = body_to_map(&body)?;
    let criteria = Criteria::matching(resource.identifier.as_str(), identifier.as_str());
    let existing = resource
        .model
        .fetch_one(&criteria)
        .await?
        .ok_or_else(|| not_found(&state, &identifier))?;
    let item = resource.model.update(&existing, attributes).await?;

    exec_hooks(
        resource,
        Phase::After,
        Operation::UpdateItem,
        HookArgs {
            result: Some(&item),
            ..args
        },
    );
    Ok(item_ok(item))
}

pub async fn delete(
    State(state): State<ResourceState>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let args = HookArgs {
        identifier: Some(&identifier),
        ..HookArgs::default()
    };
    exec_hooks(resource, Phase::Before, Operation::DeleteItem, args);
    tracing::debug!(resource = %resource.collection_name, %identifier, "delete");

    let criteria = Criteria::matching(resource.identifier.as_str(), identifier.as_str());
    let item = resource
        .model
        .fetch_one(&criteria)
        .await?
        .ok_or_else(|| not_found(&state, &identifier))?;
    resource.model.destroy(&item).await?;

    exec_hooks(
        resource,
        Phase::After,
        Operation::DeleteItem,
        HookArgs {
            result: Some(&item),
            ..args
        },
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_query_is_empty() {
        let p = resolve_list_params(&query(&[]), &Pagination::default(), "id").unwrap();
        assert_eq!(p.page, Some(PageInfo { page: 1, size: 50 }));
        assert_eq!(p.sort, "id");
        assert!(p.expand.is_empty());
        assert_eq!(p.offset(), Some(0));
        assert_eq!(p.limit(), Some(50));
    }

    #[test]
    fn configured_size_then_query_size() {
        let pagination = Pagination::enabled(20);
        let p = resolve_list_params(&query(&[]), &pagination, "id").unwrap();
        assert_eq!(p.limit(), Some(20));
        let p = resolve_list_params(&query(&[("page", "3"), ("size", "5")]), &pagination, "id").unwrap();
        assert_eq!(p.offset(), Some(10));
        assert_eq!(p.limit(), Some(5));
    }

    #[test]
    fn disabled_pagination_ignores_page_and_size() {
        let p = resolve_list_params(&query(&[("page", "x"), ("size", "2")]), &Pagination::Disabled, "slug").unwrap();
        assert_eq!(p.page, None);
        assert_eq!(p.offset(), None);
        assert_eq!(p.limit(), None);
        assert_eq!(p.sort, "slug");
    }

    #[test]
    fn sort_and_expand_from_query() {
        let p = resolve_list_params(
            &query(&[("sort", "title"), ("expand", "authors, reviews,,")]),
            &Pagination::default(),
            "id",
        )
        .unwrap();
        assert_eq!(p.sort, "title");
        assert_eq!(p.expand, vec!["authors".to_string(), "reviews".to_string()]);
    }

    #[test]
    fn oversized_window_rejected() {
        let too_big = (u64::MAX).to_string();
        for key in ["page", "size"] {
            let err = resolve_list_params(&query(&[(key, too_big.as_str())]), &Pagination::default(), "id")
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        let max = i64::MAX.to_string();
        let p = resolve_list_params(&query(&[("size", max.as_str())]), &Pagination::default(), "id").unwrap();
        assert_eq!(p.limit(), Some(i64::MAX as u64));
        let err = resolve_list_params(&query(&[("page", "3"), ("size", max.as_str())]), &Pagination::default(), "id")
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_positive_page_rejected() {
        for bad in ["0", "-1", "two"] {
            let err = resolve_list_params(&query(&[("page", bad)]), &Pagination::default(), "id").unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }
}
