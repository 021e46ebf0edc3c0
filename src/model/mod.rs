//! Persistence interface used by the generated endpoints, plus two implementations.

mod memory;
mod postgres;

pub use memory::{CallCounts, MemoryModel, MemoryOp};
pub use postgres::PgModel;

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Equality filter: every pair must match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Criteria {
    pairs: Vec<(String, Value)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field criteria, e.g. `{ id: "42" }`.
    pub fn matching(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut c = Self::new();
        c.push(field, value);
        c
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.pairs.push((field.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Ordered, optionally paged fetch with related entities expanded by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchQuery {
    pub criteria: Criteria,
    /// Field sorted ascending.
    pub order_by: String,
    pub with_related: Vec<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// An entity type the router can list, read, create, update and delete.
///
/// Entities travel as JSON objects. `update` and `destroy` receive an item
/// previously returned by `fetch_one` and locate it by [`Model::id_attribute`].
#[async_trait]
pub trait Model: Send + Sync + 'static {
    /// Type name, used to derive default route names ("Book" -> "books").
    fn name(&self) -> &str;

    /// Primary identifier field.
    fn id_attribute(&self) -> &str {
        "id"
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64, AppError>;

    async fn fetch_all(&self, query: &FetchQuery) -> Result<Vec<Value>, AppError>;

    async fn fetch_one(&self, criteria: &Criteria) -> Result<Option<Value>, AppError>;

    /// Construct from `attributes` and persist; returns the stored entity with its identifier.
    async fn create(&self, attributes: Map<String, Value>) -> Result<Value, AppError>;

    async fn update(&self, item: &Value, attributes: Map<String, Value>) -> Result<Value, AppError>;

    async fn destroy(&self, item: &Value) -> Result<(), AppError>;
}

/// Identifier value of a fetched item.
pub(crate) fn item_id<'a>(item: &'a Value, id_attribute: &str) -> Result<&'a Value, AppError> {
    item.get(id_attribute)
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::Persistence(format!("item has no '{}' value", id_attribute)))
}
