//! In-process model: rows kept in a mutex-guarded vector.
//!
//! Records per-operation call counts and the last fetch query, and can be told
//! to fail a given operation, so endpoint behavior can be asserted without a database.

use super::{item_id, Criteria, FetchQuery, Model};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    Count,
    FetchAll,
    FetchOne,
    Create,
    Update,
    Destroy,
}

/// Number of times each operation was invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub count: usize,
    pub fetch_all: usize,
    pub fetch_one: usize,
    pub create: usize,
    pub update: usize,
    pub destroy: usize,
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<Map<String, Value>>,
    next_id: i64,
    calls: CallCounts,
    failures: HashMap<MemoryOp, String>,
    last_fetch: Option<FetchQuery>,
}

/// `name` expands to rows of `related` whose `foreign_key` equals this row's id.
struct MemoryRelation {
    name: String,
    related: Arc<MemoryModel>,
    foreign_key: String,
}

pub struct MemoryModel {
    name: String,
    id_attribute: String,
    relations: Vec<MemoryRelation>,
    state: Mutex<MemoryState>,
}

impl MemoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryModel {
            name: name.into(),
            id_attribute: "id".into(),
            relations: Vec::new(),
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    pub fn with_id_attribute(mut self, field: impl Into<String>) -> Self {
        self.id_attribute = field.into();
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, related: Arc<MemoryModel>, foreign_key: impl Into<String>) -> Self {
        self.relations.push(MemoryRelation {
            name: name.into(),
            related,
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// Store a row directly (no call is counted). Assigns an id when absent.
    /// Returns `Null` when the row cannot be stored (its id leaves no room for another).
    pub fn insert(&self, row: Value) -> Value {
        let attributes = match row {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        let mut state = self.lock();
        match self.store(&mut state, attributes) {
            Ok(stored) => Value::Object(stored),
            Err(_) => Value::Null,
        }
    }

    pub fn rows(&self) -> Vec<Value> {
        self.lock().rows.iter().cloned().map(Value::Object).collect()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn last_fetch(&self) -> Option<FetchQuery> {
        self.lock().last_fetch.clone()
    }

    /// Make every later call of `op` fail with `message`.
    pub fn fail_on(&self, op: MemoryOp, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, then fail if `op` was set up to.
    fn begin(&self, op: MemoryOp) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        let mut state = self.lock();
        let calls = &mut state.calls;
        match op {
            MemoryOp::Count => calls.count += 1,
            MemoryOp::FetchAll => calls.fetch_all += 1,
            MemoryOp::FetchOne => calls.fetch_one += 1,
            MemoryOp::Create => calls.create += 1,
            MemoryOp::Update => calls.update += 1,
            MemoryOp::Destroy => calls.destroy += 1,
        }
        if let Some(message) = state.failures.get(&op) {
            return Err(AppError::Persistence(message.clone()));
        }
        Ok(state)
    }

    fn store(&self, state: &mut MemoryState, mut attributes: Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        match attributes.get(&self.id_attribute).and_then(Value::as_i64) {
            Some(n) => {
                let next = n
                    .checked_add(1)
                    .ok_or_else(|| AppError::Persistence(format!("{} {} is out of range", self.id_attribute, n)))?;
                state.next_id = state.next_id.max(next);
            }
            None if !attributes.contains_key(&self.id_attribute) => {
                attributes.insert(self.id_attribute.clone(), Value::from(state.next_id));
                state.next_id += 1;
            }
            None => {}
        }
        state.rows.push(attributes.clone());
        Ok(attributes)
    }

    fn position(&self, state: &MemoryState, id: &Value) -> Option<usize> {
        state
            .rows
            .iter()
            .position(|r| r.get(&self.id_attribute).map(|v| loose_eq(v, id)).unwrap_or(false))
    }

    fn expand(&self, rows: &mut [Map<String, Value>], with_related: &[String]) -> Result<(), AppError> {
        for name in with_related {
            let relation = self
                .relations
                .iter()
                .find(|r| &r.name == name)
                .ok_or_else(|| AppError::BadRequest(format!("{} has no relation '{}'", self.name, name)))?;
            let related = relation.related.rows();
            for row in rows.iter_mut() {
                let Some(id) = row.get(&self.id_attribute).cloned() else { continue };
                let children: Vec<Value> = related
                    .iter()
                    .filter(|r| r.get(&relation.foreign_key).map(|v| loose_eq(v, &id)).unwrap_or(false))
                    .cloned()
                    .collect();
                row.insert(name.clone(), Value::Array(children));
            }
        }
        Ok(())
    }
}

fn matches(row: &Map<String, Value>, criteria: &Criteria) -> bool {
    criteria
        .iter()
        .all(|(field, expected)| row.get(field).map(|v| loose_eq(v, expected)).unwrap_or(false))
}

/// Equality that lets a path segment ("42") match a stored number (42).
fn loose_eq(stored: &Value, given: &Value) -> bool {
    match (stored, given) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => s == &b.to_string(),
        _ => stored == given,
    }
}

fn rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Ascending order: missing/null first, then booleans, numbers, strings.
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64, AppError> {
        let state = self.begin(MemoryOp::Count)?;
        Ok(state.rows.iter().filter(|r| matches(r, criteria)).count() as u64)
    }

    async fn fetch_all(&self, query: &FetchQuery) -> Result<Vec<Value>, AppError> {
        let mut rows: Vec<Map<String, Value>> = {
            let mut state = self.begin(MemoryOp::FetchAll)?;
            state.last_fetch = Some(query.clone());
            state.rows.iter().filter(|r| matches(r, &query.criteria)).cloned().collect()
        };
        rows.sort_by(|a, b| compare_field(a.get(&query.order_by), b.get(&query.order_by)));
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        let mut page: Vec<Map<String, Value>> = rows.into_iter().skip(offset).take(limit).collect();
        self.expand(&mut page, &query.with_related)?;
        Ok(page.into_iter().map(Value::Object).collect())
    }

    async fn fetch_one(&self, criteria: &Criteria) -> Result<Option<Value>, AppError> {
        let state = self.begin(MemoryOp::FetchOne)?;
        Ok(state
            .rows
            .iter()
            .find(|r| matches(r, criteria))
            .cloned()
            .map(Value::Object))
    }

    async fn create(&self, attributes: Map<String, Value>) -> Result<Value, AppError> {
        let mut state = self.begin(MemoryOp::Create)?;
        self.store(&mut state, attributes).map(Value::Object)
    }

    async fn update(&self, item: &Value, attributes: Map<String, Value>) -> Result<Value, AppError> {
        let id = item_id(item, &self.id_attribute)?.clone();
        let mut state = self.begin(MemoryOp::Update)?;
        let idx = self
            .position(&state, &id)
            .ok_or_else(|| AppError::Persistence("no rows updated".into()))?;
        let row = &mut state.rows[idx];
        for (k, v) in attributes {
            if k == self.id_attribute {
                continue;
            }
            row.insert(k, v);
        }
        Ok(Value::Object(row.clone()))
    }

    async fn destroy(&self, item: &Value) -> Result<(), AppError> {
        let id = item_id(item, &self.id_attribute)?.clone();
        let mut state = self.begin(MemoryOp::Destroy)?;
        let idx = self
            .position(&state, &id)
            .ok_or_else(|| AppError::Persistence("no rows deleted".into()))?;
        state.rows.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let model = MemoryModel::new("Book");
        let a = model.create(obj(json!({"name": "A"}))).await.unwrap();
        let b = model.create(obj(json!({"name": "B"}))).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert_eq!(model.calls().create, 2);
    }

    #[tokio::test]
    async fn fetch_all_sorts_pages_and_expands() {
        let authors = Arc::new(MemoryModel::new("Author"));
        let books = MemoryModel::new("Book").with_relation("authors", authors.clone(), "book_id");
        for name in ["c", "a", "b"] {
            books.insert(json!({ "name": name }));
        }
        authors.insert(json!({"name": "Ann", "book_id": 2}));

        let query = FetchQuery {
            order_by: "name".into(),
            with_related: vec!["authors".into()],
            offset: Some(0),
            limit: Some(2),
            ..FetchQuery::default()
        };
        let rows = books.fetch_all(&query).await.unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(rows[0]["authors"], json!([{"id": 1, "name": "Ann", "book_id": 2}]));
        assert_eq!(rows[1]["authors"], json!([]));
        assert_eq!(books.last_fetch(), Some(query));
    }

    #[tokio::test]
    async fn unknown_relation_is_an_error() {
        let books = MemoryModel::new("Book");
        let query = FetchQuery {
            order_by: "id".into(),
            with_related: vec!["nope".into()],
            ..FetchQuery::default()
        };
        assert!(matches!(books.fetch_all(&query).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn string_identifier_matches_numeric_id() {
        let books = MemoryModel::new("Book");
        books.insert(json!({"name": "A"}));
        let found = books.fetch_one(&Criteria::matching("id", "1")).await.unwrap();
        assert_eq!(found.map(|v| v["name"].clone()), Some(json!("A")));
        assert!(books.fetch_one(&Criteria::matching("id", "2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_and_destroy_locate_by_id() {
        let books = MemoryModel::new("Book");
        let item = books.insert(json!({"name": "A"}));
        let updated = books.update(&item, obj(json!({"name": "B"}))).await.unwrap();
        assert_eq!(updated["name"], json!("B"));
        books.destroy(&item).await.unwrap();
        assert!(books.rows().is_empty());
        assert!(matches!(books.destroy(&item).await, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn update_keeps_the_identifier() {
        let books = MemoryModel::new("Book");
        let item = books.insert(json!({"name": "A"}));
        let updated = books.update(&item, obj(json!({"id": 2, "name": "B"}))).await.unwrap();
        assert_eq!(updated, json!({"id": 1, "name": "B"}));
        let next = books.create(obj(json!({"name": "C"}))).await.unwrap();
        assert_eq!(next["id"], json!(2));
    }

    #[tokio::test]
    async fn largest_id_is_rejected_not_overflowed() {
        let books = MemoryModel::new("Book");
        let err = books.create(obj(json!({"id": i64::MAX}))).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert!(books.rows().is_empty());
        let stored = books.create(obj(json!({"id": i64::MAX - 1}))).await.unwrap();
        assert_eq!(stored["id"], json!(i64::MAX - 1));
    }

    #[tokio::test]
    async fn injected_failure_is_counted_and_returned() {
        let books = MemoryModel::new("Book");
        books.fail_on(MemoryOp::Count, "boom");
        let err = books.count(&Criteria::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(ref m) if m == "boom"));
        assert_eq!(books.calls().count, 1);
        books.clear_failures();
        assert_eq!(books.count(&Criteria::new()).await.unwrap(), 0);
    }
}
