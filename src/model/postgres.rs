//! PostgreSQL-backed model over one table.

use super::{item_id, Criteria, FetchQuery, Model};
use crate::error::AppError;
use crate::sql::{self, Include, IncludeDirection, PgBindValue, QueryBuf, TableSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::PgPool;

pub struct PgModel {
    pool: PgPool,
    name: String,
    spec: TableSpec,
    includes: Vec<Include>,
}

impl PgModel {
    /// Model `name` stored in `table`, keyed by `id`.
    pub fn new(pool: PgPool, name: impl Into<String>, table: impl Into<String>) -> Self {
        PgModel {
            pool,
            name: name.into(),
            spec: TableSpec::new(table, "id"),
            includes: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.spec.schema = Some(schema.into());
        self
    }

    pub fn with_id_attribute(mut self, column: impl Into<String>) -> Self {
        self.spec.id_column = column.into();
        self
    }

    /// Cast parameters bound to `column` (e.g. "bigint", "uuid", "timestamptz").
    /// Without a type, lookups compare the column as text and written values are sent uncast.
    pub fn with_column_type(mut self, column: impl Into<String>, pg_type: impl Into<String>) -> Self {
        self.spec.column_types.insert(column.into(), pg_type.into());
        self
    }

    /// Fill in the type of every column not set with [`PgModel::with_column_type`] from the
    /// catalog, so inserted and updated values (including nulls) are cast to the column type.
    pub async fn with_catalog_types(mut self) -> Result<Self, AppError> {
        let q = sql::describe_columns(&self.spec);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, (String, String)>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let columns = query.fetch_all(&self.pool).await?;
        if columns.is_empty() {
            return Err(AppError::Persistence(format!("table {} has no columns", self.spec.table)));
        }
        for (column, pg_type) in columns {
            self.spec.column_types.entry(column).or_insert(pg_type);
        }
        Ok(self)
    }

    /// Expandable relation `name`: rows of `related` joined on `our_key = their_key`.
    pub fn with_relation(
        mut self,
        name: impl Into<String>,
        direction: IncludeDirection,
        related: TableSpec,
        our_key: impl Into<String>,
        their_key: impl Into<String>,
    ) -> Self {
        self.includes.push(Include {
            name: name.into(),
            direction,
            related,
            our_key: our_key.into(),
            their_key: their_key.into(),
        });
        self
    }

    fn resolve_includes(&self, names: &[String]) -> Result<Vec<&Include>, AppError> {
        names
            .iter()
            .map(|name| {
                self.includes
                    .iter()
                    .find(|inc| &inc.name == name)
                    .ok_or_else(|| AppError::BadRequest(format!("{} has no relation '{}'", self.name, name)))
            })
            .collect()
    }

    fn bind_all<'q>(
        q: &'q QueryBuf,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = Self::bind_all(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn query_optional(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = Self::bind_all(q).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

#[async_trait]
impl Model for PgModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn id_attribute(&self) -> &str {
        &self.spec.id_column
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64, AppError> {
        let q = sql::count(&self.spec, criteria);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn fetch_all(&self, query: &FetchQuery) -> Result<Vec<Value>, AppError> {
        let includes = self.resolve_includes(&query.with_related)?;
        let q = sql::select_list_with_includes(&self.spec, query, &includes);
        self.query_many(&q).await
    }

    async fn fetch_one(&self, criteria: &Criteria) -> Result<Option<Value>, AppError> {
        let q = sql::select_one(&self.spec, criteria);
        self.query_optional(&q).await
    }

    async fn create(&self, attributes: Map<String, Value>) -> Result<Value, AppError> {
        let q = sql::insert(&self.spec, &attributes);
        self.query_optional(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, item: &Value, attributes: Map<String, Value>) -> Result<Value, AppError> {
        let id = item_id(item, &self.spec.id_column)?;
        let q = sql::update(&self.spec, id, &attributes);
        self.query_optional(&q)
            .await?
            .ok_or_else(|| AppError::Persistence("no rows updated".into()))
    }

    async fn destroy(&self, item: &Value) -> Result<(), AppError> {
        let id = item_id(item, &self.spec.id_column)?;
        let q = sql::delete(&self.spec, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = Self::bind_all(&q).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Persistence("no rows deleted".into()));
        }
        Ok(())
    }
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode one cell by trying the column types an entity table commonly uses.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
