//! Builds parameterized COUNT, SELECT, INSERT, UPDATE, DELETE for one table.
//! Identifiers are always quoted; values are always positional parameters.

use crate::model::{Criteria, FetchQuery};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Direction of a related-include: to_one (we hold the key to them) or to_many (they hold a key to us).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeDirection {
    ToOne,
    ToMany,
}

/// Table addressed by the builder.
#[derive(Clone, Debug)]
pub struct TableSpec {
    pub schema: Option<String>,
    pub table: String,
    pub id_column: String,
    /// PostgreSQL type per column, used to cast bound parameters (e.g. "bigint", "timestamptz").
    pub column_types: HashMap<String, String>,
}

impl TableSpec {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        TableSpec {
            schema: None,
            table: table.into(),
            id_column: id_column.into(),
            column_types: HashMap::new(),
        }
    }

    fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quoted(schema), quoted(&self.table)),
            None => quoted(&self.table),
        }
    }

    /// `$n`, with a cast when the column type is known.
    fn placeholder(&self, column: &str, n: u32) -> String {
        self.column_types
            .get(column)
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }

    /// `lhs = $n`. Columns of unknown type are compared as text on both sides,
    /// so a path segment still matches an integer or uuid key.
    fn equals(&self, lhs: &str, column: &str, n: u32) -> String {
        if self.column_types.contains_key(column) {
            format!("{} = {}", lhs, self.placeholder(column, n))
        } else {
            format!("{}::text = ${}::text", lhs, n)
        }
    }
}

/// One expandable relation: API name, direction, related table, our key column, their key column.
#[derive(Clone, Debug)]
pub struct Include {
    pub name: String,
    pub direction: IncludeDirection,
    pub related: TableSpec,
    pub our_key: String,
    pub their_key: String,
}

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// " WHERE a = $1 AND b = $2", or empty. `alias` prefixes each column.
fn where_clause(q: &mut QueryBuf, spec: &TableSpec, criteria: &Criteria, alias: Option<&str>) -> String {
    let parts: Vec<String> = criteria
        .iter()
        .map(|(col, val)| {
            let n = q.push_param(val.clone());
            let lhs = match alias {
                Some(a) => format!("{}.{}", a, quoted(col)),
                None => quoted(col),
            };
            spec.equals(&lhs, col, n)
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT COUNT(*) of rows matching criteria.
pub fn count(spec: &TableSpec, criteria: &Criteria) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, spec, criteria, None);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", spec.qualified(), where_sql);
    q
}

/// SELECT list: main table aliased as "main", each include as a scalar subquery
/// (json_agg for to_many, row_to_json for to_one), ORDER BY ascending, optional LIMIT/OFFSET.
pub fn select_list_with_includes(spec: &TableSpec, query: &FetchQuery, includes: &[&Include]) -> QueryBuf {
    const MAIN_ALIAS: &str = "main";
    let mut q = QueryBuf::new();

    let mut select_parts = vec![format!("{}.*", MAIN_ALIAS)];
    for inc in includes {
        let sub_from = format!(
            "{} WHERE {} = {}.{}",
            inc.related.qualified(),
            quoted(&inc.their_key),
            MAIN_ALIAS,
            quoted(&inc.our_key)
        );
        let subquery = match inc.direction {
            IncludeDirection::ToOne => format!(
                "(SELECT row_to_json(sub) FROM (SELECT * FROM {} LIMIT 1) sub)",
                sub_from
            ),
            IncludeDirection::ToMany => format!(
                "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT * FROM {}) sub)",
                sub_from
            ),
        };
        select_parts.push(format!("{} AS {}", subquery, quoted(&inc.name)));
    }

    let where_sql = where_clause(&mut q, spec, &query.criteria, Some(MAIN_ALIAS));
    let order_clause = format!(" ORDER BY {}.{} ASC", MAIN_ALIAS, quoted(&query.order_by));
    let limit_clause = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = query.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();

    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}{}",
        select_parts.join(", "),
        spec.qualified(),
        MAIN_ALIAS,
        where_sql,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// First row matching criteria.
pub fn select_one(spec: &TableSpec, criteria: &Criteria) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, spec, criteria, None);
    q.sql = format!("SELECT * FROM {}{} LIMIT 1", spec.qualified(), where_sql);
    q
}

/// INSERT the given attributes; `DEFAULT VALUES` when there are none.
pub fn insert(spec: &TableSpec, attributes: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    if attributes.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING *", spec.qualified());
        return q;
    }
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (name, val) in attributes {
        let n = q.push_param(val.clone());
        cols.push(quoted(name));
        placeholders.push(spec.placeholder(name, n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        spec.qualified(),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by id, SET only the given attributes (the id column itself is skipped).
/// With nothing to set, re-selects the row instead.
pub fn update(spec: &TableSpec, id: &Value, attributes: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in attributes {
        if *k == spec.id_column {
            continue;
        }
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(k), spec.placeholder(k, n)));
    }
    let id_param = q.push_param(id.clone());
    let id_match = spec.equals(&quoted(&spec.id_column), &spec.id_column, id_param);
    if sets.is_empty() {
        q.sql = format!("SELECT * FROM {} WHERE {}", spec.qualified(), id_match);
        return q;
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING *",
        spec.qualified(),
        sets.join(", "),
        id_match
    );
    q
}

/// DELETE by id.
pub fn delete(spec: &TableSpec, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {}",
        spec.qualified(),
        spec.equals(&quoted(&spec.id_column), &spec.id_column, n)
    );
    q
}

/// Name and declared type of every live column of the table.
pub fn describe_columns(spec: &TableSpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(spec.qualified()));
    q.sql = format!(
        "SELECT a.attname::text, format_type(a.atttypid, a.atttypmod) FROM pg_catalog.pg_attribute a \
         WHERE a.attrelid = ${}::regclass AND a.attnum > 0 AND NOT a.attisdropped ORDER BY a.attnum",
        n
    );
    q
}
