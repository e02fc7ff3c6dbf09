//! Query builder for the hosted backend.
//!
//! Mirrors the chainable shape of a PostgREST-style client:
//! `from(table).select(cols).eq(col, value).order(col, asc).limit(n)`.
//! A `Query` is a plain value; clients interpret it and the catalog service
//! derives cache keys from it.

use crate::catalog::CatalogEntity;
use serde_json::Value;
use std::cmp::Ordering;

/// Sort instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A select/update target: table, projection, equality filters, order, limit.
///
/// # Example
///
/// ```
/// use delivery_kit::query::Query;
///
/// let query = Query::from("products")
///     .eq("restaurant_id", "r1")
///     .eq("available", true)
///     .order("name", true)
///     .limit(20);
///
/// assert_eq!(query.table(), "products");
/// assert_eq!(query.filters().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    table: String,
    columns: Option<Vec<String>>,
    filters: Vec<(String, Value)>,
    order: Option<OrderBy>,
    limit: Option<usize>,
}

impl Query {
    /// Start a query on `table`, selecting every column.
    pub fn from(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            columns: None,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Start a query on the table of `T`.
    pub fn for_entity<T: CatalogEntity>() -> Self {
        Self::from(T::table())
    }

    /// Query matching the row of `T` whose primary key is `id`.
    pub fn by_id<T: CatalogEntity>(id: &str) -> Self {
        Self::for_entity::<T>().eq(T::primary_key(), id)
    }

    /// Comma-separated projection. `"*"` selects everything.
    pub fn select(mut self, columns: &str) -> Self {
        let columns: Vec<String> = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        self.columns = if columns.is_empty() || columns.iter().any(|c| c == "*") {
            None
        } else {
            Some(columns)
        };
        self
    }

    /// Add an equality filter. Filters are AND-ed.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn order_by(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Does `row` satisfy every filter? Missing columns compare as null.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
    }

    /// Canonical description of the query, independent of filter order.
    ///
    /// ```
    /// use delivery_kit::query::Query;
    ///
    /// let a = Query::from("orders").eq("customer_id", "c1").eq("status", "pending");
    /// let b = Query::from("orders").eq("status", "pending").eq("customer_id", "c1");
    /// assert_eq!(a.fingerprint(), b.fingerprint());
    /// ```
    pub fn fingerprint(&self) -> String {
        let mut parts = Vec::with_capacity(self.filters.len() + 3);

        parts.push(match &self.columns {
            Some(columns) => format!(
                "select={}",
                columns.iter().map(|c| escape(c)).collect::<Vec<_>>().join(",")
            ),
            None => "select=*".to_string(),
        });

        let mut filters: Vec<String> = self
            .filters
            .iter()
            .map(|(column, value)| format!("eq.{}={}", escape(column), value))
            .collect();
        filters.sort();
        parts.extend(filters);

        if let Some(order) = &self.order {
            parts.push(format!(
                "order={}.{}",
                escape(&order.column),
                if order.ascending { "asc" } else { "desc" }
            ));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }

        parts.join(";")
    }

    /// Apply ordering, limit and projection to already-filtered rows.
    pub fn shape(&self, mut rows: Vec<Value>) -> Vec<Value> {
        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        match &self.columns {
            Some(columns) => rows.into_iter().map(|row| project(row, columns)).collect(),
            None => rows,
        }
    }
}

/// Backslash-escape the fingerprint separators in a column name. Filter
/// values need nothing: their JSON form is already self-delimiting.
fn escape(column: &str) -> String {
    let mut escaped = String::with_capacity(column.len());
    for c in column.chars() {
        if matches!(c, '\\' | ';' | '=' | ',' | '.') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn project(row: Value, columns: &[String]) -> Value {
    match row {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| columns.iter().any(|c| c == key))
                .collect(),
        ),
        other => other,
    }
}

/// Postgres-like ordering: nulls sort last ascending (first descending),
/// numbers numerically, strings lexically.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}
