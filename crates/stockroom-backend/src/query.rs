//! # Query Builder
//!
//! Table queries with filter and order modifiers, in the shape the hosted
//! backend understands.
//!
//! ## Two Consumers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Query::table("orders")                                                 │
//! │      .eq("status", "pending")                                           │
//! │      .order_by("created_at", false)                                     │
//! │      .limit(20)                                                         │
//! │        │                                                                │
//! │        ├──► to_query_pairs()  (RestBackend)                             │
//! │        │      select=*  status=eq.pending                               │
//! │        │      order=created_at.desc  limit=20                           │
//! │        │                                                                │
//! │        └──► matches(row) / sort(rows)  (MemoryBackend)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ilike` patterns use `%` as the wildcard; the REST encoding swaps it for
//! `*`, which is what the URL syntax expects.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

// =============================================================================
// Filters
// =============================================================================

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive pattern match, `%` wildcard.
    Ilike,
    /// Value is a JSON array; matches any element.
    In,
    /// Column is null.
    IsNull,
}

impl FilterOp {
    fn keyword(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Ilike => "ilike",
            FilterOp::In => "in",
            FilterOp::IsNull => "is",
        }
    }
}

/// One `column op value` condition. All filters of a query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Evaluates the filter against a JSON row.
    pub fn matches(&self, row: &Value) -> bool {
        let cell = row.get(&self.column).unwrap_or(&Value::Null);

        match self.op {
            FilterOp::IsNull => cell.is_null(),
            FilterOp::Eq => !cell.is_null() && compare_values(cell, &self.value) == Ordering::Equal,
            FilterOp::Neq => !cell.is_null() && compare_values(cell, &self.value) != Ordering::Equal,
            FilterOp::Gt => !cell.is_null() && compare_values(cell, &self.value) == Ordering::Greater,
            FilterOp::Gte => !cell.is_null() && compare_values(cell, &self.value) != Ordering::Less,
            FilterOp::Lt => !cell.is_null() && compare_values(cell, &self.value) == Ordering::Less,
            FilterOp::Lte => !cell.is_null() && compare_values(cell, &self.value) != Ordering::Greater,
            FilterOp::Ilike => match (cell.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => ilike(text, pattern),
                _ => false,
            },
            FilterOp::In => self
                .value
                .as_array()
                .map(|options| {
                    options
                        .iter()
                        .any(|o| !cell.is_null() && compare_values(cell, o) == Ordering::Equal)
                })
                .unwrap_or(false),
        }
    }

    /// Encodes the right-hand side of `column=...`.
    fn encode(&self) -> String {
        match self.op {
            FilterOp::IsNull => "is.null".to_string(),
            FilterOp::In => {
                let items: Vec<String> = self
                    .value
                    .as_array()
                    .map(|values| values.iter().map(quote_list_item).collect())
                    .unwrap_or_default();
                format!("in.({})", items.join(","))
            }
            FilterOp::Ilike => format!(
                "ilike.{}",
                plain_value(&self.value).replace('%', "*")
            ),
            op => format!("{}.{}", op.keyword(), plain_value(&self.value)),
        }
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quote_list_item(value: &Value) -> String {
    let raw = plain_value(value);
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// One `order=column.asc|desc` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

// =============================================================================
// Query
// =============================================================================

/// A table query. Also used as the row selector of update and delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    /// Starts a query selecting every column of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Neq, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Ilike, Value::String(pattern.into()))
    }

    /// Case-insensitive "contains" search.
    pub fn search(self, column: impl Into<String>, term: &str) -> Self {
        self.ilike(column, format!("%{}%", term.trim()))
    }

    pub fn in_list<V: Into<Value>>(self, column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(column, FilterOp::In, Value::Array(values))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(column, FilterOp::IsNull, Value::Null)
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the row satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Sorts rows by the order keys (nulls last ascending, first descending).
    pub fn sort(&self, rows: &mut [Value]) {
        if self.order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for key in &self.order {
                let left = a.get(&key.column).unwrap_or(&Value::Null);
                let right = b.get(&key.column).unwrap_or(&Value::Null);
                let ordering = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => compare_values(left, right),
                };
                let ordering = if key.ascending {
                    ordering
                } else {
                    ordering.reverse()
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Encodes filters, order and limit as URL query pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];

        for filter in &self.filters {
            pairs.push((filter.column.clone(), filter.encode()));
        }

        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect();
            pairs.push(("order".to_string(), keys.join(",")));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }

    /// Filter pairs only (update / delete do not take select, order, limit).
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| (f.column.clone(), f.encode()))
            .collect()
    }
}

// =============================================================================
// Value Comparison
// =============================================================================

/// Orders two non-null JSON scalars.
///
/// Numbers compare numerically, RFC 3339 timestamps chronologically, other
/// strings lexically, booleans false < true. Mixed types compare by their
/// JSON text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => plain_value(x).cmp(&plain_value(y)),
    }
}

/// Case-insensitive match with `%` (any run) and `_` (one char) wildcards.
fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    // classic two-pointer glob with backtracking on the last '%'
    let (mut t, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_encoding() {
        let query = Query::table("orders")
            .eq("status", "pending")
            .gte("total_cents", 100)
            .search("notes", "rush")
            .order_by("created_at", false)
            .order_by("id", true)
            .limit(20);

        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("status".to_string(), "eq.pending".to_string()),
                ("total_cents".to_string(), "gte.100".to_string()),
                ("notes".to_string(), "ilike.*rush*".to_string()),
                ("order".to_string(), "created_at.desc,id.asc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_and_null_encoding() {
        let query = Query::table("order_items")
            .in_list("order_id", ["a", "b,c"])
            .is_null("variant_id");
        assert_eq!(
            query.filter_pairs(),
            vec![
                ("order_id".to_string(), "in.(a,\"b,c\")".to_string()),
                ("variant_id".to_string(), "is.null".to_string()),
            ]
        );
    }

    #[test]
    fn test_matches_rows() {
        let row = json!({"name": "Acme Bakery", "total_cents": 1500, "client_id": null});

        assert!(Query::table("t").eq("name", "Acme Bakery").matches(&row));
        assert!(Query::table("t").search("name", "bak").matches(&row));
        assert!(!Query::table("t").search("name", "bread").matches(&row));
        assert!(Query::table("t").gt("total_cents", 1000).lt("total_cents", 2000).matches(&row));
        assert!(Query::table("t").is_null("client_id").matches(&row));
        assert!(!Query::table("t").eq("client_id", "x").matches(&row));
        assert!(!Query::table("t").neq("client_id", "x").matches(&row));
        assert!(Query::table("t").in_list("total_cents", [1, 1500]).matches(&row));
    }

    #[test]
    fn test_sort_timestamps_and_nulls() {
        let mut rows = vec![
            json!({"id": 1, "created_at": "2024-03-01T10:00:00Z"}),
            json!({"id": 2, "created_at": "2024-03-01T10:00:00.500Z"}),
            json!({"id": 3, "created_at": null}),
        ];

        Query::table("t").order_by("created_at", false).sort(&mut rows);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        Query::table("t").order_by("created_at", true).sort(&mut rows);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_ilike_wildcards() {
        assert!(ilike("Sourdough", "sour%"));
        assert!(ilike("Sourdough", "%DOUGH"));
        assert!(ilike("Sourdough", "s_urdough"));
        assert!(ilike("abcabc", "%abc"));
        assert!(!ilike("Sourdough", "dough"));
        assert!(ilike("", "%"));
    }
}
