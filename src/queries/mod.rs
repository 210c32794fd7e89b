// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JobTread Pave query builders.
//!
//! Pave queries are JSON trees: every key names a field to select, `{}`
//! selects a scalar, and a `"$"` object carries the arguments for that
//! field (filters, pagination, mutation inputs). The builders here are pure
//! functions of their inputs; the grant key is added by
//! [`crate::services::pave::with_grant_key`] right before sending.

pub mod aia;
pub mod coverphoto;
pub mod dashboard;
pub mod files;
pub mod sales;
pub mod zillow;

use serde_json::{json, Map, Value};

/// Page size used by every paginated connection.
pub const PAGE_SIZE: u32 = 100;

/// A `where` predicate.
///
/// Comparisons render as `[field, op, value]` tuples, boolean combinators as
/// `{"and": [...]}` / `{"or": [...]}`. A field is either a name or a path
/// array such as `["job", "id"]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        field: Value,
        op: &'static str,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    fn compare(field: impl Into<Value>, op: &'static str, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::compare(field, "=", value)
    }

    pub fn ne(field: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::compare(field, "!=", value)
    }

    pub fn gt(field: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::compare(field, ">", value)
    }

    pub fn gte(field: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::compare(field, ">=", value)
    }

    pub fn lt(field: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::compare(field, "<", value)
    }

    pub fn lte(field: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::compare(field, "<=", value)
    }

    /// SQL-style pattern match (`%` wildcard).
    pub fn like(field: impl Into<Value>, pattern: impl Into<String>) -> Self {
        Self::compare(field, "like", pattern.into())
    }

    /// Inclusive range.
    pub fn between(
        field: impl Into<Value>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::compare(field, "between", Value::Array(vec![low.into(), high.into()]))
    }

    pub fn any_of<V: Into<Value>>(field: impl Into<Value>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::compare(field, "in", Value::Array(values))
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Filter::Compare { field, op, value } => json!([field, op, value]),
            Filter::And(filters) => {
                json!({ "and": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Or(filters) => {
                json!({ "or": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

/// A computed value inside an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    Literal(Value),
    /// `cond ? then : otherwise`, evaluated per row
    If {
        cond: Box<Filter>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Mul(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn field(name: &str) -> Self {
        Expr::Field(name.to_string())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn when(cond: Filter, then: Expr, otherwise: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Expr::Mul(Box::new(a), Box::new(b))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Expr::Field(name) => json!({ "field": name }),
            Expr::Literal(value) => value.clone(),
            Expr::If {
                cond,
                then,
                otherwise,
            } => json!({ "if": [cond.to_json(), then.to_json(), otherwise.to_json()] }),
            Expr::Mul(a, b) => json!({ "*": [a.to_json(), b.to_json()] }),
        }
    }
}

/// Aggregation functions supported by grouped connections.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    Count,
}

impl Aggregate {
    pub fn to_json(&self) -> Value {
        match self {
            Aggregate::Sum(e) => json!({ "sum": e.to_json() }),
            Aggregate::Avg(e) => json!({ "avg": e.to_json() }),
            Aggregate::Min(e) => json!({ "min": e.to_json() }),
            Aggregate::Max(e) => json!({ "max": e.to_json() }),
            Aggregate::Count => json!({ "count": {} }),
        }
    }
}

/// `{"by": [...], "aggs": {...}}` block for a grouped connection.
pub fn group(by: &[&str], aggs: &[(&str, Aggregate)]) -> Value {
    let aggs: Map<String, Value> = aggs
        .iter()
        .map(|(name, agg)| (name.to_string(), agg.to_json()))
        .collect();
    json!({ "by": by, "aggs": aggs })
}

/// Scalar selection: `{"id": {}, "name": {}, ...}`.
pub fn fields(names: &[&str]) -> Value {
    Value::Object(
        names
            .iter()
            .map(|name| (name.to_string(), json!({})))
            .collect(),
    )
}

/// Merge extra selections into an object built by [`fields`].
pub fn with(mut base: Value, extra: &[(&str, Value)]) -> Value {
    if let Value::Object(map) = &mut base {
        for (key, value) in extra {
            map.insert(key.to_string(), value.clone());
        }
    }
    base
}

/// Sort clause for a connection.
pub fn sort_by(field: &str, descending: bool) -> Value {
    json!([{ "field": field, "order": if descending { "desc" } else { "asc" } }])
}

/// Paginated connection selecting `nodes` and the `nextPage` cursor.
pub fn paged_connection(filter: &Filter, sort: Value, page: &str, nodes: Value) -> Value {
    json!({
        "$": {
            "where": filter.to_json(),
            "sortBy": sort,
            "size": PAGE_SIZE,
            "page": page,
        },
        "nextPage": {},
        "nodes": nodes,
    })
}

/// Custom field values attached to an entity (first page is plenty: an
/// entity rarely carries more than a handful).
pub fn custom_field_values() -> Value {
    json!({
        "$": { "size": 25 },
        "nodes": {
            "value": {},
            "customField": { "id": {}, "name": {} },
        },
    })
}
