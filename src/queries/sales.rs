// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sales queries: approved customer orders and their summary statistics.

use super::{
    custom_field_values, fields, group, paged_connection, sort_by, with, Aggregate, Expr, Filter,
};
use serde_json::{json, Value};

fn approved_orders(start: &str, end: &str) -> Filter {
    Filter::and([
        Filter::eq("type", "customerOrder"),
        Filter::eq("status", "approved"),
        Filter::gte("issueDate", start),
        Filter::lte("issueDate", end),
    ])
}

/// Approved customer orders with the owning job's custom field values, for
/// attributing sales to a rep or lead source.
pub fn sales_query(org_id: &str, start: &str, end: &str, page: &str) -> Value {
    let nodes = with(
        fields(&["id", "number", "issueDate", "price", "cost"]),
        &[(
            "job",
            with(
                fields(&["id", "name"]),
                &[("customFieldValues", custom_field_values())],
            ),
        )],
    );

    json!({
        "organization": {
            "$": { "id": org_id },
            "id": {},
            "documents": paged_connection(
                &approved_orders(start, end),
                sort_by("issueDate", false),
                page,
                nodes,
            ),
        }
    })
}

/// Count, price statistics, and total cost of approved orders in a range.
pub fn sales_summary_query(org_id: &str, start: &str, end: &str) -> Value {
    json!({
        "organization": {
            "$": { "id": org_id },
            "id": {},
            "documents": {
                "$": {
                    "where": approved_orders(start, end).to_json(),
                    "group": group(&[], &[
                        ("orderCount", Aggregate::Count),
                        ("totalPrice", Aggregate::Sum(Expr::field("price"))),
                        ("averagePrice", Aggregate::Avg(Expr::field("price"))),
                        ("minPrice", Aggregate::Min(Expr::field("price"))),
                        ("maxPrice", Aggregate::Max(Expr::field("price"))),
                        ("totalCost", Aggregate::Sum(Expr::field("cost"))),
                    ]),
                },
                "withValues": {},
            },
        }
    })
}
