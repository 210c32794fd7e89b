// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Queries behind the dashboard charts: documents, leads, revenue, and the
//! custom-field picker.

use super::{
    custom_field_values, fields, group, paged_connection, sort_by, with, Aggregate, Expr, Filter,
};
use serde_json::{json, Value};

/// Parameters for [`docs_data_query`].
#[derive(Debug, Clone)]
pub struct DocsDataParams<'a> {
    pub org_id: &'a str,
    pub start_date: &'a str,
    pub end_date: &'a str,
    /// Cursor from the previous page's `nextPage`; empty for the first page
    pub page: &'a str,
}

/// Customer orders issued in a date range.
pub fn docs_data_query(params: &DocsDataParams<'_>) -> Value {
    let filter = Filter::and([
        Filter::eq("type", "customerOrder"),
        Filter::gte("issueDate", params.start_date),
        Filter::lte("issueDate", params.end_date),
    ]);

    let nodes = with(
        fields(&[
            "id",
            "name",
            "number",
            "status",
            "issueDate",
            "price",
            "cost",
        ]),
        &[("job", fields(&["id", "name", "number"]))],
    );

    json!({
        "organization": {
            "$": { "id": params.org_id },
            "id": {},
            "documents": paged_connection(&filter, sort_by("issueDate", false), params.page, nodes),
        }
    })
}

/// Jobs created in a date range, with their custom field values (lead source,
/// sales rep, ...).
pub fn leads_query(org_id: &str, start: &str, end: &str, page: &str) -> Value {
    let filter = Filter::and([Filter::gte("createdAt", start), Filter::lte("createdAt", end)]);

    let nodes = with(
        fields(&["id", "name", "number", "createdAt"]),
        &[("customFieldValues", custom_field_values())],
    );

    json!({
        "organization": {
            "$": { "id": org_id },
            "id": {},
            "jobs": paged_connection(&filter, sort_by("createdAt", false), page, nodes),
        }
    })
}

/// Billed amount for one month: invoices minus credit memos.
///
/// Drafts and denied documents are excluded. The result is a single grouped
/// row under `organization.documents.withValues`.
pub fn revenue_month_query(org_id: &str, start: &str, end: &str) -> Value {
    let filter = Filter::and([
        Filter::any_of("type", ["customerInvoice", "customerCreditMemo"]),
        Filter::any_of("status", ["pending", "approved"]),
        Filter::gte("issueDate", start),
        Filter::lte("issueDate", end),
    ]);

    let amount = Expr::when(
        Filter::eq("type", "customerCreditMemo"),
        Expr::mul(Expr::field("price"), Expr::literal(-1)),
        Expr::field("price"),
    );

    json!({
        "organization": {
            "$": { "id": org_id },
            "id": {},
            "documents": {
                "$": {
                    "where": filter.to_json(),
                    "group": group(&[], &[
                        ("revenue", Aggregate::Sum(amount)),
                        ("documentCount", Aggregate::Count),
                    ]),
                },
                "withValues": {},
            },
        }
    })
}

/// Custom fields defined for a target type (`job`, `location`, `account`...).
pub fn custom_fields_query(org_id: &str, target_type: &str) -> Value {
    json!({
        "organization": {
            "$": { "id": org_id },
            "id": {},
            "customFields": {
                "$": {
                    "where": Filter::eq("targetType", target_type).to_json(),
                    "sortBy": sort_by("name", false),
                    "size": super::PAGE_SIZE,
                },
                "nodes": fields(&["id", "name", "type", "targetType", "options"]),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_data_query_filters_in_order() {
        let q = docs_data_query(&DocsDataParams {
            org_id: "X",
            start_date: "2024-01-01",
            end_date: "2024-01-31",
            page: "",
        });

        let docs = &q["organization"]["documents"];
        assert_eq!(q["organization"]["$"]["id"], "X");
        assert_eq!(
            docs["$"]["where"]["and"],
            json!([
                ["type", "=", "customerOrder"],
                ["issueDate", ">=", "2024-01-01"],
                ["issueDate", "<=", "2024-01-31"]
            ])
        );
        assert_eq!(docs["$"]["page"], "");
        assert_eq!(docs["$"]["size"], 100);
        assert_eq!(docs["nextPage"], json!({}));
        assert_eq!(docs["nodes"]["job"]["name"], json!({}));
    }

    #[test]
    fn docs_data_query_is_deterministic() {
        let params = DocsDataParams {
            org_id: "X",
            start_date: "2024-01-01",
            end_date: "2024-01-31",
            page: "abc",
        };
        assert_eq!(
            serde_json::to_string(&docs_data_query(&params)).unwrap(),
            serde_json::to_string(&docs_data_query(&params)).unwrap()
        );
    }

    #[test]
    fn leads_query_selects_custom_fields() {
        let q = leads_query("org", "2024-01-01", "2024-01-31T23:59:59.999Z", "p2");
        let jobs = &q["organization"]["jobs"];
        assert_eq!(jobs["$"]["page"], "p2");
        assert_eq!(
            jobs["$"]["where"]["and"][1],
            json!(["createdAt", "<=", "2024-01-31T23:59:59.999Z"])
        );
        assert_eq!(
            jobs["nodes"]["customFieldValues"]["nodes"]["customField"]["id"],
            json!({})
        );
    }

    #[test]
    fn revenue_query_groups_conditional_amount() {
        let q = revenue_month_query("org", "2024-02-01", "2024-02-29");
        let docs = &q["organization"]["documents"];
        assert_eq!(
            docs["$"]["where"]["and"][0],
            json!(["type", "in", ["customerInvoice", "customerCreditMemo"]])
        );
        assert!(docs["$"]["group"]["aggs"]["revenue"]["sum"]["if"].is_array());
        assert_eq!(docs["$"]["group"]["aggs"]["documentCount"], json!({"count": {}}));
        assert_eq!(docs["withValues"], json!({}));
    }

    #[test]
    fn custom_fields_query_filters_target_type() {
        let q = custom_fields_query("org", "job");
        assert_eq!(
            q["organization"]["customFields"]["$"]["where"],
            json!(["targetType", "=", "job"])
        );
    }
}
