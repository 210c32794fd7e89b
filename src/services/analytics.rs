// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregation over merged Pave nodes.

use crate::time_utils::month_key;
use serde_json::Value;
use std::collections::BTreeMap;

/// Bucket label for entities without a value for the grouping field.
pub const UNASSIGNED: &str = "Unassigned";

/// Read a number that may arrive as a JSON number or numeric string.
pub fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Count nodes per `YYYY-MM` of `date_field`. Nodes without a date are skipped.
pub fn bucket_count_by_month(nodes: &[Value], date_field: &str) -> BTreeMap<String, u64> {
    let mut buckets = BTreeMap::new();
    for node in nodes {
        if let Some(key) = node[date_field].as_str().and_then(month_key) {
            *buckets.entry(key).or_insert(0) += 1;
        }
    }
    buckets
}

/// Sum `amount_field` per `YYYY-MM` of `date_field`.
pub fn bucket_sum_by_month(
    nodes: &[Value],
    date_field: &str,
    amount_field: &str,
) -> BTreeMap<String, f64> {
    let mut buckets = BTreeMap::new();
    for node in nodes {
        if let Some(key) = node[date_field].as_str().and_then(month_key) {
            *buckets.entry(key).or_insert(0.0) += number(&node[amount_field]);
        }
    }
    buckets
}

/// The value of a custom field on an entity, matched by field id or name.
///
/// `entity` must carry `customFieldValues.nodes[].{value, customField{id,name}}`.
pub fn custom_field_value<'a>(entity: &'a Value, field: &str) -> Option<&'a str> {
    entity
        .pointer("/customFieldValues/nodes")?
        .as_array()?
        .iter()
        .find(|cfv| {
            cfv.pointer("/customField/id").and_then(Value::as_str) == Some(field)
                || cfv.pointer("/customField/name").and_then(Value::as_str) == Some(field)
        })
        .and_then(|cfv| cfv["value"].as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn group_label(node: &Value, entity: &str, field: &str) -> String {
    node.pointer(entity)
        .and_then(|e| custom_field_value(e, field))
        .unwrap_or(UNASSIGNED)
        .to_string()
}

/// Count nodes per custom field value.
///
/// `entity` is a JSON pointer from the node to the entity carrying custom
/// fields: `""` for the node itself, `"/job"` for a document's job.
pub fn count_by_custom_field(nodes: &[Value], entity: &str, field: &str) -> BTreeMap<String, u64> {
    let mut buckets = BTreeMap::new();
    for node in nodes {
        *buckets.entry(group_label(node, entity, field)).or_insert(0) += 1;
    }
    buckets
}

/// Sum `amount_field` per custom field value.
pub fn sum_by_custom_field(
    nodes: &[Value],
    entity: &str,
    field: &str,
    amount_field: &str,
) -> BTreeMap<String, f64> {
    let mut buckets = BTreeMap::new();
    for node in nodes {
        *buckets.entry(group_label(node, entity, field)).or_insert(0.0) +=
            number(&node[amount_field]);
    }
    buckets
}

/// Orders per lead as a percentage with two decimals; `"0"` with no leads.
pub fn conversion_rate(doc_count: u64, leads_count: u64) -> String {
    if leads_count == 0 {
        return "0".to_string();
    }
    format!("{:.2}", doc_count as f64 / leads_count as f64 * 100.0)
}

/// Margin percentage; zero revenue yields 0.
pub fn gross_margin(revenue: f64, cost: f64) -> f64 {
    if revenue == 0.0 {
        return 0.0;
    }
    round2((revenue - cost) / revenue * 100.0)
}

/// Monthly marketing budget spread over the leads of the period.
pub fn cost_per_lead(monthly_budget: Option<f64>, months: usize, leads: u64) -> Option<f64> {
    let budget = monthly_budget?;
    if leads == 0 {
        return None;
    }
    Some(round2(budget * months as f64 / leads as f64))
}

/// Read one aggregate out of a grouped response.
///
/// `connection` points at the grouped connection; its `withValues` may be a
/// single object or a list of groups (summed).
pub fn read_aggregate(response: &Value, connection: &str, name: &str) -> f64 {
    match response.pointer(connection).map(|c| &c["withValues"]) {
        Some(Value::Array(groups)) => groups.iter().map(|g| number(&g[name])).sum(),
        Some(values @ Value::Object(_)) => number(&values[name]),
        _ => 0.0,
    }
}
