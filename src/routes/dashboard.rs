// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard chart data built from JobTread queries.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::queries::dashboard::{
    custom_fields_query, docs_data_query, leads_query, revenue_month_query, DocsDataParams,
};
use crate::queries::sales::{sales_query, sales_summary_query};
use crate::services::analytics::{
    self, bucket_count_by_month, bucket_sum_by_month, conversion_rate, cost_per_lead,
    count_by_custom_field, gross_margin, read_aggregate, round2, sum_by_custom_field,
};
use crate::services::credentials::{resolve_credentials, OrgCredentials};
use crate::services::pagination::{fetch_all_pages, PageSet};
use crate::time_utils::{end_of_day, months_between, parse_date, parse_month, MonthRange};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{Months, NaiveDate};
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest range a chart may request.
const MAX_MONTHS: usize = 36;
/// Concurrent per-month revenue queries.
const MONTH_CONCURRENCY: usize = 6;

/// Dashboard routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard/revenue", get(revenue))
        .route("/api/dashboard/leads", get(leads))
        .route("/api/dashboard/sales", get(sales))
        .route("/api/dashboard/documents", get(documents))
        .route("/api/custom-fields", get(custom_fields))
}

// ─── Date Ranges ─────────────────────────────────────────────

/// `start`/`end` as `YYYY-MM-DD` or `YYYY-MM` (whole month).
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone)]
struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
    /// Calendar months touched by the range; the first and last are clamped
    /// to `start` and `end`.
    months: Vec<MonthRange>,
}

impl DateRange {
    fn start(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    fn end(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Month keys with zero-filled values.
    fn zeroed<T: Default>(&self) -> BTreeMap<String, T> {
        self.months
            .iter()
            .map(|m| (m.key.clone(), T::default()))
            .collect()
    }
}

fn parse_bound(value: &str, end: bool) -> Option<NaiveDate> {
    if let Some(date) = parse_date(value) {
        return Some(date);
    }
    let first = parse_month(value)?;
    if end {
        first.checked_add_months(Months::new(1))?.pred_opt()
    } else {
        Some(first)
    }
}

fn parse_range(params: &RangeParams) -> Result<DateRange> {
    let start = parse_bound(&params.start, false)
        .ok_or_else(|| AppError::BadRequest(format!("invalid start date: {}", params.start)))?;
    let end = parse_bound(&params.end, true)
        .ok_or_else(|| AppError::BadRequest(format!("invalid end date: {}", params.end)))?;

    if start > end {
        return Err(AppError::BadRequest(
            "start must not be after end".to_string(),
        ));
    }

    let mut months = months_between(start, end);
    if months.len() > MAX_MONTHS {
        return Err(AppError::BadRequest(format!(
            "range spans {} months (max {})",
            months.len(),
            MAX_MONTHS
        )));
    }

    if let Some(first) = months.first_mut() {
        first.start = start.format("%Y-%m-%d").to_string();
    }
    if let Some(last) = months.last_mut() {
        last.end = end.format("%Y-%m-%d").to_string();
    }

    Ok(DateRange { start, end, months })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn fetch_leads(state: &AppState, creds: &OrgCredentials, range: &DateRange) -> Result<PageSet> {
    let start = range.start();
    let end = end_of_day(range.end);
    fetch_all_pages(
        &state.pave,
        &creds.grant_key,
        "/organization/jobs",
        state.config.max_pages,
        |page| leads_query(&creds.jobtread_org_id, &start, &end, page),
    )
    .await
}

// ─── Revenue ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub document_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RevenueResponse {
    pub months: Vec<MonthlyRevenue>,
    pub total: f64,
}

/// Invoiced revenue per month (credit memos subtract), one grouped query per month.
async fn revenue(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<RevenueResponse>> {
    let range = parse_range(&params)?;
    let creds = resolve_credentials(&state.db, &user.uid).await?;

    let months: Vec<MonthlyRevenue> = stream::iter(range.months.clone())
        .map(|month| {
            let state = &state;
            let creds = &creds;
            async move {
                let query = revenue_month_query(&creds.jobtread_org_id, &month.start, &month.end);
                let response = state.pave.run(&creds.grant_key, query).await?;
                Ok::<_, AppError>(MonthlyRevenue {
                    month: month.key,
                    revenue: round2(read_aggregate(&response, "/organization/documents", "revenue")),
                    document_count: read_aggregate(
                        &response,
                        "/organization/documents",
                        "documentCount",
                    ) as u64,
                })
            }
        })
        .buffered(MONTH_CONCURRENCY)
        .try_collect()
        .await?;

    let total = round2(months.iter().map(|m| m.revenue).sum());
    tracing::debug!(org_id = %creds.org_id, months = months.len(), total, "Computed revenue");

    Ok(Json(RevenueResponse { months, total }))
}

// ─── Leads ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeadsResponse {
    pub total: u64,
    pub by_month: BTreeMap<String, u64>,
    /// Present when the organization configured a lead source field.
    pub by_source: Option<BTreeMap<String, u64>>,
    pub cost_per_lead: Option<f64>,
    pub complete: bool,
    pub truncated: bool,
}

/// Jobs created in the range, per month and per lead source.
async fn leads(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<LeadsResponse>> {
    let range = parse_range(&params)?;
    let creds = resolve_credentials(&state.db, &user.uid).await?;
    let jobs = fetch_leads(&state, &creds, &range).await?;

    let mut by_month = range.zeroed();
    by_month.extend(bucket_count_by_month(&jobs.nodes, "createdAt"));
    let by_source = non_blank(&creds.org.lead_source_field)
        .map(|field| count_by_custom_field(&jobs.nodes, "", field));
    let total = jobs.nodes.len() as u64;

    Ok(Json(LeadsResponse {
        total,
        by_month,
        by_source,
        cost_per_lead: cost_per_lead(creds.org.marketing_budget, range.months.len(), total),
        complete: jobs.complete,
        truncated: jobs.truncated,
    }))
}

// ─── Sales ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SalesResponse {
    pub doc_count: u64,
    pub leads_count: u64,
    /// Percentage with two decimals, `"0"` with no leads.
    pub conversion_rate: String,
    pub total_sales: f64,
    pub total_cost: f64,
    pub gross_margin: f64,
    pub average_sale: f64,
    pub min_sale: f64,
    pub max_sale: f64,
    pub by_month: BTreeMap<String, f64>,
    /// Present when the organization configured a sales rep field.
    pub by_rep: Option<BTreeMap<String, f64>>,
    pub cost_per_lead: Option<f64>,
    pub complete: bool,
}

/// Approved orders against leads over the range.
async fn sales(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<SalesResponse>> {
    let range = parse_range(&params)?;
    let creds = resolve_credentials(&state.db, &user.uid).await?;
    let (start, end) = (range.start(), range.end());

    let (orders, jobs, summary) = tokio::try_join!(
        fetch_all_pages(
            &state.pave,
            &creds.grant_key,
            "/organization/documents",
            state.config.max_pages,
            |page| sales_query(&creds.jobtread_org_id, &start, &end, page),
        ),
        fetch_leads(&state, &creds, &range),
        state.pave.run(
            &creds.grant_key,
            sales_summary_query(&creds.jobtread_org_id, &start, &end),
        ),
    )?;

    let doc_count = orders.nodes.len() as u64;
    let leads_count = jobs.nodes.len() as u64;
    // Totals come from the grouped summary so they hold when pages are truncated
    let aggregate = |name| read_aggregate(&summary, "/organization/documents", name);
    let total_sales = aggregate("totalPrice");
    let total_cost = aggregate("totalCost");

    let mut by_month = range.zeroed();
    by_month.extend(
        bucket_sum_by_month(&orders.nodes, "issueDate", "price")
            .into_iter()
            .map(|(k, v)| (k, round2(v))),
    );
    let by_rep = non_blank(&creds.org.sales_rep_field).map(|field| {
        sum_by_custom_field(&orders.nodes, "/job", field, "price")
            .into_iter()
            .map(|(k, v)| (k, round2(v)))
            .collect()
    });

    Ok(Json(SalesResponse {
        doc_count,
        leads_count,
        conversion_rate: conversion_rate(doc_count, leads_count),
        total_sales: round2(total_sales),
        total_cost: round2(total_cost),
        gross_margin: gross_margin(total_sales, total_cost),
        average_sale: round2(aggregate("averagePrice")),
        min_sale: round2(aggregate("minPrice")),
        max_sale: round2(aggregate("maxPrice")),
        by_month,
        by_rep,
        cost_per_lead: cost_per_lead(creds.org.marketing_budget, range.months.len(), leads_count),
        complete: orders.complete && jobs.complete,
    }))
}

// ─── Documents ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DocumentRow {
    pub id: String,
    pub name: String,
    pub number: String,
    pub status: String,
    pub issue_date: String,
    pub price: f64,
    pub cost: f64,
    pub job_name: Option<String>,
}

impl DocumentRow {
    fn from_node(node: &Value) -> Self {
        let text = |key: &str| match &node[key] {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            id: text("id"),
            name: text("name"),
            number: text("number"),
            status: text("status"),
            issue_date: text("issueDate"),
            price: analytics::number(&node["price"]),
            cost: analytics::number(&node["cost"]),
            job_name: node
                .pointer("/job/name")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentRow>,
    pub by_status: BTreeMap<String, u64>,
    pub total_price: f64,
    pub complete: bool,
    pub truncated: bool,
}

/// Customer orders issued in the range.
async fn documents(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<DocumentsResponse>> {
    let range = parse_range(&params)?;
    let creds = resolve_credentials(&state.db, &user.uid).await?;
    let (start, end) = (range.start(), range.end());

    let docs = fetch_all_pages(
        &state.pave,
        &creds.grant_key,
        "/organization/documents",
        state.config.max_pages,
        |page| {
            docs_data_query(&DocsDataParams {
                org_id: &creds.jobtread_org_id,
                start_date: &start,
                end_date: &end,
                page,
            })
        },
    )
    .await?;

    let documents: Vec<DocumentRow> = docs.nodes.iter().map(DocumentRow::from_node).collect();
    let mut by_status = BTreeMap::new();
    for doc in &documents {
        *by_status.entry(doc.status.clone()).or_insert(0) += 1;
    }
    let total_price = round2(documents.iter().map(|d| d.price).sum());

    Ok(Json(DocumentsResponse {
        documents,
        by_status,
        total_price,
        complete: docs.complete,
        truncated: docs.truncated,
    }))
}

// ─── Custom Fields ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldParams {
    #[serde(default)]
    pub target_type: Option<String>,
}

/// Custom fields the settings page can map chart sources to.
async fn custom_fields(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<CustomFieldParams>,
) -> Result<Json<Value>> {
    let target_type = non_blank(&params.target_type).unwrap_or("job");
    if !matches!(target_type, "job" | "location" | "customer" | "document") {
        return Err(AppError::BadRequest(format!(
            "unsupported targetType: {}",
            target_type
        )));
    }

    let creds = resolve_credentials(&state.db, &user.uid).await?;
    let response = state
        .pave
        .run(
            &creds.grant_key,
            custom_fields_query(&creds.jobtread_org_id, target_type),
        )
        .await?;

    let fields = response
        .pointer("/organization/customFields/nodes")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    Ok(Json(serde_json::json!({ "customFields": fields })))
}
