// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AIA G702/G703 pay applications built from a JobTread invoice.
//!
//! The schedule of values comes from the job's approved customer orders
//! (change orders add to a line by name). Earlier invoices on the job are
//! "work completed from previous applications"; the invoice being billed is
//! "this period".

use super::analytics::{number, round2};
use crate::error::AppError;
use genpdf::{elements, style, Alignment, Element};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// One row of the G703 continuation sheet.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationLine {
    pub item: usize,
    pub description: String,
    pub scheduled_value: f64,
    pub from_previous: f64,
    pub this_period: f64,
    pub total_completed: f64,
    pub percent_complete: f64,
    pub balance_to_finish: f64,
    pub retainage: f64,
}

/// G702 summary plus its G703 lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayApplication {
    pub application_number: u32,
    pub invoice_number: String,
    pub job_name: String,
    pub address: String,
    pub period_to: String,
    pub retainage_percent: f64,
    pub lines: Vec<ContinuationLine>,
    pub original_contract_sum: f64,
    pub total_completed: f64,
    pub retainage: f64,
    pub total_earned_less_retainage: f64,
    pub previous_certificates: f64,
    pub current_payment_due: f64,
    pub balance_to_finish: f64,
}

#[derive(Default)]
struct Line {
    description: String,
    scheduled: f64,
    previous: f64,
    this_period: f64,
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or("")
}

fn line_items(doc: &Value) -> &[Value] {
    doc.pointer("/costItems/nodes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn line_name(item: &Value) -> String {
    [text(item, "name"), text(item, "description")]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Unnamed item")
        .to_string()
}

/// Invoice ordering: issue date, then invoice number.
fn invoice_order(a: &Value, b: &Value) -> Ordering {
    text(a, "issueDate")
        .cmp(text(b, "issueDate"))
        .then_with(|| number(&a["number"]).total_cmp(&number(&b["number"])))
}

/// Whether a document is something we bill.
pub fn is_billable(document: &Value) -> bool {
    document["type"].as_str() == Some("customerInvoice")
}

/// Build the pay application for `document`, the response's `document` object.
pub fn build_pay_application(
    document: &Value,
    retainage_percent: f64,
) -> Result<PayApplication, AppError> {
    if !is_billable(document) {
        return Err(AppError::BadRequest(format!(
            "Document {} is not a customer invoice",
            text(document, "id")
        )));
    }

    let current_id = text(document, "id");
    let job = &document["job"];
    let history: &[Value] = job
        .pointer("/documents/nodes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut lines: Vec<Line> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut line_for = |name: String, lines: &mut Vec<Line>| -> usize {
        *index.entry(name.clone()).or_insert_with(|| {
            lines.push(Line {
                description: name,
                ..Default::default()
            });
            lines.len() - 1
        })
    };

    let mut orders: Vec<&Value> = history
        .iter()
        .filter(|d| text(d, "type") == "customerOrder")
        .collect();
    orders.sort_by(|a, b| text(a, "issueDate").cmp(text(b, "issueDate")));
    for order in orders {
        for item in line_items(order) {
            let i = line_for(line_name(item), &mut lines);
            lines[i].scheduled += number(&item["price"]);
        }
    }

    let mut previous_invoices = 0u32;
    for invoice in history.iter().filter(|d| {
        text(d, "type") == "customerInvoice"
            && text(d, "id") != current_id
            && invoice_order(d, document) == Ordering::Less
    }) {
        previous_invoices += 1;
        for item in line_items(invoice) {
            let i = line_for(line_name(item), &mut lines);
            lines[i].previous += number(&item["price"]);
        }
    }

    for item in line_items(document) {
        let i = line_for(line_name(item), &mut lines);
        lines[i].this_period += number(&item["price"]);
    }

    let rate = retainage_percent / 100.0;
    let lines: Vec<ContinuationLine> = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let total = line.previous + line.this_period;
            let percent = if line.scheduled > 0.0 {
                total / line.scheduled * 100.0
            } else {
                0.0
            };
            ContinuationLine {
                item: i + 1,
                description: line.description,
                scheduled_value: round2(line.scheduled),
                from_previous: round2(line.previous),
                this_period: round2(line.this_period),
                total_completed: round2(total),
                percent_complete: round2(percent),
                balance_to_finish: round2(line.scheduled - total),
                retainage: round2(total * rate),
            }
        })
        .collect();

    let contract_sum: f64 = lines.iter().map(|l| l.scheduled_value).sum();
    let completed: f64 = lines.iter().map(|l| l.total_completed).sum();
    let previous: f64 = lines.iter().map(|l| l.from_previous).sum();
    let retainage: f64 = lines.iter().map(|l| l.retainage).sum();
    let earned = completed - retainage;
    let previous_certificates = previous * (1.0 - rate);

    Ok(PayApplication {
        application_number: previous_invoices + 1,
        invoice_number: document["number"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| document["number"].to_string()),
        job_name: text(job, "name").to_string(),
        address: job
            .pointer("/location/formattedAddress")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        period_to: text(document, "issueDate").to_string(),
        retainage_percent,
        lines,
        original_contract_sum: round2(contract_sum),
        total_completed: round2(completed),
        retainage: round2(retainage),
        total_earned_less_retainage: round2(earned),
        previous_certificates: round2(previous_certificates),
        current_payment_due: round2(earned - previous_certificates),
        balance_to_finish: round2(contract_sum - earned),
    })
}

/// File name for the generated PDF.
pub fn pdf_file_name(app: &PayApplication) -> String {
    format!(
        "AIA G702-G703 Application {} (Invoice {}).pdf",
        app.application_number, app.invoice_number
    )
}

fn money(value: f64) -> String {
    format!("${:.2}", value)
}

fn pdf_error(e: genpdf::error::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("PDF rendering failed: {}", e))
}

/// Render the G702 summary and G703 continuation sheet.
pub fn render_pdf(
    app: &PayApplication,
    font_dir: &Path,
    font_family: &str,
) -> Result<Vec<u8>, AppError> {
    let fonts = genpdf::fonts::from_files(font_dir, font_family, None).map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "font {} not found in {}: {}",
            font_family,
            font_dir.display(),
            e
        ))
    })?;

    let mut doc = genpdf::Document::new(fonts);
    doc.set_title(format!("Application for Payment #{}", app.application_number));
    doc.set_paper_size(genpdf::PaperSize::Letter);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let bold = style::Style::new().bold();

    // G702
    doc.push(
        elements::Paragraph::new("APPLICATION AND CERTIFICATE FOR PAYMENT")
            .styled(bold.with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!("Project: {}", app.job_name)));
    if !app.address.is_empty() {
        doc.push(elements::Paragraph::new(format!("Address: {}", app.address)));
    }
    doc.push(elements::Paragraph::new(format!(
        "Application No: {}    Invoice: {}    Period To: {}",
        app.application_number, app.invoice_number, app.period_to
    )));
    doc.push(elements::Break::new(1.5));

    let summary = [
        ("1. Original Contract Sum", app.original_contract_sum),
        ("4. Total Completed and Stored to Date", app.total_completed),
        ("5. Retainage", app.retainage),
        ("6. Total Earned Less Retainage", app.total_earned_less_retainage),
        ("7. Less Previous Certificates for Payment", app.previous_certificates),
        ("8. Current Payment Due", app.current_payment_due),
        ("9. Balance to Finish, Including Retainage", app.balance_to_finish),
    ];
    let mut table = elements::TableLayout::new(vec![4, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    for (label, value) in summary {
        let mut amount = elements::Paragraph::new(money(value));
        amount.set_alignment(Alignment::Right);
        table
            .row()
            .element(elements::Paragraph::new(label))
            .element(amount)
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(table);
    doc.push(elements::Paragraph::new(format!(
        "Retainage: {}% of completed work",
        app.retainage_percent
    )));

    // G703
    doc.push(elements::PageBreak::new());
    doc.push(elements::Paragraph::new("CONTINUATION SHEET").styled(bold.with_font_size(14)));
    doc.push(elements::Break::new(1));

    let mut sheet = elements::TableLayout::new(vec![1, 4, 2, 2, 2, 2, 1, 2, 2]);
    sheet.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    let header = [
        "Item",
        "Description of Work",
        "Scheduled Value",
        "From Previous",
        "This Period",
        "Completed to Date",
        "%",
        "Balance to Finish",
        "Retainage",
    ];
    let mut row = sheet.row();
    for title in header {
        row = row.element(elements::Paragraph::new(title).styled(bold.with_font_size(8)));
    }
    row.push().map_err(pdf_error)?;

    let small = style::Style::new().with_font_size(8);
    for line in &app.lines {
        sheet
            .row()
            .element(elements::Paragraph::new(line.item.to_string()).styled(small))
            .element(elements::Paragraph::new(line.description.as_str()).styled(small))
            .element(elements::Paragraph::new(money(line.scheduled_value)).styled(small))
            .element(elements::Paragraph::new(money(line.from_previous)).styled(small))
            .element(elements::Paragraph::new(money(line.this_period)).styled(small))
            .element(elements::Paragraph::new(money(line.total_completed)).styled(small))
            .element(elements::Paragraph::new(format!("{:.1}", line.percent_complete)).styled(small))
            .element(elements::Paragraph::new(money(line.balance_to_finish)).styled(small))
            .element(elements::Paragraph::new(money(line.retainage)).styled(small))
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(sheet);

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}
