// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AIA billing query: an invoice, its job, and every approved order and
//! issued invoice on that job with their line items.

use super::{fields, sort_by, with, Filter, PAGE_SIZE};
use serde_json::{json, Value};

fn line_items() -> Value {
    json!({
        "$": { "size": PAGE_SIZE },
        "nodes": fields(&["id", "name", "description", "quantity", "price", "cost"]),
    })
}

pub fn aia_document_query(document_id: &str) -> Value {
    let job_documents = Filter::or([
        Filter::and([
            Filter::eq("type", "customerOrder"),
            Filter::eq("status", "approved"),
        ]),
        Filter::and([
            Filter::eq("type", "customerInvoice"),
            Filter::ne("status", "denied"),
            Filter::ne("status", "draft"),
        ]),
    ]);

    json!({
        "document": with(
            json!({ "$": { "id": document_id } }),
            &[
                ("id", json!({})),
                ("name", json!({})),
                ("number", json!({})),
                ("type", json!({})),
                ("status", json!({})),
                ("issueDate", json!({})),
                ("price", json!({})),
                ("costItems", line_items()),
                (
                    "job",
                    with(
                        fields(&["id", "name", "number"]),
                        &[
                            ("location", fields(&["id", "formattedAddress"])),
                            (
                                "documents",
                                json!({
                                    "$": {
                                        "where": job_documents.to_json(),
                                        "sortBy": sort_by("issueDate", false),
                                        "size": PAGE_SIZE,
                                    },
                                    "nodes": with(
                                        fields(&["id", "type", "status", "number", "issueDate"]),
                                        &[("costItems", line_items())],
                                    ),
                                }),
                            ),
                        ],
                    ),
                ),
            ],
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_invoice_and_job_history() {
        let q = aia_document_query("doc1");
        assert_eq!(q["document"]["$"]["id"], "doc1");
        assert_eq!(q["document"]["costItems"]["nodes"]["price"], json!({}));

        let history = &q["document"]["job"]["documents"];
        assert_eq!(
            history["$"]["where"]["or"][0],
            json!({"and": [["type", "=", "customerOrder"], ["status", "=", "approved"]]})
        );
        assert_eq!(history["nodes"]["costItems"]["nodes"]["name"], json!({}));
        assert_eq!(
            q["document"]["job"]["location"]["formattedAddress"],
            json!({})
        );
    }
}
