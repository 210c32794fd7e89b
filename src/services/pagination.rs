// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cursor pagination over Pave connections.
//!
//! A connection answers with `{ nextPage, nodes }`; the next request passes
//! `nextPage` back as `$.page`. Pages are fetched sequentially and their
//! nodes concatenated in order.

use super::pave::{with_grant_key, PaveTransport};
use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;

/// Nodes merged across every fetched page.
#[derive(Debug, Clone, Serialize)]
pub struct PageSet {
    pub nodes: Vec<Value>,
    pub pages: u32,
    /// False when a later page failed or the page cap was hit.
    pub complete: bool,
    /// True when more pages remained past the cap.
    pub truncated: bool,
}

impl Default for PageSet {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            pages: 0,
            complete: true,
            truncated: false,
        }
    }
}

/// Fetch every page of a connection.
///
/// `build` receives the page cursor (`""` for the first page) and returns the
/// query; `connection` is a JSON pointer to the connection in the response,
/// e.g. `/organization/documents`. A failure on the first page is returned;
/// a failure on a later page stops the walk and marks the set incomplete.
pub async fn fetch_all_pages<T, B>(
    transport: &T,
    grant_key: &str,
    connection: &str,
    max_pages: u32,
    build: B,
) -> Result<PageSet, AppError>
where
    T: PaveTransport,
    B: Fn(&str) -> Value + Send,
{
    let mut set = PageSet::default();
    let mut page = String::new();

    loop {
        if set.pages >= max_pages {
            tracing::warn!(
                connection,
                pages = set.pages,
                "Page cap reached, returning truncated result"
            );
            set.complete = false;
            set.truncated = true;
            break;
        }

        let response = match transport.send(with_grant_key(build(&page), grant_key)).await {
            Ok(response) => response,
            Err(e) if set.pages == 0 => return Err(e),
            Err(e) => {
                tracing::warn!(
                    connection,
                    pages = set.pages,
                    error = %e,
                    "Page fetch failed, returning partial result"
                );
                set.complete = false;
                break;
            }
        };
        set.pages += 1;

        let conn = response.pointer(connection);
        if let Some(nodes) = conn.and_then(|c| c.get("nodes")).and_then(Value::as_array) {
            set.nodes.extend(nodes.iter().cloned());
        }

        let next = conn
            .and_then(|c| c.get("nextPage"))
            .and_then(Value::as_str)
            .filter(|next| !next.is_empty());

        match next {
            Some(next) if next == page => {
                tracing::warn!(connection, cursor = next, "Cursor did not advance");
                set.complete = false;
                break;
            }
            Some(next) => page = next.to_string(),
            None => break,
        }
    }

    tracing::debug!(
        connection,
        pages = set.pages,
        nodes = set.nodes.len(),
        complete = set.complete,
        "Fetched connection"
    );
    Ok(set)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    /// Replays canned responses in order and records every query sent.
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Value, AppError>>>,
        pub(crate) sent: Mutex<Vec<Value>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<Result<Value, AppError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl PaveTransport for ScriptedTransport {
        fn send(&self, query: Value) -> impl Future<Output = Result<Value, AppError>> + Send {
            self.sent.lock().unwrap().push(query);
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::BadRequest("script exhausted".into())));
            async move { next }
        }
    }

    fn page(next: Option<&str>, ids: &[&str]) -> Result<Value, AppError> {
        let nodes: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
        Ok(json!({ "organization": { "jobs": { "nextPage": next, "nodes": nodes } } }))
    }

    fn build(page: &str) -> Value {
        json!({ "organization": { "jobs": { "$": { "page": page } } } })
    }

    fn ids(set: &PageSet) -> Vec<&str> {
        set.nodes.iter().filter_map(|n| n["id"].as_str()).collect()
    }

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let t = ScriptedTransport::new(vec![
            page(Some("c1"), &["a", "b"]),
            page(Some("c2"), &["c"]),
            page(None, &["d"]),
        ]);

        let set = fetch_all_pages(&t, "gk", "/organization/jobs", 10, build)
            .await
            .unwrap();

        assert_eq!(ids(&set), ["a", "b", "c", "d"]);
        assert_eq!(set.pages, 3);
        assert!(set.complete);
        assert!(!set.truncated);

        let sent = t.sent.lock().unwrap();
        let cursors: Vec<&str> = sent
            .iter()
            .map(|q| q["organization"]["jobs"]["$"]["page"].as_str().unwrap())
            .collect();
        assert_eq!(cursors, ["", "c1", "c2"]);
        assert!(sent.iter().all(|q| q["$"]["grantKey"] == "gk"));
    }

    #[tokio::test]
    async fn empty_next_page_terminates() {
        let t = ScriptedTransport::new(vec![page(Some(""), &["a"])]);
        let set = fetch_all_pages(&t, "gk", "/organization/jobs", 10, build)
            .await
            .unwrap();
        assert_eq!(ids(&set), ["a"]);
        assert_eq!(t.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn page_cap_truncates() {
        let t = ScriptedTransport::new(vec![
            page(Some("c1"), &["a"]),
            page(Some("c2"), &["b"]),
            page(None, &["c"]),
        ]);
        let set = fetch_all_pages(&t, "gk", "/organization/jobs", 2, build)
            .await
            .unwrap();
        assert_eq!(ids(&set), ["a", "b"]);
        assert!(set.truncated);
        assert!(!set.complete);
    }

    #[tokio::test]
    async fn later_failure_returns_partial() {
        let t = ScriptedTransport::new(vec![
            page(Some("c1"), &["a"]),
            Err(AppError::upstream_transport("jobtread", "timeout")),
        ]);
        let set = fetch_all_pages(&t, "gk", "/organization/jobs", 10, build)
            .await
            .unwrap();
        assert_eq!(ids(&set), ["a"]);
        assert!(!set.complete);
        assert!(!set.truncated);
    }

    #[tokio::test]
    async fn first_failure_is_an_error() {
        let t = ScriptedTransport::new(vec![Err(AppError::Upstream {
            service: "jobtread",
            status: 500,
            body: "boom".into(),
        })]);
        let err = fetch_all_pages(&t, "gk", "/organization/jobs", 10, build)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 500, .. }));
    }

    #[tokio::test]
    async fn repeated_cursor_stops() {
        let t = ScriptedTransport::new(vec![page(Some("c1"), &["a"]), page(Some("c1"), &["b"])]);
        let set = fetch_all_pages(&t, "gk", "/organization/jobs", 10, build)
            .await
            .unwrap();
        assert_eq!(ids(&set), ["a", "b"]);
        assert!(!set.complete);
    }
}
