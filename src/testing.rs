//! Fixtures shared by the unit tests

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::client::{ClientError, ContentSource, Cursor, Document, DocumentPage, Result};

/// JSON of a post document with one content section
pub fn post_json(uid: &str, title: &str) -> Value {
    json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "post",
        "first_publication_date": "2021-03-25T12:00:00+0000",
        "last_publication_date": "2021-03-25T12:00:00+0000",
        "data": {
            "title": [ { "type": "heading1", "text": title, "spans": [] } ],
            "subtitle": [ { "type": "paragraph", "text": "Pensando em sincronização", "spans": [] } ],
            "author": [ { "type": "paragraph", "text": "Joseph Oliveira", "spans": [] } ],
            "banner": { "url": "https://images.example/banner.png", "alt": null },
            "content": [
                {
                    "heading": [ { "type": "heading2", "text": "Ola", "spans": [] } ],
                    "body": [ { "type": "paragraph", "text": "um dois", "spans": [] } ]
                }
            ]
        }
    })
}

pub fn post_document(uid: &str, title: &str) -> Document {
    serde_json::from_value(post_json(uid, title)).unwrap()
}

const MEMORY_SEARCH: &str = "https://cms.test/api/v2/documents/search";

/// In-memory content source serving a fixed chain of pages
#[derive(Default)]
pub struct MemorySource {
    pages: Vec<Vec<Document>>,
    extra: Vec<Document>,
    loop_back: Option<usize>,
    failing: Mutex<HashSet<usize>>,
    calls: Mutex<Vec<Option<usize>>>,
}

impl MemorySource {
    /// One listing page per entry of `pages`, chained by cursors
    pub fn with_pages(pages: Vec<Vec<Document>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Documents only reachable through `get_by_uid`
    pub fn with_unlisted(mut self, documents: Vec<Document>) -> Self {
        self.extra = documents;
        self
    }

    /// Point the last page's `next_page` back at page `page` (1-based)
    pub fn with_loop_back(mut self, page: usize) -> Self {
        self.loop_back = Some(page);
        self
    }

    /// Make requests for page `page` (1-based) fail until cleared
    pub fn fail_page(&self, page: usize) {
        self.failing.lock().unwrap().insert(page);
    }

    pub fn heal_page(&self, page: usize) {
        self.failing.lock().unwrap().remove(&page);
    }

    /// Pages requested so far, `None` marking uid lookups
    pub fn calls(&self) -> Vec<Option<usize>> {
        self.calls.lock().unwrap().clone()
    }

    fn page_number(cursor: Option<&Cursor>) -> usize {
        cursor
            .and_then(|c| {
                c.url()
                    .query_pairs()
                    .find(|(k, _)| k == "page")
                    .and_then(|(_, v)| v.parse().ok())
            })
            .unwrap_or(1)
    }
}

impl ContentSource for MemorySource {
    async fn list_by_type(
        &self,
        _document_type: &str,
        _page_size: u32,
        cursor: Option<&Cursor>,
    ) -> Result<DocumentPage> {
        let number = Self::page_number(cursor);
        self.calls.lock().unwrap().push(Some(number));

        if self.failing.lock().unwrap().contains(&number) {
            return Err(ClientError::Status {
                url: format!("{}?page={}", MEMORY_SEARCH, number),
                status: 500,
            });
        }

        let results = self.pages.get(number - 1).cloned().unwrap_or_default();
        let next_page = if number < self.pages.len() {
            Some(format!("{}?page={}", MEMORY_SEARCH, number + 1))
        } else {
            self.loop_back
                .map(|page| format!("{}?page={}", MEMORY_SEARCH, page))
        };

        Ok(DocumentPage {
            results,
            next_page,
            page: number as u32,
            total_pages: self.pages.len() as u32,
            total_results_size: self.pages.iter().map(Vec::len).sum::<usize>() as u32,
        })
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Document> {
        self.calls.lock().unwrap().push(None);
        self.pages
            .iter()
            .flatten()
            .chain(self.extra.iter())
            .find(|d| d.uid.as_deref() == Some(uid))
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                document_type: document_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

struct CmsState {
    base: String,
    documents: Vec<Value>,
    requests: Mutex<Vec<String>>,
}

/// A local HTTP server speaking the subset of the CMS API the client uses
///
/// Lists one document per page.
pub struct FakeCms {
    base: String,
    state: Arc<CmsState>,
}

impl FakeCms {
    pub async fn spawn(documents: Vec<Value>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(CmsState {
            base: base.clone(),
            documents,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/v2", get(api_root))
            .route("/api/v2/documents/search", get(search))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, state }
    }

    /// API root to configure the client with
    pub fn endpoint(&self) -> String {
        format!("{}/api/v2", self.base)
    }

    /// Path and query of every request served so far
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

fn record(state: &CmsState, uri: &Uri) {
    state.requests.lock().unwrap().push(uri.to_string());
}

async fn api_root(State(state): State<Arc<CmsState>>, uri: Uri) -> Json<Value> {
    record(&state, &uri);
    Json(json!({
        "refs": [
            { "id": "preview", "ref": "preview-ref", "label": "Preview", "isMasterRef": false },
            { "id": "master", "ref": "master-ref", "label": "Master", "isMasterRef": true }
        ]
    }))
}

async fn search(
    State(state): State<Arc<CmsState>>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    record(&state, &uri);

    if params.get("ref").map(String::as_str) != Some("master-ref") {
        return (StatusCode::BAD_REQUEST, "missing ref").into_response();
    }

    let query = params.get("q").cloned().unwrap_or_default();
    let quoted = query.split('"').nth(1).unwrap_or("").to_string();

    if query.contains(".uid,") {
        let results: Vec<Value> = state
            .documents
            .iter()
            .filter(|d| d["uid"] == quoted.as_str())
            .cloned()
            .collect();
        return Json(json!({ "page": 1, "total_pages": 1, "next_page": null, "results": results }))
            .into_response();
    }

    let documents: Vec<&Value> = state
        .documents
        .iter()
        .filter(|d| d["type"] == quoted.as_str())
        .collect();
    let page: usize = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let results: Vec<Value> = documents.get(page - 1).map(|d| vec![(*d).clone()]).unwrap_or_default();

    let next_page = if page < documents.len() {
        let mut next = format!(
            "{}/api/v2/documents/search?ref=master-ref&q={}&page={}&pageSize=1",
            state.base,
            url_encode(&query),
            page + 1
        );
        if let Some(token) = params.get("access_token") {
            next.push_str(&format!("&access_token={}", token));
        }
        Value::String(next)
    } else {
        Value::Null
    };

    Json(json!({
        "page": page,
        "total_pages": documents.len(),
        "total_results_size": documents.len(),
        "next_page": next_page,
        "results": results
    }))
    .into_response()
}

fn url_encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}
