//! Content client - fetches documents from the headless CMS
//!
//! [`ContentSource`] is what the rest of the crate talks to. The HTTP
//! implementation lives in [`prismic`]; tests drive the renderers with an
//! in-memory source instead.

mod cursor;
pub mod prismic;

use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;

pub use cursor::Cursor;
pub use prismic::PrismicClient;

/// Errors returned by content sources
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("The API did not report a master ref")]
    NoMasterRef,

    #[error("No document of type {document_type} with uid {uid}")]
    NotFound { document_type: String, uid: String },

    #[error("Cursor {0} does not belong to the configured endpoint")]
    ForeignCursor(String),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Endpoint {0} cannot be used as a base URL")]
    InvalidEndpoint(String),
}

impl ClientError {
    /// Whether the error means the document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// A raw document as stored in the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub document_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of a document listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentPage {
    pub results: Vec<Document>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results_size: u32,
}

impl DocumentPage {
    /// Continuation cursor for the page after this one
    pub fn next_cursor(&self) -> Result<Option<Cursor>> {
        self.next_page
            .as_deref()
            .filter(|next| !next.is_empty())
            .map(Cursor::from_next_page)
            .transpose()
    }
}

/// Something documents can be fetched from
pub trait ContentSource: Send + Sync {
    /// List documents of a type
    ///
    /// `cursor` is `None` for the first page and the cursor of the previous
    /// page for every page after it.
    fn list_by_type(
        &self,
        document_type: &str,
        page_size: u32,
        cursor: Option<&Cursor>,
    ) -> impl Future<Output = Result<DocumentPage>> + Send;

    /// Fetch a single document by its unique identifier
    fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
    ) -> impl Future<Output = Result<Document>> + Send;
}

/// Every document of a type, following cursors until the listing ends
///
/// A cursor that was already followed ends the walk, so a listing whose
/// pages point back at each other still terminates.
pub async fn list_all<S: ContentSource>(
    source: &S,
    document_type: &str,
    page_size: u32,
) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    let mut followed = HashSet::new();
    let mut cursor: Option<Cursor> = None;

    loop {
        let page = source
            .list_by_type(document_type, page_size, cursor.as_ref())
            .await?;
        documents.extend(page.results.iter().cloned());

        match page.next_cursor()? {
            Some(next) if followed.insert(next.token().to_string()) => cursor = Some(next),
            Some(next) => {
                tracing::warn!("Cursor {} was already followed, stopping", next);
                break;
            }
            None => break,
        }
    }

    Ok(documents)
}
