//! HTTP client for a Prismic-compatible REST API

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::cursor::{strip_access_token, ACCESS_TOKEN_PARAM};
use super::{ClientError, ContentSource, Cursor, Document, DocumentPage, Result};
use crate::config::ApiConfig;

/// A content release reported by the API root
#[derive(Debug, Clone, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

/// Content client backed by HTTP requests
///
/// Every request resolves the current master ref first; nothing is cached
/// between calls.
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    orderings: Option<String>,
}

impl PrismicClient {
    /// Create a client from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("headless-blog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Http {
                url: config.endpoint.clone(),
                source,
            })?;
        Self::with_http(config, http)
    }

    /// Create a client that sends its requests through `http`
    pub fn with_http(config: &ApiConfig, http: reqwest::Client) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|source| ClientError::InvalidUrl {
            url: config.endpoint.clone(),
            source,
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ClientError::InvalidEndpoint(config.endpoint.clone()));
        }

        Ok(Self {
            http,
            endpoint,
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            orderings: config.orderings.clone().filter(|o| !o.trim().is_empty()),
        })
    }

    /// The API root this client talks to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resolve the ref of the currently published content
    pub async fn master_ref(&self) -> Result<String> {
        let root: ApiRoot = self.get_json(self.authorize(self.endpoint.clone())).await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(ClientError::NoMasterRef)
    }

    /// Build a search URL for a predicate query
    fn search_url(&self, master_ref: &str, query: &str, page_size: u32) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push("documents")
            .push("search");

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ref", master_ref)
                .append_pair("q", query)
                .append_pair("pageSize", &page_size.to_string());
            if let Some(orderings) = &self.orderings {
                pairs.append_pair("orderings", orderings);
            }
        }

        Ok(self.authorize(url))
    }

    /// Add the access token to a request URL
    fn authorize(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            let present = url.query_pairs().any(|(k, _)| k == ACCESS_TOKEN_PARAM);
            if !present {
                url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let shown = strip_access_token(url.clone()).to_string();
        tracing::debug!("GET {}", shown);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                url: shown.clone(),
                source: source.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: shown,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| ClientError::Http {
            url: shown.clone(),
            source: source.without_url(),
        })?;

        serde_json::from_str(&body).map_err(|source| ClientError::Decode { url: shown, source })
    }
}

impl ContentSource for PrismicClient {
    async fn list_by_type(
        &self,
        document_type: &str,
        page_size: u32,
        cursor: Option<&Cursor>,
    ) -> Result<DocumentPage> {
        let url = match cursor {
            // The cursor already carries the ref, query and page size
            Some(cursor) => {
                if cursor.url().origin() != self.endpoint.origin() {
                    return Err(ClientError::ForeignCursor(cursor.to_string()));
                }
                self.authorize(cursor.url().clone())
            }
            None => {
                let master_ref = self.master_ref().await?;
                let query = format!(r#"[[at(document.type,"{}")]]"#, document_type);
                self.search_url(&master_ref, &query, page_size)?
            }
        };

        let page: DocumentPage = self.get_json(url).await?;
        tracing::debug!(
            "Fetched page {} of {} ({} documents)",
            page.page,
            page.total_pages,
            page.results.len()
        );
        Ok(page)
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Document> {
        let master_ref = self.master_ref().await?;
        let query = format!(r#"[[at(my.{}.uid,"{}")]]"#, document_type, uid);
        let url = self.search_url(&master_ref, &query, 1)?;

        let page: DocumentPage = self.get_json(url).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound {
                document_type: document_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post_json, FakeCms};

    fn config(endpoint: &str, token: Option<&str>) -> ApiConfig {
        ApiConfig {
            endpoint: endpoint.to_string(),
            access_token: token.map(str::to_string),
            ..ApiConfig::default()
        }
    }

    #[tokio::test]
    async fn test_master_ref() {
        let cms = FakeCms::spawn(vec![]).await;
        let client = PrismicClient::new(&config(&cms.endpoint(), None)).unwrap();
        assert_eq!(client.master_ref().await.unwrap(), "master-ref");
    }

    #[tokio::test]
    async fn test_list_and_follow_cursor() {
        let cms = FakeCms::spawn(vec![
            post_json("primeiro", "Primeiro"),
            post_json("segundo", "Segundo"),
        ])
        .await;
        let client = PrismicClient::new(&config(&cms.endpoint(), Some("secret"))).unwrap();

        let first = client.list_by_type("post", 1, None).await.unwrap();
        assert_eq!(first.results.len(), 1);
        assert_eq!(first.results[0].uid.as_deref(), Some("primeiro"));

        let cursor = first.next_cursor().unwrap().unwrap();
        assert!(!cursor.token().contains("secret"));

        let second = client.list_by_type("post", 1, Some(&cursor)).await.unwrap();
        assert_eq!(second.results[0].uid.as_deref(), Some("segundo"));
        assert!(second.next_cursor().unwrap().is_none());

        // Every request carried the token, the cursor request included
        let requests = cms.requests();
        assert!(requests.len() >= 3);
        assert!(requests.iter().all(|r| r.contains("access_token=secret")));
        assert!(requests.iter().any(|r| r.contains("ref=master-ref")));
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let cms = FakeCms::spawn(vec![post_json("como-utilizar-hooks", "Como utilizar Hooks")]).await;
        let client = PrismicClient::new(&config(&cms.endpoint(), None)).unwrap();

        let doc = client.get_by_uid("post", "como-utilizar-hooks").await.unwrap();
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));

        let err = client.get_by_uid("post", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_foreign_cursor_is_rejected() {
        let cms = FakeCms::spawn(vec![]).await;
        let client = PrismicClient::new(&config(&cms.endpoint(), Some("secret"))).unwrap();
        let cursor = Cursor::from_next_page("https://evil.example/steal?page=2").unwrap();

        let err = client.list_by_type("post", 1, Some(&cursor)).await.unwrap_err();
        assert!(matches!(err, ClientError::ForeignCursor(_)));
        assert!(cms.requests().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let cms = FakeCms::spawn(vec![]).await;
        let endpoint = format!("{}/missing", cms.endpoint());
        let client = PrismicClient::new(&config(&endpoint, Some("secret"))).unwrap();

        let err = client.master_ref().await.unwrap_err();
        match err {
            ClientError::Status { url, status } => {
                assert_eq!(status, 404);
                assert!(!url.contains("secret"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_search_url() {
        let mut api = config("https://blog.cdn.prismic.io/api/v2/", Some("tok"));
        api.orderings = Some("[document.first_publication_date desc]".to_string());
        let client = PrismicClient::new(&api).unwrap();

        let url = client
            .search_url("REF", r#"[[at(document.type,"post")]]"#, 3)
            .unwrap();
        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("ref".to_string(), "REF".to_string())));
        assert!(pairs.contains(&("pageSize".to_string(), "3".to_string())));
        assert!(pairs.contains(&(
            "orderings".to_string(),
            "[document.first_publication_date desc]".to_string()
        )));
        assert!(pairs.contains(&("access_token".to_string(), "tok".to_string())));
    }
}
