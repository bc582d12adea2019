//! Opaque continuation cursor

use std::fmt;
use url::Url;

use super::{ClientError, Result};

/// Query parameter holding the API access token
pub(crate) const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Points at the next page of a document listing
///
/// Wraps the `next_page` URL reported by the backend with the access token
/// removed, so the token form of a cursor can be handed to browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(Url);

impl Cursor {
    /// Build a cursor from a backend `next_page` URL
    pub fn from_next_page(next_page: &str) -> Result<Self> {
        let url = Url::parse(next_page).map_err(|source| ClientError::InvalidUrl {
            url: next_page.to_string(),
            source,
        })?;
        Ok(Self(strip_access_token(url)))
    }

    /// Rebuild a cursor from its token form
    pub fn from_token(token: &str) -> Result<Self> {
        Self::from_next_page(token)
    }

    /// Token form of the cursor
    pub fn token(&self) -> &str {
        self.0.as_str()
    }

    /// URL the cursor points at, without credentials
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Remove the access token from a URL's query
pub(crate) fn strip_access_token(mut url: Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != ACCESS_TOKEN_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_strips_access_token() {
        let cursor = Cursor::from_next_page(
            "https://blog.cdn.prismic.io/api/v2/documents/search?ref=YF&access_token=secret&page=2&pageSize=1",
        )
        .unwrap();
        assert!(!cursor.token().contains("secret"));
        assert!(cursor.token().contains("page=2"));
        assert!(cursor.token().contains("ref=YF"));
    }

    #[test]
    fn test_token_round_trip() {
        let cursor =
            Cursor::from_next_page("https://blog.cdn.prismic.io/api/v2/documents/search?page=3")
                .unwrap();
        let again = Cursor::from_token(cursor.token()).unwrap();
        assert_eq!(cursor, again);
    }

    #[test]
    fn test_invalid_cursor() {
        let err = Cursor::from_next_page("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }
}
