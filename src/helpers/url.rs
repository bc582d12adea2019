//! URL helper functions

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::client::Cursor;
use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/hello/") // -> "https://example.com/blog/post/hello/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Site path of a post page
pub fn post_path(slug: &str) -> String {
    format!("post/{}/", slug)
}

/// Site path of the `n`th prerendered list page (`n >= 2`)
pub fn continuation_path(n: usize) -> String {
    format!("api/posts/{}.json", n)
}

/// Site path of the live endpoint that follows `cursor`
pub fn live_continuation_path(cursor: &Cursor) -> String {
    format!("api/posts?cursor={}", encode_url(cursor.token()))
}

/// Encode a URL component
pub fn encode_url(path: &str) -> String {
    utf8_percent_encode(path, NON_ALPHANUMERIC).to_string()
}

/// Whether a slug is safe to use as a single path segment
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}
