//! HTML helper functions

/// Escape text for HTML content and attribute values
///
/// Slashes are left alone so URLs stay readable.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
