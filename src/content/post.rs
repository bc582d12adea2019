//! Post view models

use serde::{Deserialize, Serialize};

use crate::richtext::TrustedHtml;

/// A post as shown in the list page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique slug
    pub slug: String,

    /// Formatted publication date, `None` for unpublished documents
    pub date: Option<String>,

    pub title: String,

    pub subtitle: String,

    pub author: String,
}

/// A post as shown in its own page
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub slug: String,

    pub date: Option<String>,

    pub title: String,

    pub subtitle: String,

    pub author: String,

    pub banner: Option<Banner>,

    /// Content sections in document order
    pub content: Vec<ContentBlock>,

    /// Words across all section headings and bodies
    pub word_count: usize,

    /// Estimated reading time
    pub reading_minutes: u64,
}

/// Banner image of a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub url: String,
    pub alt: String,
}

/// One section of a post body
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    /// Heading as plain text
    pub heading: String,

    /// Fragment id for the heading
    pub anchor: String,

    pub body: TrustedHtml,
}
