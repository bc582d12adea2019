//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable that overrides `api.access_token`
pub const ACCESS_TOKEN_ENV: &str = "CMS_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub source_dir: String,
    pub public_dir: String,

    // Content backend
    pub api: ApiConfig,

    // Post rendering
    pub content: ContentConfig,

    // List page
    pub pagination: PaginationConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            source_dir: "source".to_string(),
            public_dir: "public".to_string(),

            api: ApiConfig::default(),
            content: ContentConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Take the access token from the environment when it is set there
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                self.api.access_token = Some(token);
            }
        }
    }

    /// Reject values the renderer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be at least 1");
        }
        if self.api.paths_page_size == 0 {
            anyhow::bail!("api.paths_page_size must be at least 1");
        }
        if self.content.words_per_minute == 0 {
            anyhow::bail!("content.words_per_minute must be at least 1");
        }
        if self.api.document_type.trim().is_empty() {
            anyhow::bail!("api.document_type must not be empty");
        }
        Ok(())
    }
}

/// Content backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of the blog posts
    pub document_type: String,
    /// Posts per list request
    pub page_size: u32,
    /// Page size used when listing every post for detail pages
    pub paths_page_size: u32,
    /// Optional orderings predicate, e.g. `[document.first_publication_date desc]`
    pub orderings: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://your-repository.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "post".to_string(),
            page_size: 1,
            paths_page_size: 100,
            orderings: None,
        }
    }
}

/// Post rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Unicode date pattern (date-fns style)
    pub date_format: String,
    pub locale: String,
    pub timezone: String,
    pub words_per_minute: u32,
    /// Emit provider HTML of embed blocks verbatim
    pub trust_embed_html: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            date_format: "dd MMM yyyy".to_string(),
            locale: "pt-BR".to_string(),
            timezone: "UTC".to_string(),
            words_per_minute: 200,
            trust_embed_html: false,
        }
    }
}

/// How "load more" reaches the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// Continuation pages are fetched at build time and written as JSON
    #[default]
    Prerendered,
    /// Continuation pages are fetched on demand by the server
    Live,
}

/// List page configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PaginationConfig {
    pub mode: PaginationMode,
}
