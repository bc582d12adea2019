//! Built-in blog theme using the Tera template engine
//!
//! All templates are embedded in the binary. Autoescaping is on for every
//! template; the only value emitted unescaped is post body HTML, which is a
//! [`TrustedHtml`](crate::richtext::TrustedHtml) produced by the rich text
//! serializer.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{PostDetail, PostSummary};
use crate::helpers::{full_url_for, html_escape, post_path, url_for};
use crate::i18n::{I18n, Labels};

/// Default stylesheet, written to `css/style.css`
pub const STYLE_CSS: &str = include_str!("theme/assets/style.css");

/// Default logo, written to `images/logo.svg`
pub const LOGO_SVG: &str = include_str!("theme/assets/logo.svg");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteConfig,
    config: ConfigData,
    labels: Labels,
}

impl TemplateRenderer {
    /// Create a renderer with all theme templates loaded
    pub fn new(config: &SiteConfig, i18n: &I18n) -> Result<Self> {
        let mut tera = Tera::default();
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("loading.html", include_str!("theme/loading.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
            ("cards.html", include_str!("theme/cards.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("theme/partials/post_card.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("theme/partials/post_info.html"),
            ),
        ])?;

        tera.register_function(
            "url_for",
            UrlFor {
                config: config.clone(),
            },
        );

        Ok(Self {
            tera,
            site: config.clone(),
            config: ConfigData::from(config),
            labels: i18n.labels(),
        })
    }

    /// Context with the variables every page uses
    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("config", &self.config);
        context.insert("labels", &self.labels);
        context
    }

    fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Render the list page
    ///
    /// `next` is the site path "load more" fetches; without it the control
    /// is left out.
    pub fn render_index(&self, posts: &[PostSummary], next: Option<&str>) -> Result<String> {
        let mut context = self.base_context();
        context.insert("posts", posts);
        context.insert("next", &next);
        self.render("index.html", &context)
    }

    /// Render list entries appended by "load more"
    pub fn render_cards(&self, posts: &[PostSummary]) -> Result<String> {
        let mut context = self.base_context();
        context.insert("posts", posts);
        Ok(self.render("cards.html", &context)?.trim().to_string())
    }

    /// Render a post page
    pub fn render_post(&self, post: &PostDetail) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", post);
        context.insert("permalink", &full_url_for(&self.site, &post_path(&post.slug)));
        self.render("post.html", &context)
    }

    /// Render the placeholder shown while a post is resolved
    pub fn render_loading(&self) -> Result<String> {
        self.render("loading.html", &self.base_context())
    }

    /// Render the page for a post that does not exist
    pub fn render_not_found(&self) -> Result<String> {
        self.render("not_found.html", &self.base_context())
    }
}

/// Tera function: `url_for(path=...)` prefixed with the site root
struct UrlFor {
    config: SiteConfig,
}

impl tera::Function for UrlFor {
    fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        let path = match args.get("path") {
            Some(val) => tera::try_get_value!("url_for", "path", String, val),
            None => String::new(),
        };
        Ok(tera::Value::String(html_escape(&url_for(&self.config, &path))))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Site settings available to templates
#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub url: String,
    pub root: String,
}

impl From<&SiteConfig> for ConfigData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: config.root.clone(),
        }
    }
}

/// JSON answer of a "load more" request
///
/// Prerendered continuation files and the live endpoint share this shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadMoreResponse {
    Loaded {
        /// Rendered list entries to append
        html: String,
        count: usize,
        /// Site path of the following page
        next: Option<String>,
    },
    Failed {
        error: String,
        /// Site path to request again
        retry: String,
    },
}
