//! Generator module - renders the blog into static files using the built-in
//! Tera theme
//!
//! Output layout:
//!
//! - `index.html`: first page of the post list
//! - `api/posts/{n}.json`: following list pages, when prerendered
//! - `post/{slug}/index.html`: one page per post
//! - `css/`, `images/`: theme assets, overridden by files in the source dir

use anyhow::{Context as _, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::client::{list_all, ContentSource, Cursor, Document};
use crate::config::PaginationMode;
use crate::content::feed::{fetch_page, FeedQuery};
use crate::content::{LoadMoreOutcome, Mapper, PostFeed};
use crate::helpers::{
    continuation_path, is_valid_slug, live_continuation_path, post_path, url_for,
};
use crate::i18n::I18n;
use crate::templates::{LoadMoreResponse, TemplateRenderer, LOGO_SVG, STYLE_CSS};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Posts on the first list page
    pub listed: usize,
    /// Prerendered "load more" pages
    pub continuation_pages: usize,
    /// Post pages written
    pub posts: usize,
}

/// Static site generator over a content source
pub struct Generator<S> {
    blog: Blog,
    source: S,
    mapper: Mapper,
    renderer: TemplateRenderer,
}

impl<S: ContentSource> Generator<S> {
    /// Create a new generator
    pub fn new(blog: &Blog, source: S) -> Result<Self> {
        let mapper = Mapper::from_config(&blog.config)?;

        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(blog.base_dir.join("languages"))?;
        let renderer = TemplateRenderer::new(&blog.config, &i18n)?;

        Ok(Self {
            blog: blog.clone(),
            source,
            mapper,
            renderer,
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    fn query(&self) -> FeedQuery {
        FeedQuery {
            document_type: self.blog.config.api.document_type.clone(),
            page_size: self.blog.config.api.page_size,
        }
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.write_theme_assets()?;
        self.copy_source_assets()?;

        let feed = PostFeed::first_page(&self.source, &self.mapper, &self.query())
            .await
            .context("Failed to fetch the post list")?;
        let continuation_pages = self.generate_index(&feed).await?;
        let posts = self.generate_post_pages().await?;

        Ok(GenerateReport {
            listed: feed.len(),
            continuation_pages,
            posts,
        })
    }

    /// Write the list page and, when prerendering, every following page
    async fn generate_index(&self, feed: &PostFeed) -> Result<usize> {
        let mode = self.blog.config.pagination.mode;
        let next = feed.cursor().map(|cursor| match mode {
            PaginationMode::Prerendered => continuation_path(2),
            PaginationMode::Live => live_continuation_path(cursor),
        });

        let html = self.renderer.render_index(feed.posts(), next.as_deref())?;
        write_file(&self.blog.public_dir.join("index.html"), &html)?;
        tracing::debug!("Generated index with {} posts", feed.len());

        match mode {
            PaginationMode::Prerendered => {
                self.generate_continuations(feed.cursor().cloned()).await
            }
            PaginationMode::Live => Ok(0),
        }
    }

    /// Follow the cursor chain and write each page as a load-more response
    async fn generate_continuations(&self, mut cursor: Option<Cursor>) -> Result<usize> {
        let query = self.query();
        let mut seen = HashSet::new();
        let mut number = 2;

        while let Some(current) = cursor {
            if !seen.insert(current.token().to_string()) {
                tracing::warn!("Cursor {} was already followed, stopping", current);
                break;
            }

            let page = fetch_page(&self.source, &self.mapper, &query, Some(&current))
                .await
                .with_context(|| format!("Failed to fetch list page {}", number))?;

            let response = LoadMoreResponse::Loaded {
                html: self.renderer.render_cards(&page.posts)?,
                count: page.posts.len(),
                next: page
                    .next
                    .as_ref()
                    .map(|_| url_for(&self.blog.config, &continuation_path(number + 1))),
            };

            let output_path = self.blog.public_dir.join(continuation_path(number));
            write_file(&output_path, &serde_json::to_string(&response)?)?;
            tracing::debug!("Generated: {:?}", output_path);

            cursor = page.next;
            number += 1;
        }

        let written = number - 2;
        if written > 0 {
            tracing::info!("Generated {} list continuation pages", written);
        }
        Ok(written)
    }

    /// List every post and write its page
    async fn generate_post_pages(&self) -> Result<usize> {
        let api = &self.blog.config.api;
        let documents = list_all(&self.source, &api.document_type, api.paths_page_size).await?;
        let mut written = 0;

        for doc in &documents {
            let Some(slug) = Mapper::usable_slug(doc) else {
                tracing::warn!("Skipping document {} with uid {:?}", doc.id, doc.uid);
                continue;
            };

            self.write_post(doc)
                .with_context(|| format!("Failed to generate post {}", slug))?;
            written += 1;
        }

        tracing::info!("Generated {} post pages", written);
        Ok(written)
    }

    fn write_post(&self, doc: &Document) -> Result<PathBuf> {
        let post = self.mapper.detail(doc)?;
        let html = self.renderer.render_post(&post)?;
        let output_path = self.post_output_path(&post.slug);
        write_file(&output_path, &html)?;
        tracing::debug!("Generated post: {:?}", output_path);
        Ok(output_path)
    }

    /// Resolve one post by slug and write its page
    ///
    /// A missing document surfaces as a [`ClientError`](crate::client::ClientError)
    /// that reports `is_not_found()`.
    pub async fn generate_post(&self, slug: &str) -> Result<PathBuf> {
        if !is_valid_slug(slug) {
            anyhow::bail!("Invalid slug: {:?}", slug);
        }
        let doc = self
            .source
            .get_by_uid(&self.blog.config.api.document_type, slug)
            .await?;
        self.write_post(&doc)
    }

    /// Where the page of a post is written
    pub fn post_output_path(&self, slug: &str) -> PathBuf {
        self.blog.public_dir.join(post_path(slug)).join("index.html")
    }

    /// Fetch the page after `cursor` for the live load-more endpoint
    pub async fn continuation(&self, cursor: &Cursor) -> LoadMoreResponse {
        let config = &self.blog.config;
        let mut feed = PostFeed::new(Vec::new(), Some(cursor.clone()));

        match feed.load_more(&self.source, &self.mapper, &self.query()).await {
            LoadMoreOutcome::Loaded { posts, next } => match self.renderer.render_cards(&posts) {
                Ok(html) => LoadMoreResponse::Loaded {
                    html,
                    count: posts.len(),
                    next: next.map(|c| url_for(config, &live_continuation_path(&c))),
                },
                Err(e) => LoadMoreResponse::Failed {
                    error: e.to_string(),
                    retry: url_for(config, &live_continuation_path(cursor)),
                },
            },
            LoadMoreOutcome::Exhausted => LoadMoreResponse::Loaded {
                html: String::new(),
                count: 0,
                next: None,
            },
            LoadMoreOutcome::Failed { error, retry } => LoadMoreResponse::Failed {
                error,
                retry: url_for(config, &live_continuation_path(&retry)),
            },
        }
    }

    /// Write the embedded stylesheet and logo
    fn write_theme_assets(&self) -> Result<()> {
        let public_dir = &self.blog.public_dir;
        write_file(&public_dir.join("css/style.css"), STYLE_CSS)?;
        write_file(&public_dir.join("images/logo.svg"), LOGO_SVG)?;
        Ok(())
    }

    /// Copy source assets (images, stylesheets) to the public directory
    fn copy_source_assets(&self) -> Result<()> {
        let source_dir = &self.blog.source_dir;
        if !source_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(source_dir)?;
            let dest = self.blog.public_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            tracing::debug!("Copied asset: {:?}", relative);
        }

        Ok(())
    }
}

/// Write a file, creating its parent directories
fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, contents).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::config::SiteConfig;
    use crate::testing::{post_document, MemorySource};
    use tempfile::TempDir;

    fn blog(dir: &TempDir, mode: PaginationMode) -> Blog {
        let mut config = SiteConfig::default();
        config.pagination.mode = mode;
        Blog::with_config(dir.path(), config)
    }

    fn three_pages() -> MemorySource {
        MemorySource::with_pages(vec![
            vec![post_document("um", "Um")],
            vec![post_document("dois", "Dois")],
            vec![post_document("tres", "Três")],
        ])
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_generate_prerendered() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Prerendered);
        let generator = Generator::new(&blog, three_pages()).unwrap();

        let report = generator.generate().await.unwrap();
        assert_eq!(
            report,
            GenerateReport {
                listed: 1,
                continuation_pages: 2,
                posts: 3
            }
        );

        let index = read(blog.public_dir.join("index.html"));
        assert!(index.contains(r#"href="/post/um/""#));
        assert!(!index.contains(r#"href="/post/dois/""#));
        assert!(index.contains(r#"data-next="/api/posts/2.json""#));

        let second: serde_json::Value =
            serde_json::from_str(&read(blog.public_dir.join("api/posts/2.json"))).unwrap();
        assert_eq!(second["status"], "loaded");
        assert_eq!(second["count"], 1);
        assert_eq!(second["next"], "/api/posts/3.json");
        assert!(second["html"].as_str().unwrap().contains("/post/dois/"));

        let third: serde_json::Value =
            serde_json::from_str(&read(blog.public_dir.join("api/posts/3.json"))).unwrap();
        assert!(third["next"].is_null());
        assert!(!blog.public_dir.join("api/posts/4.json").exists());

        for slug in ["um", "dois", "tres"] {
            assert!(blog.public_dir.join(format!("post/{}/index.html", slug)).exists());
        }
        let post = read(blog.public_dir.join("post/um/index.html"));
        assert!(post.contains("0 min"));

        assert!(blog.public_dir.join("css/style.css").exists());
        assert!(blog.public_dir.join("images/logo.svg").exists());
    }

    #[tokio::test]
    async fn test_unusable_uid_gets_neither_card_nor_page() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Prerendered);
        let source = MemorySource::with_pages(vec![
            vec![post_document("um", "Um"), post_document("com espaco", "Com espaço")],
            vec![post_document("dois", "Dois")],
        ]);
        let generator = Generator::new(&blog, source).unwrap();

        let report = generator.generate().await.unwrap();
        assert_eq!(report.listed, 1);
        assert_eq!(report.posts, 2);

        let index = read(blog.public_dir.join("index.html"));
        assert!(index.contains(r#"href="/post/um/""#));
        assert!(!index.contains("Com espaço"));
        assert_eq!(index.matches(r#"class="post-card""#).count(), 1);
    }

    #[tokio::test]
    async fn test_generate_single_page_has_no_load_more() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Prerendered);
        let source = MemorySource::with_pages(vec![vec![post_document("unico", "Único")]]);
        let generator = Generator::new(&blog, source).unwrap();

        let report = generator.generate().await.unwrap();
        assert_eq!(report.continuation_pages, 0);

        let index = read(blog.public_dir.join("index.html"));
        assert!(!index.contains(r#"id="load-more""#));
        assert!(!blog.public_dir.join("api").exists());
    }

    #[tokio::test]
    async fn test_generate_live_links_to_endpoint() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Live);
        let generator = Generator::new(&blog, three_pages()).unwrap();

        let report = generator.generate().await.unwrap();
        assert_eq!(report.continuation_pages, 0);

        let index = read(blog.public_dir.join("index.html"));
        assert!(index.contains(r#"data-next="/api/posts?cursor=https%3A%2F%2Fcms%2Etest"#));
    }

    #[tokio::test]
    async fn test_source_assets_override_theme() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Prerendered);
        fs::create_dir_all(blog.source_dir.join("css")).unwrap();
        fs::write(blog.source_dir.join("css/style.css"), "body{}").unwrap();
        fs::write(blog.source_dir.join("favicon.ico"), "icon").unwrap();

        let source = MemorySource::with_pages(vec![vec![]]);
        Generator::new(&blog, source).unwrap().generate().await.unwrap();

        assert_eq!(read(blog.public_dir.join("css/style.css")), "body{}");
        assert_eq!(read(blog.public_dir.join("favicon.ico")), "icon");
    }

    #[tokio::test]
    async fn test_failed_list_fails_the_build() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Prerendered);
        let source = three_pages();
        source.fail_page(2);

        let generator = Generator::new(&blog, source).unwrap();
        assert!(generator.generate().await.is_err());
    }

    #[tokio::test]
    async fn test_generate_post_on_demand() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Prerendered);
        let source = MemorySource::with_pages(vec![vec![]])
            .with_unlisted(vec![post_document("novo", "Novo")]);
        let generator = Generator::new(&blog, source).unwrap();

        let path = generator.generate_post("novo").await.unwrap();
        assert_eq!(path, blog.public_dir.join("post/novo/index.html"));
        assert!(read(path).contains("Novo"));

        let err = generator.generate_post("sumiu").await.unwrap_err();
        assert!(err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_not_found));

        assert!(generator.generate_post("../etc").await.is_err());
    }

    #[tokio::test]
    async fn test_live_continuation() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Live);
        let source = three_pages();
        let first = source.list_by_type("post", 1, None).await.unwrap();
        let cursor = first.next_cursor().unwrap().unwrap();
        let generator = Generator::new(&blog, source).unwrap();

        match generator.continuation(&cursor).await {
            LoadMoreResponse::Loaded { html, count, next } => {
                assert_eq!(count, 1);
                assert!(html.contains("/post/dois/"));
                assert!(next.unwrap().starts_with("/api/posts?cursor="));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_live_continuation_failure_offers_retry() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir, PaginationMode::Live);
        let source = three_pages();
        let first = source.list_by_type("post", 1, None).await.unwrap();
        let cursor = first.next_cursor().unwrap().unwrap();
        source.fail_page(2);
        let generator = Generator::new(&blog, source).unwrap();

        match generator.continuation(&cursor).await {
            LoadMoreResponse::Failed { retry, .. } => {
                assert_eq!(
                    retry,
                    url_for(&blog.config, &live_continuation_path(&cursor))
                );
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
