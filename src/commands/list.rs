//! List posts published in the backend

use anyhow::Result;

use crate::client::{list_all, ContentSource};
use crate::content::{Mapper, PostSummary};
use crate::Blog;

/// Print every post with its date and slug
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let mapper = Mapper::from_config(&blog.config)?;
    let posts = collect(&client, &mapper, blog).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!(
            "  {} - {} [{}]",
            post.date.as_deref().unwrap_or("----"),
            post.title,
            post.slug
        );
    }

    Ok(())
}

async fn collect<S: ContentSource>(
    source: &S,
    mapper: &Mapper,
    blog: &Blog,
) -> Result<Vec<PostSummary>> {
    let api = &blog.config.api;
    let documents = list_all(source, &api.document_type, api.paths_page_size).await?;
    Ok(mapper.summaries(&documents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::testing::{post_document, MemorySource};

    #[tokio::test]
    async fn test_collect_walks_every_page() {
        let blog = Blog::with_config(".", SiteConfig::default());
        let mapper = Mapper::from_config(&blog.config).unwrap();
        let source = MemorySource::with_pages(vec![
            vec![post_document("um", "Um"), post_document("dois", "Dois")],
            vec![post_document("tres", "Três")],
        ]);

        let posts = collect(&source, &mapper, &blog).await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["um", "dois", "tres"]);
    }

    #[tokio::test]
    async fn test_collect_stops_on_cursor_cycle() {
        let blog = Blog::with_config(".", SiteConfig::default());
        let mapper = Mapper::from_config(&blog.config).unwrap();
        let source = MemorySource::with_pages(vec![
            vec![post_document("um", "Um")],
            vec![post_document("dois", "Dois")],
            vec![post_document("tres", "Três")],
        ])
        .with_loop_back(2);

        let posts = collect(&source, &mapper, &blog).await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["um", "dois", "tres"]);
    }
}
