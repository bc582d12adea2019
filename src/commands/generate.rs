//! Generate static files

use anyhow::Result;

use crate::generator::{GenerateReport, Generator};
use crate::Blog;

/// Fetch every post from the backend and write the site
pub async fn run(blog: &Blog) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let client = blog.client()?;
    tracing::info!("Fetching posts from {}", client.endpoint());

    let generator = Generator::new(blog, client)?;
    let report = generator.generate().await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts in {:.2}s",
        report.posts,
        duration.as_secs_f64()
    );

    Ok(report)
}
