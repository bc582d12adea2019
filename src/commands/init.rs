//! Initialize a new blog site

use anyhow::Result;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# Blog Configuration

# Site
title: Blog
description: ''
language: pt-BR

# URL
url: http://localhost:4000
root: /

# Directory
source_dir: source
public_dir: public

# Content backend (Prismic REST API v2)
api:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  # Prefer the CMS_ACCESS_TOKEN environment variable
  access_token:
  document_type: post
  page_size: 1
  paths_page_size: 100
  # orderings: '[document.first_publication_date desc]'

# Post rendering
content:
  date_format: dd MMM yyyy
  locale: pt-BR
  timezone: UTC
  words_per_minute: 200
  trust_embed_html: false

# List page ("load more")
pagination:
  # prerendered: write every list page at build time
  # live: fetch following pages through the server
  mode: prerendered
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("source/images"))?;
    fs::create_dir_all(target_dir.join("languages"))?;
    fs::write(&config_path, DEFAULT_CONFIG)?;

    tracing::info!("Created: {:?}", config_path);
    Ok(())
}
