//! Internationalization (i18n) support
//!
//! Interface strings come from built-in tables for Portuguese and English and
//! may be overridden per language by `languages/<lang>.yml` in the site
//! directory.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const PT_BR: &[(&str, &str)] = &[
    ("load_more", "Carregar mais posts"),
    ("loading", "Carregando..."),
    ("load_failed", "Não foi possível carregar mais posts."),
    ("retry", "Tentar novamente"),
    ("minutes", "min"),
    ("not_found", "Post não encontrado"),
    ("back_home", "Voltar para o início"),
    ("no_posts", "Nenhum post publicado ainda."),
    ("banner_alt", "banner"),
];

const EN: &[(&str, &str)] = &[
    ("load_more", "Load more posts"),
    ("loading", "Loading..."),
    ("load_failed", "Could not load more posts."),
    ("retry", "Try again"),
    ("minutes", "min"),
    ("not_found", "Post not found"),
    ("back_home", "Back to home"),
    ("no_posts", "No posts published yet."),
    ("banner_alt", "banner"),
];

/// Interface strings used by the templates
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Labels {
    pub load_more: String,
    pub loading: String,
    pub load_failed: String,
    pub retry: String,
    pub minutes: String,
    pub not_found: String,
    pub back_home: String,
    pub no_posts: String,
    pub banner_alt: String,
}

/// Internationalization handler
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler with the built-in tables
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        translations.insert("pt-BR".to_string(), table(PT_BR));
        translations.insert("en".to_string(), table(EN));
        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Load override files from a directory
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }

            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, String>>(&content) {
                Ok(data) => {
                    self.translations
                        .entry(lang.to_string())
                        .or_default()
                        .extend(data);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key
    ///
    /// Falls back to the base language (`pt` for `pt-PT`), then English, then
    /// the key itself.
    pub fn get(&self, key: &str) -> String {
        let base = self.language.split(['-', '_']).next().unwrap_or("");
        let candidates = [self.language.as_str(), base, "en"];

        for lang in candidates {
            let found = self
                .translations
                .get(lang)
                .or_else(|| {
                    // "pt" resolves to the built-in "pt-BR" table
                    self.translations
                        .iter()
                        .find(|(name, _)| name.starts_with(lang) && !lang.is_empty())
                        .map(|(_, t)| t)
                })
                .and_then(|t| t.get(key));
            if let Some(value) = found {
                return value.clone();
            }
        }

        key.to_string()
    }

    /// All labels for the current language
    pub fn labels(&self) -> Labels {
        Labels {
            load_more: self.get("load_more"),
            loading: self.get("loading"),
            load_failed: self.get("load_failed"),
            retry: self.get("retry"),
            minutes: self.get("minutes"),
            not_found: self.get("not_found"),
            back_home: self.get("back_home"),
            no_posts: self.get("no_posts"),
            banner_alt: self.get("banner_alt"),
        }
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
