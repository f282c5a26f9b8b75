//! Catalog discovery sources
//!
//! The catalog never performs discovery transport itself; it asks a
//! [`CatalogSource`] for raw entries and normalizes whatever comes back.

use super::CatalogEntry;
use crate::error::CatalogError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

/// Produces the raw list of available backends
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn discover(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Fixed in-memory list
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: Vec<CatalogEntry>,
}

impl StaticSource {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl CatalogSource for StaticSource {
    async fn discover(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.entries.clone())
    }
}

/// On-disk catalog layout: a list of `[[models]]` tables
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    models: Vec<CatalogEntry>,
}

/// TOML catalog file, re-read on every discovery
///
/// ```toml
/// [[models]]
/// provider = "ollama"
/// id = "qwen2.5-coder:32k"
/// display_name = "Qwen 2.5 Coder"
/// cost = { input = 0.0, output = 0.0 }
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse catalog TOML content
    pub fn parse(content: &str, origin: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| CatalogError::Parse {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        Ok(file.models)
    }
}

#[async_trait]
impl CatalogSource for FileSource {
    async fn discover(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let path_display = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::FileRead {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;

        let entries = Self::parse(&content, &path_display)?;
        tracing::debug!(
            path = %path_display,
            models = entries.len(),
            "Read catalog file"
        );
        Ok(entries)
    }
}
