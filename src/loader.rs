//! Template loading
//!
//! The compiler never touches the filesystem itself; sources arrive through a
//! [`TemplateLoader`]. Two loaders are provided: one searching an ordered list
//! of directories, and an in-memory one for embedding and tests.

use dashmap::DashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Template not found: {id} (searched: {})", display_paths(.searched))]
    NotFound { id: String, searched: Vec<PathBuf> },

    #[error("Failed to read template {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid template id '{id}': {reason}")]
    InvalidId { id: String, reason: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw template text plus the id it was loaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub id: String,
    pub content: String,
}

impl TemplateSource {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

pub trait TemplateLoader: Send + Sync {
    fn load(&self, id: &str) -> Result<TemplateSource, LoaderError>;

    /// True when `id` can be loaded
    fn exists(&self, id: &str) -> bool {
        self.load(id).is_ok()
    }
}

/// Loads templates from an ordered list of directories; the first directory
/// containing the id wins
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    dirs: Vec<PathBuf>,
}

impl FileSystemLoader {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }
}

/// Reject ids that could escape the search directories
fn check_relative_id(id: &str) -> Result<&Path, LoaderError> {
    let path = Path::new(id);
    let invalid = |reason: &str| LoaderError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };
    if id.is_empty() {
        return Err(invalid("empty id"));
    }
    if path.is_absolute() || id.starts_with('/') || id.starts_with('\\') {
        return Err(invalid("absolute paths are not allowed"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir | Component::Prefix(_))) {
        return Err(invalid("parent directory references are not allowed"));
    }
    Ok(path)
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, id: &str) -> Result<TemplateSource, LoaderError> {
        let relative = check_relative_id(id)?;
        let mut searched = Vec::with_capacity(self.dirs.len());

        for dir in &self.dirs {
            let candidate = dir.join(relative);
            if candidate.is_file() {
                log::trace!("Loading {} from {}", id, candidate.display());
                let content = fs::read_to_string(&candidate).map_err(|source| LoaderError::Io {
                    id: id.to_string(),
                    source,
                })?;
                return Ok(TemplateSource::new(id, content));
            }
            searched.push(candidate);
        }

        Err(LoaderError::NotFound {
            id: id.to_string(),
            searched,
        })
    }
}

/// Concurrent in-memory template store
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: DashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let loader = Self::new();
        for (id, content) in templates {
            loader.insert(id, content);
        }
        loader
    }

    /// Add or replace a template, returning the previous content
    pub fn insert(&self, id: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.templates.insert(id.into(), content.into())
    }

    pub fn remove(&self, id: &str) -> Option<String> {
        self.templates.remove(id).map(|(_, content)| content)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, id: &str) -> Result<TemplateSource, LoaderError> {
        self.templates
            .get(id)
            .map(|entry| TemplateSource::new(id, entry.value().clone()))
            .ok_or_else(|| LoaderError::NotFound {
                id: id.to_string(),
                searched: Vec::new(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filesystem_first_dir_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::create_dir_all(first.path().join("cotton")).unwrap();
        fs::create_dir_all(second.path().join("cotton")).unwrap();
        fs::write(second.path().join("cotton/card.html"), "second").unwrap();
        fs::write(second.path().join("view.html"), "view").unwrap();

        let loader = FileSystemLoader::new([first.path(), second.path()]);
        assert_eq!(loader.load("cotton/card.html").unwrap().content, "second");

        fs::write(first.path().join("cotton/card.html"), "first").unwrap();
        assert_eq!(loader.load("cotton/card.html").unwrap().content, "first");
        assert!(loader.exists("view.html"));
    }

    #[test]
    fn test_filesystem_not_found_lists_searched() {
        let dir = TempDir::new().unwrap();
        let loader = FileSystemLoader::new([dir.path()]);
        match loader.load("cotton/missing.html").unwrap_err() {
            LoaderError::NotFound { id, searched } => {
                assert_eq!(id, "cotton/missing.html");
                assert_eq!(searched, vec![dir.path().join("cotton/missing.html")]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_filesystem_rejects_escaping_ids() {
        let dir = TempDir::new().unwrap();
        let loader = FileSystemLoader::new([dir.path()]);
        assert!(matches!(loader.load("../secret.html"), Err(LoaderError::InvalidId { .. })));
        assert!(matches!(loader.load("cotton/../../x"), Err(LoaderError::InvalidId { .. })));
        assert!(matches!(loader.load("/etc/passwd"), Err(LoaderError::InvalidId { .. })));
        assert!(matches!(loader.load(""), Err(LoaderError::InvalidId { .. })));
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::with_templates([("a.html", "A")]);
        assert_eq!(loader.load("a.html").unwrap(), TemplateSource::new("a.html", "A"));
        assert_eq!(loader.insert("a.html", "B"), Some("A".to_string()));
        assert_eq!(loader.load("a.html").unwrap().content, "B");
        assert!(!loader.exists("b.html"));
        assert_eq!(loader.remove("a.html"), Some("B".to_string()));
        assert!(loader.is_empty());
    }
}
