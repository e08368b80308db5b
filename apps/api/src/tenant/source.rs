//! Where tenant datasets come from.
//!
//! `AppState` holds an `Arc<dyn TenantSource>`: `JsonDirSource` by default,
//! `PgTenantSource` when `DATABASE_URL` is set.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::portfolio::TenantDataset;

/// Reserved key of the fallback dataset. Loadable, never enumerated.
pub const DEFAULT_TENANT: &str = "default";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait TenantSource: Send + Sync {
    /// Every loadable key, the reserved default included.
    async fn tenant_keys(&self) -> Result<Vec<String>, SourceError>;

    /// `Ok(None)` when no dataset exists under `key`.
    async fn fetch(&self, key: &str) -> Result<Option<TenantDataset>, SourceError>;
}

/// Keys address files and URL segments; anything that could escape the data
/// directory is rejected before touching a backend.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
        && !key.starts_with('.')
}

/// Reads `<dir>/<key>.json`, one file per tenant.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TenantSource for JsonDirSource {
    async fn tenant_keys(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Data directory not found: {}", self.dir.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(SourceError::Io {
                    path: self.dir.display().to_string(),
                    source,
                })
            }
        };

        let mut keys = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| SourceError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_key(stem) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Option<TenantDataset>, SourceError> {
        let path = self.dir.join(format!("{key}.json"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Company data file not found: {}", path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(SourceError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let dataset = serde_json::from_str(&content).map_err(|source| SourceError::Malformed {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("acme"));
        assert!(is_valid_key("acme-corp_2"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(".."));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key(".hidden"));
    }

    #[tokio::test]
    async fn test_tenant_keys_lists_json_stems_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "zeta.json", "{}");
        write(dir.path(), "acme.json", "{}");
        write(dir.path(), "default.json", "{}");
        write(dir.path(), "notes.txt", "ignored");

        let source = JsonDirSource::new(dir.path());
        let keys = source.tenant_keys().await.unwrap();
        assert_eq!(keys, vec!["acme", "default", "zeta"]);
    }

    #[tokio::test]
    async fn test_missing_directory_yields_no_keys() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirSource::new(dir.path().join("absent"));
        assert!(source.tenant_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirSource::new(dir.path());
        assert!(source.fetch("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", r#"{"positions": 42}"#);
        let source = JsonDirSource::new(dir.path());
        let err = source.fetch("broken").await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_parses_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "acme.json",
            r#"{"companyName": "Acme", "employers": [{"id": "e1", "name": "Initech", "city": "Austin", "state": "TX"}]}"#,
        );
        let source = JsonDirSource::new(dir.path());
        let ds = source.fetch("acme").await.unwrap().unwrap();
        assert_eq!(ds.employers.len(), 1);
    }
}
