//! Table summaries persisted as one text file per table.

use crate::error::StorageError;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default directory for summary artifacts.
pub const DEFAULT_SUMMARIES_DIR: &str = "LLM_summaries";

const SUMMARY_SUFFIX: &str = "_summary.txt";

/// Directory of `<table>_summary.txt` artifacts.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    dir: PathBuf,
}

impl SummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}{}", table, SUMMARY_SUFFIX))
    }

    /// Write (or overwrite) the summary for `table`.
    pub async fn save(&self, table: &str, summary: &str) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io("create directory", &self.dir, e))?;

        let path = self.path_for(table);
        tokio::fs::write(&path, summary)
            .await
            .map_err(|e| StorageError::io("write", &path, e))?;

        debug!(table = %table, path = %path.display(), "Saved table summary");
        Ok(path)
    }

    /// Load every summary in the directory, keyed by table name.
    ///
    /// A missing directory yields an empty map.
    pub async fn load_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(dir = %self.dir.display(), "Summary directory not found");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(StorageError::io("read directory", &self.dir, e)),
        };

        let mut summaries = BTreeMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read directory", &self.dir, e))?
        {
            let file_name = entry.file_name();
            let Some(table) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(SUMMARY_SUFFIX))
            else {
                continue;
            };
            if table.is_empty() {
                continue;
            }

            let path = entry.path();
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StorageError::io("read", &path, e))?;
            summaries.insert(table.to_string(), text);
        }

        debug!(count = summaries.len(), dir = %self.dir.display(), "Loaded table summaries");
        Ok(summaries)
    }
}

impl Default for SummaryStore {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARIES_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for() {
        let store = SummaryStore::new("out");
        assert_eq!(
            store.path_for("Orders"),
            PathBuf::from("out").join("Orders_summary.txt")
        );
    }

    #[tokio::test]
    async fn test_save_overwrites_and_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = SummaryStore::new(dir.path().join("nested"));

        store.save("Orders", "first").await.unwrap();
        store.save("Orders", "second").await.unwrap();
        store.save("Customers", "people").await.unwrap();
        tokio::fs::write(dir.path().join("nested").join("notes.md"), "ignored")
            .await
            .unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["Orders"], "second");
        assert_eq!(loaded["Customers"], "people");
    }

    #[tokio::test]
    async fn test_load_all_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SummaryStore::new(dir.path().join("absent"));
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
