//! Filesystem-backed content store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::application::store::{BackingStore, StoreError, StoreKind};

/// Reads resources relative to a root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StoreError::io(name, "resource name escapes the content root"));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BackingStore for LocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    async fn fetch(&self, name: &str) -> Result<Bytes, StoreError> {
        let path = self.resolve(name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::not_found(name)),
            Err(err) => Err(StoreError::io(name, format!("{}: {err}", path.display()))),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_files_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("events.json"), br#"{"items":[]}"#).expect("write");
        let store = LocalStore::new(dir.path());

        let bytes = store.fetch("events.json").await.expect("fetch events");
        assert_eq!(&bytes[..], br#"{"items":[]}"#);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path());

        let err = store.fetch("news.json").await.expect_err("missing file");
        assert_eq!(err, StoreError::not_found("news.json"));
    }

    #[tokio::test]
    async fn directory_read_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("faq.json")).expect("mkdir");
        let store = LocalStore::new(dir.path());

        let err = store.fetch("faq.json").await.expect_err("directory");
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn rejects_names_outside_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path().join("content"));

        for name in ["../secret.json", "/etc/passwd", ""] {
            let err = store.fetch(name).await.expect_err("escape rejected");
            assert!(matches!(err, StoreError::Io { .. }), "{name}");
        }
        assert!(store.is_available().await);
    }
}
