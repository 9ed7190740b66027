//! Backing store port: raw bytes by name plus a reachability check.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("resource `{name}` not found")]
    NotFound { name: String },
    #[error("failed to read `{name}`: {detail}")]
    Io { name: String, detail: String },
}

impl StoreError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn io(name: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Io {
            name: name.into(),
            detail: detail.to_string(),
        }
    }
}

/// Which kind of store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Local,
    Remote,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Local => "local",
            StoreKind::Remote => "remote",
        }
    }
}

#[async_trait]
pub trait BackingStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Read the full contents of `name`.
    async fn fetch(&self, name: &str) -> Result<Bytes, StoreError>;

    /// Whether the store can currently serve reads. Must not hang.
    async fn is_available(&self) -> bool;
}
