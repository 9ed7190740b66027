//! Bulletin: events, news and FAQ collections served over HTTP from local
//! files or blob storage, behind a short-lived in-memory cache.

pub mod application;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
