//! Object storage for caption files, mirrored sources and rendered videos.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait (upload, public URL, HEAD)
//! - An S3-compatible client (Cloudflare R2, OCI object storage)
//! - An in-memory store for tests and local runs

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{S3Config, S3ObjectStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryObjectStore;
pub use store::{join_url, ObjectMeta, ObjectStore, StoredObject};
