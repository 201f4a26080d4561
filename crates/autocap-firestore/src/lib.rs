//! Document store for pipeline state.
//!
//! This crate provides:
//! - The [`DocumentStore`] trait: equality queries, conditional create,
//!   field updates with increment/append transforms
//! - A Firestore REST implementation with cached service-account tokens,
//!   retry with backoff and request metrics
//! - An in-memory implementation for tests and local runs

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig, FirestoreStore};
pub use error::{FirestoreError, FirestoreResult};
pub use memory::MemoryStore;
pub use store::{
    from_fields, to_fields, Direction, DocumentStore, DocumentStoreExt, Fields, Filter,
    FindOptions, Update,
};
