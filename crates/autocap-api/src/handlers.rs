//! Request handlers.

pub mod export;
pub mod health;
pub mod integration;
pub mod render;
pub mod transcripts;
pub mod uploads;
pub mod worker;

pub use health::*;
