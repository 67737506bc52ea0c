//! Domain layer for the Podcast Club backend.
//!
//! This crate contains:
//! - Domain models (members, podcasts, meetings, carve outs, one-time codes)
//! - Storage traits plus an in-memory implementation
//! - The ranking, meeting lifecycle, account lifecycle and import services
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::DomainError;
