//! Shared utilities for the Podcast Club backend.
//!
//! This crate provides the credential primitives used across all other crates:
//! - One-time code generation, normalization and hashing
//! - Signed session tokens (HMAC-SHA256)
//! - Password hashing with Argon2id
//! - Address and password validation rules

pub mod crypto;
pub mod password;
pub mod session;
pub mod validation;
