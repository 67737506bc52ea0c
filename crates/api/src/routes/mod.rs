//! HTTP route handlers.

pub mod auth;
pub mod carve_outs;
pub mod codes;
pub mod health;
pub mod imports;
pub mod meetings;
pub mod members;
pub mod podcasts;
