//! Custom Axum extractors.

pub mod client_ip;
pub mod json;
pub mod session;

pub use client_ip::{client_ip, ClientIp};
pub use json::{ApiJson, OptionalJson};
pub use session::{AdminSession, CurrentSession, OptionalSession};
