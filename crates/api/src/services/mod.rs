//! Application services that sit outside the domain layer.

pub mod cookies;
pub mod email;
