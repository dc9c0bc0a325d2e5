// handlers/protected/mod.rs - routes behind a non-admin capability guard
pub mod containers;
pub mod status;

pub use status::status_auth;
