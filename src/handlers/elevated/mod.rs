// handlers/elevated/mod.rs - routes behind the admin capability guard
//
// Everything here proxies to the identity provider with the caller's own
// token, so the provider applies its own checks as well.
pub mod admin;
