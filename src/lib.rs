pub mod app;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod provider;
pub mod state;
pub mod views;

#[cfg(test)]
pub mod testing;
