// handlers/public/mod.rs - no capability guard in front of these routes
pub mod status;
pub mod token;

pub use status::status;
pub use token::token;
