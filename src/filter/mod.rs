pub mod filter;
pub mod types;

pub use filter::{parse_parameter, to_query};
pub use types::*;
