pub mod api;
pub mod env;
pub mod types;
