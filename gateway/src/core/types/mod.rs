pub mod errors;
pub mod responses;
