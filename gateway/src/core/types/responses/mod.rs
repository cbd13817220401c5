pub mod failed_response;
pub mod health_response;
