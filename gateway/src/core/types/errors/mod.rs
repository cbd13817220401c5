pub mod gateway_error;
