//! Typed client for the InstantTLS account API.
//!
//! The client talks JSON to either the upstream API directly or to a
//! same-origin gateway mount; the caller picks the base URL.

pub mod client;
pub mod error;
pub mod models;
pub mod session;

pub use client::{ApiClient, ClientConfig};
pub use error::ApiError;
pub use models::{AuthResponse, CreatedToken, License, Plan, Token, User};
pub use session::{
    AuthSession, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore,
};
