//! # Authentication Module
//!
//! OAuth 2.0 token lifecycle for the Google Photos library.
//!
//! ## Overview
//!
//! The host app obtains a server auth code from Google Sign-In. This crate
//! exchanges it for an access/refresh token pair, persists the pair in the
//! host settings store and keeps the access token fresh before every API
//! call.
//!
//! ## Components
//!
//! - [`TokenInfo`]: token pair with expiry arithmetic
//! - [`TokenStore`]: durable persistence plus the in-memory cache
//! - [`TokenExchangeClient`]: authorization-code and refresh-token grants
//! - [`TokenManager`]: sign-in and check-and-refresh under a lock

pub mod error;
pub mod manager;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::{AccessTokenProvider, TokenManager};
pub use oauth::TokenExchangeClient;
pub use token_store::TokenStore;
pub use types::{TokenInfo, EXPIRY_MARGIN_MS};
