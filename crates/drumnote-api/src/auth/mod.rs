//! Bearer-token authentication
//!
//! `jwt` signs and verifies HS256 access tokens, `password` wraps argon2, and
//! `middleware` resolves the token into an [`AuthUser`] stored in request extensions.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use models::AuthUser;
