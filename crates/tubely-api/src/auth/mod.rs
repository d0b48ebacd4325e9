//! Bearer-token authentication
//!
//! Tokens are HS256 JWTs whose `sub` claim is the user id. The middleware
//! validates the token and stores a [`models::UserContext`] in the request
//! extensions for handlers to extract.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::JwtService;
pub use models::{JwtClaims, UserContext};
