//! Authentication boundary
//!
//! - `AccessGate`: turns credentials into a `Capability`
//! - `StaticAccessGate`: bcrypt-backed in-memory credential table
//! - `TokenIssuer`: JWT bearer tokens carrying a capability

mod gate;
mod token;

use thiserror::Error;

pub use gate::{AccessGate, Capability, StaticAccessGate, DEFAULT_USERS};
pub use token::{generate_secret, Claims, IssuedToken, TokenIssuer, MIN_SECRET_LEN};

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Actor identifier must not be empty")]
    InvalidActor,

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Missing authentication token")]
    MissingToken,

    #[error("Hash error: {0}")]
    HashError(String),
}
