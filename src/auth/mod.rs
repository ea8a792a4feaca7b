//! Authentication module for the task manager server
//!
//! Credential signing, the request gate, and the refresh session
//! lifecycle (login, rotation, logout, mass revocation).

pub mod authenticator;
pub mod codec;
pub mod handlers;
pub mod password;
pub mod service;

pub use authenticator::{Authenticator, CurrentUser};
pub use codec::{CredentialCodec, CredentialKind};
pub use password::{Argon2Verifier, PasswordVerifier};
pub use service::{SessionService, TokenPair};
