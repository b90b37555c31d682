//! Service-account credentials and OAuth2 access tokens.
//!
//! The bundle is parsed (including its RSA key) once at startup so a
//! malformed credential aborts the process before any subscription is made.
//! Access tokens are minted through the JWT-bearer grant and cached until
//! shortly before they expire.

mod service_account;
mod token_provider;
pub use service_account::*;
pub use token_provider::*;

#[cfg(test)]
mod credentials_test;
