//! Authentication system
//!
//! Holds the credential table and validates USER attempts against it.

pub mod store;
pub mod validator;

pub use store::{Credential, StoreLimits, UserStore};
pub use validator::authenticate;
