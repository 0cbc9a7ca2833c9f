//! Authentication validator
//!
//! Checks a username/password pair against the loaded user store.
//! Plain-text comparison; no hashing, rate limiting or lockout.

use super::store::UserStore;
use crate::error::AuthError;

/// Succeeds when some entry matches both fields exactly (case-sensitive).
pub fn authenticate(store: &UserStore, username: &str, password: &str) -> Result<(), AuthError> {
    if store
        .iter()
        .any(|c| c.username == username && c.password == password)
    {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::StoreLimits;

    fn store() -> UserStore {
        UserStore::parse(
            "alice:secret\nbob:hunter2\n",
            StoreLimits {
                capacity: 100,
                max_field_length: 49,
            },
        )
    }

    #[test]
    fn test_known_credentials_pass() {
        assert!(authenticate(&store(), "alice", "secret").is_ok());
        assert!(authenticate(&store(), "bob", "hunter2").is_ok());
    }

    #[test]
    fn test_mismatches_fail() {
        let store = store();
        assert!(authenticate(&store, "alice", "hunter2").is_err());
        assert!(authenticate(&store, "Alice", "secret").is_err());
        assert!(authenticate(&store, "alice", "SECRET").is_err());
        assert!(authenticate(&store, "mallory", "secret").is_err());
        assert!(authenticate(&store, "", "").is_err());
    }

    #[test]
    fn test_failure_names_the_user() {
        match authenticate(&store(), "mallory", "x") {
            Err(AuthError::InvalidCredentials(user)) => assert_eq!(user, "mallory"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
