//! Role-tagged login credentials
//!
//! A read-only table mapping a role tag ("standard", "locked", ...) to a
//! username/password pair. Loaded once at suite start and injected into the
//! fixtures; never a mutable global. Extra roles can come from a YAML file.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A username/password pair for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Read-only mapping from role tag to credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialStore {
    roles: HashMap<String, Credentials>,
}

static BUILTIN: Lazy<HashMap<String, Credentials>> = Lazy::new(|| {
    let pair = |username: &str| Credentials {
        username: username.to_string(),
        password: "secret_sauce".to_string(),
    };

    HashMap::from([
        ("standard".to_string(), pair("standard_user")),
        ("locked".to_string(), pair("locked_out_user")),
        ("problem".to_string(), pair("problem_user")),
        ("performance".to_string(), pair("performance_glitch_user")),
    ])
});

impl CredentialStore {
    /// The built-in storefront accounts
    pub fn builtin() -> Self {
        Self {
            roles: BUILTIN.clone(),
        }
    }

    /// Built-in accounts plus roles parsed from a YAML file
    /// (`role: { username, password }`); file entries win on conflict.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let extra: HashMap<String, Credentials> = serde_yaml::from_str(&content)?;

        let mut store = Self::builtin();
        store.roles.extend(extra);
        Ok(store)
    }

    /// Add or replace a role; used when assembling a store for tests
    pub fn with_role(mut self, role: &str, credentials: Credentials) -> Self {
        self.roles.insert(role.to_string(), credentials);
        self
    }

    /// Look up a role tag, failing with an unknown-role error if absent
    pub fn lookup(&self, role: &str) -> Result<&Credentials> {
        self.roles
            .get(role)
            .ok_or_else(|| Error::UnknownRole(role.to_string()))
    }

    /// All known role tags, sorted
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("standard", "standard_user")]
    #[test_case("locked", "locked_out_user")]
    #[test_case("problem", "problem_user")]
    #[test_case("performance", "performance_glitch_user")]
    fn builtin_roles_resolve(role: &str, username: &str) {
        let store = CredentialStore::builtin();
        let creds = store.lookup(role).unwrap();
        assert_eq!(creds.username, username);
        assert_eq!(creds.password, "secret_sauce");
    }

    #[test]
    fn unknown_role_is_an_error() {
        let store = CredentialStore::builtin();
        let err = store.lookup("nonexistent_role").unwrap_err();
        assert!(matches!(err, Error::UnknownRole(role) if role == "nonexistent_role"));
    }

    #[test]
    fn file_roles_extend_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.yaml");
        std::fs::write(
            &path,
            "admin:\n  username: admin_user\n  password: hunter2\n",
        )
        .unwrap();

        let store = CredentialStore::from_file(&path).unwrap();
        assert_eq!(store.lookup("admin").unwrap().username, "admin_user");
        assert_eq!(store.lookup("standard").unwrap().username, "standard_user");
    }
}
