use serde::{Deserialize, Serialize};

use std::fmt;

/// The identity a unit of work runs on behalf of.
///
/// An `AuthContext` is an opaque, already-validated token: a principal name
/// and whether it was authenticated. It is immutable once built and compares
/// structurally, so two contexts with the same principal and flag are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthContext {
    principal: String,
    authenticated: bool,
}

impl AuthContext {
    /// Creates a context for `principal` with an explicit authentication flag.
    pub fn new(principal: impl Into<String>, authenticated: bool) -> Self {
        Self {
            principal: principal.into(),
            authenticated,
        }
    }

    /// Creates an authenticated context for `principal`.
    pub fn authenticated(principal: impl Into<String>) -> Self {
        Self::new(principal, true)
    }

    /// Returns the principal name.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Returns `true` if the principal was authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

impl fmt::Display for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.principal)
    }
}
