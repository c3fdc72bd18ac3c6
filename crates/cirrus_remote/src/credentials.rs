//! Credentials attached to new stream connections.

use std::fmt;

/// An access token handed to the connector when a stream starts.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    user: Option<String>,
}

impl Token {
    /// Creates a token for a user.
    pub fn new(value: impl Into<String>, user: Option<String>) -> Self {
        Self {
            value: value.into(),
            user,
        }
    }

    /// Returns the raw token value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the user the token belongs to, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Source of credentials for stream connections.
///
/// Streams only read the current token; they never refresh or invalidate it.
pub trait CredentialsProvider: Send + Sync {
    /// Returns the token to use for a new connection, if signed in.
    fn token(&self) -> Option<Token>;
}

/// Provider for unauthenticated connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyCredentials;

impl CredentialsProvider for EmptyCredentials {
    fn token(&self) -> Option<Token> {
        None
    }
}

/// Provider that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    token: Token,
}

impl StaticCredentials {
    /// Creates a provider for a fixed token.
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn token(&self) -> Option<Token> {
        Some(self.token.clone())
    }
}
