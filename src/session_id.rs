//! Session ID generation and parsing
//!
//! This module provides the identifier that names a shared game session.
//! The identifier doubles as the capability to join a session, so it is a
//! random v4 UUID rather than a short guessable code.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

/// A unique identifier for a game session
///
/// Displayed and serialized in the hyphenated UUID form that hosts share
/// with remote players.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    /// Creates a new random session ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    /// Formats the ID as a hyphenated UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.as_hyphenated().fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    /// Parses a session ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s.trim())?))
    }
}
