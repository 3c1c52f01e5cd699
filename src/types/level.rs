//! Authorization levels and caller identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization tier assigned to an authenticated identity.
///
/// Levels are small positive integers. Policy documents carry them as text;
/// both sides are normalized through [`LevelId::parse`] so `"1"`, `" 1 "` and
/// `1` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(u32);

impl LevelId {
    /// Create a level from its numeric value. Zero is not a level.
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Parse a level from its textual form.
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<u32>().ok().and_then(Self::new)
    }

    /// Get the numeric value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An already-authenticated caller.
///
/// Produced by whatever authenticator sits in front of the gate. An identity
/// without a level is treated the same as no identity at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable subject name (e-mail, user id, ...).
    pub subject: String,
    /// Authorization level, if one was assigned.
    pub level: Option<LevelId>,
}

impl UserIdentity {
    /// Create an identity with a level.
    pub fn new(subject: impl Into<String>, level: LevelId) -> Self {
        Self {
            subject: subject.into(),
            level: Some(level),
        }
    }

    /// Create an identity that has no level assigned.
    pub fn without_level(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            level: None,
        }
    }
}
