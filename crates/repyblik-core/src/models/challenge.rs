use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel through which the user confirms a sign-in request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Approve the request in the mobile app
    App,
    /// Click the link sent by email
    Email,
}

impl TokenKind {
    /// Parse the `tokenType` value returned by the sign-in mutation
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "APP" => Some(TokenKind::App),
            "EMAIL_TOKEN" => Some(TokenKind::Email),
            _ => None,
        }
    }

    /// Instruction shown to the user while the request is pending
    pub fn instructions(&self) -> &'static str {
        match self {
            TokenKind::App => "You have to approve the request in the Republik app",
            TokenKind::Email => "You have to verify the request by clicking on the link you get by email",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::App => write!(f, "app"),
            TokenKind::Email => write!(f, "email"),
        }
    }
}

/// A pending sign-in request. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub verification_phrase: String,
    pub token_kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What the gateway hands back for a sign-in request: the challenge plus the
/// session secret minted alongside it. The secret is not usable until an
/// identity probe confirms it.
#[derive(Clone)]
pub struct IssuedChallenge {
    pub challenge: Challenge,
    pub secret: String,
}

impl fmt::Debug for IssuedChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedChallenge")
            .field("challenge", &self.challenge)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The account behind an accepted session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
}
