//! Token lifecycle: from sign-in challenge to confirmed credential.
//!
//! ```text
//! Unrequested ──request_challenge──▶ PendingVerification ──probe ok──▶ Confirmed
//!      ▲                                     │
//!      └──────────── (re-request) ◀── Expired ◀── deadline passed
//! ```
//!
//! Confirmation happens out of band (a click in an email or an approval in
//! the app). The only way to observe it is to probe the identity endpoint
//! with the held secret, so `await_confirmation` polls at a fixed cadence
//! until the server-issued deadline.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiError, Gateway};
use crate::models::{Challenge, Identity, IssuedChallenge};

use super::clock::{Clock, SystemClock};

/// A session secret the server has accepted.
///
/// Only `TokenManager` creates these, and only after an identity probe
/// returned an identity for the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
}

impl Credential {
    pub(crate) fn confirmed(value: String) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("value", &"<redacted>").finish()
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Failed to request a sign-in challenge: {0}")]
    Challenge(#[source] ApiError),

    #[error("Identity probe failed: {0}")]
    Probe(#[source] ApiError),

    #[error("No confirmed credential - request and confirm a token first")]
    NoCredential,

    #[error("Sign-in was not confirmed before {expired_at} ({attempts} checks) - request a new token")]
    ConfirmationTimeout {
        expired_at: DateTime<Utc>,
        attempts: u64,
    },

    #[error("The token was rejected by the server")]
    Rejected,

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("Cannot {action} while the token is {state}")]
    InvalidState {
        action: &'static str,
        state: TokenState,
    },
}

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unrequested,
    PendingVerification,
    Confirmed,
    Expired,
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TokenState::Unrequested => "unrequested",
            TokenState::PendingVerification => "pending verification",
            TokenState::Confirmed => "confirmed",
            TokenState::Expired => "expired",
        };
        f.write_str(label)
    }
}

enum Phase {
    Unrequested,
    PendingVerification {
        issued: IssuedChallenge,
        requested_at: DateTime<Utc>,
    },
    Confirmed {
        credential: Credential,
        identity: Identity,
    },
    Expired {
        challenge: Challenge,
    },
}

impl Phase {
    fn state(&self) -> TokenState {
        match self {
            Phase::Unrequested => TokenState::Unrequested,
            Phase::PendingVerification { .. } => TokenState::PendingVerification,
            Phase::Confirmed { .. } => TokenState::Confirmed,
            Phase::Expired { .. } => TokenState::Expired,
        }
    }
}

/// Number of probes that fit into the challenge window: `ceil(window / interval)`
fn max_poll_attempts(window: TimeDelta, interval: Duration) -> u64 {
    let window_ms = window.num_milliseconds();
    if window_ms <= 0 {
        return 0;
    }
    let interval_ms = interval.as_millis().max(1);
    let attempts = (window_ms as u128).div_ceil(interval_ms);
    u64::try_from(attempts).unwrap_or(u64::MAX)
}

pub struct TokenManager<G, C = SystemClock> {
    gateway: G,
    clock: C,
    phase: Phase,
}

impl<G: Gateway> TokenManager<G, SystemClock> {
    pub fn new(gateway: G) -> Self {
        Self::with_clock(gateway, SystemClock)
    }
}

impl<G: Gateway, C: Clock> TokenManager<G, C> {
    pub fn with_clock(gateway: G, clock: C) -> Self {
        Self {
            gateway,
            clock,
            phase: Phase::Unrequested,
        }
    }

    pub fn state(&self) -> TokenState {
        self.phase.state()
    }

    /// The pending or expired challenge, if any
    pub fn challenge(&self) -> Option<&Challenge> {
        match &self.phase {
            Phase::PendingVerification { issued, .. } => Some(&issued.challenge),
            Phase::Expired { challenge } => Some(challenge),
            _ => None,
        }
    }

    /// Identity that confirmed the credential
    pub fn identity(&self) -> Option<&Identity> {
        match &self.phase {
            Phase::Confirmed { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Ask the server to start a sign-in for `email`.
    ///
    /// The secret minted with the challenge is held back until
    /// `await_confirmation` sees it accepted.
    pub async fn request_challenge(&mut self, email: &str) -> Result<Challenge, TokenError> {
        match self.phase {
            Phase::Unrequested | Phase::Expired { .. } => {}
            _ => {
                return Err(TokenError::InvalidState {
                    action: "request a challenge",
                    state: self.state(),
                })
            }
        }

        let issued = self
            .gateway
            .request_challenge(email)
            .await
            .map_err(TokenError::Challenge)?;
        let requested_at = self.clock.now();
        let challenge = issued.challenge.clone();

        info!(kind = %challenge.token_kind, expires_at = %challenge.expires_at, "Sign-in challenge pending");
        self.phase = Phase::PendingVerification {
            issued,
            requested_at,
        };
        Ok(challenge)
    }

    /// Poll the identity endpoint until the challenge is confirmed or expires.
    ///
    /// The attempt budget is fixed when polling starts, from the window between
    /// the request and the server deadline. Each attempt sleeps `poll_interval`
    /// first, then probes. The first accepted probe returns immediately.
    pub async fn await_confirmation(&mut self, poll_interval: Duration) -> Result<Credential, TokenError> {
        if poll_interval.is_zero() {
            return Err(TokenError::InvalidPollInterval);
        }

        let (challenge, secret, requested_at) = match &self.phase {
            Phase::PendingVerification {
                issued,
                requested_at,
            } => (issued.challenge.clone(), issued.secret.clone(), *requested_at),
            Phase::Confirmed { credential, .. } => return Ok(credential.clone()),
            _ => {
                return Err(TokenError::InvalidState {
                    action: "await confirmation",
                    state: self.state(),
                })
            }
        };

        let max_attempts = max_poll_attempts(challenge.expires_at - requested_at, poll_interval);
        debug!(max_attempts, interval_ms = poll_interval.as_millis() as u64, "Waiting for sign-in confirmation");

        let mut attempts: u64 = 0;
        while attempts < max_attempts && !challenge.is_expired_at(self.clock.now()) {
            self.clock.sleep(poll_interval).await;
            attempts += 1;

            let probed = self.gateway.probe(&secret).await.map_err(TokenError::Probe)?;
            if let Some(identity) = probed {
                info!(attempts, "Sign-in confirmed");
                let credential = Credential::confirmed(secret);
                self.phase = Phase::Confirmed {
                    credential: credential.clone(),
                    identity,
                };
                return Ok(credential);
            }
            debug!(attempt = attempts, max_attempts, "Sign-in not confirmed yet");
        }

        info!(attempts, expires_at = %challenge.expires_at, "Sign-in challenge expired");
        let expired_at = challenge.expires_at;
        self.phase = Phase::Expired { challenge };
        Err(TokenError::ConfirmationTimeout {
            expired_at,
            attempts,
        })
    }

    /// Validate a previously stored secret with a single probe
    pub async fn confirm_existing(&mut self, secret: impl Into<String>) -> Result<Credential, TokenError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(TokenError::Rejected);
        }

        match self.gateway.probe(&secret).await.map_err(TokenError::Probe)? {
            Some(identity) => {
                debug!(identity = %identity.id, "Stored token accepted");
                let credential = Credential::confirmed(secret);
                self.phase = Phase::Confirmed {
                    credential: credential.clone(),
                    identity,
                };
                Ok(credential)
            }
            None => Err(TokenError::Rejected),
        }
    }

    /// The confirmed credential
    pub fn credential(&self) -> Result<&Credential, TokenError> {
        match &self.phase {
            Phase::Confirmed { credential, .. } => Ok(credential),
            _ => Err(TokenError::NoCredential),
        }
    }
}
