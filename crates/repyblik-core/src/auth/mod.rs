//! Authentication module for obtaining and keeping session tokens.
//!
//! This module provides:
//! - `TokenManager`: the challenge/confirmation state machine
//! - `Clock`: time source and sleep used by the confirmation poll
//! - `TokenStore`: persisted tokens keyed by email address
//!
//! A sign-in request returns a secret that only becomes a `Credential` once
//! an identity probe accepts it.

pub mod clock;
pub mod credentials;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use credentials::TokenStore;
pub use token::{Credential, TokenError, TokenManager, TokenState};
