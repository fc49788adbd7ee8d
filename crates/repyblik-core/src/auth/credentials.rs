use anyhow::{bail, Context, Result};

use crate::store::StateStore;

/// Session tokens persisted per email address.
///
/// Tokens are stored unvalidated; callers confirm them with
/// `TokenManager::confirm_existing` before use.
pub struct TokenStore<S> {
    store: S,
}

impl<S: StateStore> TokenStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(email: &str) -> Result<String> {
        let key = email.trim().to_lowercase();
        if key.is_empty() {
            bail!("Email address must not be empty");
        }
        Ok(key)
    }

    /// Load the stored token for `email`, `None` if there is none
    pub fn load(&self, email: &str) -> Result<Option<String>> {
        let key = Self::key(email)?;
        let token = self
            .store
            .read(&key)
            .with_context(|| format!("Failed to read token for {}", email))?;
        Ok(token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
    }

    /// Refuse to continue if a token exists and overwriting was not requested.
    /// A token file that cannot be read counts as existing.
    /// Called before a new challenge is requested, so nothing is lost on refusal.
    pub fn ensure_writable(&self, email: &str, overwrite: bool) -> Result<()> {
        if overwrite {
            return Ok(());
        }
        match self.load(email) {
            Ok(None) => Ok(()),
            Ok(Some(_)) => bail!(
                "A token for {} already exists. Use --overwrite to replace it.",
                email
            ),
            Err(e) => Err(e.context(format!(
                "The existing token for {} cannot be read. Use --overwrite to replace it.",
                email
            ))),
        }
    }

    /// Store `token` for `email`
    pub fn save(&self, email: &str, token: &str, overwrite: bool) -> Result<()> {
        self.ensure_writable(email, overwrite)?;
        let key = Self::key(email)?;
        self.store
            .write(&key, token)
            .with_context(|| format!("Failed to store token for {}", email))
    }
}
