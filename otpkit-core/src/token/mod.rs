//! One-time-password token configuration.
//!
//! A [`Token`] is the named, user-visible description of a password generator.
//! It never carries key material: the [`Secret`] travels next to it, so the
//! canonical `otpauth://` form produced by [`Token::to_url`] is safe to keep
//! in non-secret storage.

mod generator;
mod secret;
mod url;

pub use generator::{
    Algorithm, Factor, Generator, GeneratorError, DEFAULT_DIGITS, DEFAULT_PERIOD, MAX_DIGITS,
    MIN_DIGITS,
};
pub use secret::Secret;
pub use url::TokenUrlError;

/// A named one-time-password generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// Account name shown to the user.
    pub name: String,
    /// Service that issued the token. Empty when unknown.
    pub issuer: String,
    /// Password generation parameters.
    pub generator: Generator,
}

impl Token {
    /// Creates a token configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, issuer: impl Into<String>, generator: Generator) -> Self {
        Self {
            name: name.into(),
            issuer: issuer.into(),
            generator,
        }
    }

    /// Derives the current password for this token.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty or the generator is invalid.
    pub fn password(&self, secret: &Secret, unix_time: u64) -> Result<String, GeneratorError> {
        self.generator.password(secret, unix_time)
    }

    /// The token to persist once the current password has been shown.
    #[must_use]
    pub fn updated_for_next_password(&self) -> Self {
        Self {
            generator: self.generator.successor(),
            ..self.clone()
        }
    }
}
