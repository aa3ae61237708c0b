//! HOTP/TOTP password generation (RFC 4226, RFC 6238).

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use strum::{Display, EnumString};
use thiserror::Error;

use super::Secret;

/// Smallest supported password length.
pub const MIN_DIGITS: u8 = 6;
/// Largest supported password length.
pub const MAX_DIGITS: u8 = 8;
/// Password length used when none is specified.
pub const DEFAULT_DIGITS: u8 = 6;
/// Timer period, in seconds, used when none is specified.
pub const DEFAULT_PERIOD: u64 = 30;

/// Errors raised while validating a generator or deriving a password.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// The secret holds no key bytes.
    #[error("secret is empty")]
    EmptySecret,
    /// The password length is outside `MIN_DIGITS..=MAX_DIGITS`.
    #[error("unsupported digit count: {0}")]
    UnsupportedDigits(u8),
    /// A timer period of zero seconds.
    #[error("invalid timer period: {0}")]
    InvalidPeriod(u64),
}

/// Hash function used for the HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Algorithm {
    /// HMAC-SHA1.
    #[default]
    #[strum(to_string = "SHA1")]
    Sha1,
    /// HMAC-SHA256.
    #[strum(to_string = "SHA256")]
    Sha256,
    /// HMAC-SHA512.
    #[strum(to_string = "SHA512")]
    Sha512,
}

/// The moving factor combined with the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    /// Counter-based (HOTP) with the stored counter value.
    Counter(u64),
    /// Time-based (TOTP) with a period in seconds.
    Timer {
        /// Step length in seconds.
        period: u64,
    },
}

/// Parameters for deriving one-time passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generator {
    /// Moving factor.
    pub factor: Factor,
    /// HMAC hash function.
    pub algorithm: Algorithm,
    /// Number of decimal digits in a password.
    pub digits: u8,
}

impl Generator {
    /// Creates a generator. Call [`Generator::validate`] before relying on it.
    #[must_use]
    pub const fn new(factor: Factor, algorithm: Algorithm, digits: u8) -> Self {
        Self {
            factor,
            algorithm,
            digits,
        }
    }

    /// Default time-based generator: SHA1, 6 digits, 30 second period.
    #[must_use]
    pub const fn totp() -> Self {
        Self::new(
            Factor::Timer {
                period: DEFAULT_PERIOD,
            },
            Algorithm::Sha1,
            DEFAULT_DIGITS,
        )
    }

    /// Default counter-based generator starting at `counter`.
    #[must_use]
    pub const fn hotp(counter: u64) -> Self {
        Self::new(Factor::Counter(counter), Algorithm::Sha1, DEFAULT_DIGITS)
    }

    /// Checks the digit count and timer period.
    ///
    /// # Errors
    ///
    /// Returns an error if `digits` is outside `MIN_DIGITS..=MAX_DIGITS` or the
    /// timer period is zero.
    pub const fn validate(&self) -> Result<(), GeneratorError> {
        if self.digits < MIN_DIGITS || self.digits > MAX_DIGITS {
            return Err(GeneratorError::UnsupportedDigits(self.digits));
        }
        if let Factor::Timer { period: 0 } = self.factor {
            return Err(GeneratorError::InvalidPeriod(0));
        }
        Ok(())
    }

    /// The counter value fed to the HMAC at `unix_time` (seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the generator is invalid.
    pub const fn counter_at(&self, unix_time: u64) -> Result<u64, GeneratorError> {
        if let Err(err) = self.validate() {
            return Err(err);
        }
        Ok(match self.factor {
            Factor::Counter(counter) => counter,
            Factor::Timer { period } => unix_time / period,
        })
    }

    /// Derives the password for `unix_time` (ignored by counter-based generators).
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty or the generator is invalid.
    pub fn password(&self, secret: &Secret, unix_time: u64) -> Result<String, GeneratorError> {
        if secret.is_empty() {
            return Err(GeneratorError::EmptySecret);
        }
        let counter = self.counter_at(unix_time)?;
        let message = counter.to_be_bytes();
        let digest = match self.algorithm {
            Algorithm::Sha1 => sign::<Hmac<Sha1>>(secret.expose(), &message)?,
            Algorithm::Sha256 => sign::<Hmac<Sha256>>(secret.expose(), &message)?,
            Algorithm::Sha512 => sign::<Hmac<Sha512>>(secret.expose(), &message)?,
        };

        // Dynamic truncation.
        let offset = usize::from(digest[digest.len() - 1] & 0x0f);
        let binary = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]) & 0x7fff_ffff;
        let code = binary % 10u32.pow(u32::from(self.digits));
        Ok(format!("{code:0width$}", width = usize::from(self.digits)))
    }

    /// The generator to persist after a password has been used.
    ///
    /// Counter-based generators advance by one; timers are unchanged.
    #[must_use]
    pub const fn successor(&self) -> Self {
        match self.factor {
            Factor::Counter(counter) => Self {
                factor: Factor::Counter(counter.wrapping_add(1)),
                ..*self
            },
            Factor::Timer { .. } => *self,
        }
    }
}

fn sign<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, GeneratorError> {
    let mut mac =
        <M as KeyInit>::new_from_slice(key).map_err(|_| GeneratorError::EmptySecret)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
