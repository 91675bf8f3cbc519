//! Bind credential validation.
//!
//! A bind passes three gates in order: the group named in the DN must be the user's primary
//! group, a time-based one-time code must verify when the user has an OTP secret, and the
//! SHA-256 digest of the password must equal the configured digest. The one-time code is
//! carried as the last six characters of the bind password.
//!
//! One-time codes follow RFC 6238 (HMAC-SHA1, 30-second steps, 6 digits) and accept one step
//! of clock skew either side by default.

use chrono::{DateTime, Utc};
use confdir_core::{Error, GroupRecord, UserRecord};
use data_encoding::BASE32;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use totp_rs::{Algorithm, TOTP};

use crate::Result;

/// Number of digits in a one-time code.
pub const OTP_DIGITS: usize = 6;
/// Default TOTP time step (seconds).
pub const DEFAULT_OTP_PERIOD_SECS: u64 = 30;
/// Default number of steps accepted either side of the current one.
pub const DEFAULT_OTP_SKEW_STEPS: u8 = 1;

/// Source of the current time for one-time code checks.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time step and skew window for one-time codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    period_secs: u64,
    skew_steps: u8,
}

impl OtpPolicy {
    /// Creates the standard policy: 30-second steps, one step of skew.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period_secs: DEFAULT_OTP_PERIOD_SECS,
            skew_steps: DEFAULT_OTP_SKEW_STEPS,
        }
    }

    /// Overrides the number of steps accepted either side of the current one.
    #[must_use]
    pub const fn with_skew_steps(mut self, steps: u8) -> Self {
        self.skew_steps = steps;
        self
    }

    fn totp(&self, secret: &str) -> Result<TOTP> {
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            OTP_DIGITS,
            self.skew_steps,
            self.period_secs,
            decode_secret(secret)?,
        ))
    }

    /// Seconds since the epoch, refusing instants too early to have a full skew window.
    fn unix_seconds(&self, at: DateTime<Utc>) -> Result<u64> {
        let seconds = u64::try_from(at.timestamp())
            .map_err(|_| Error::InternalError(format!("clock reads {at}, before the unix epoch")))?;
        if seconds / self.period_secs < u64::from(self.skew_steps) {
            return Err(Error::InternalError(format!(
                "clock reads {at}, before the first one-time code window"
            )));
        }
        Ok(seconds)
    }
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates the one-time code for `secret` at the given instant.
///
/// # Errors
///
/// Returns [`Error::InvalidCredentials`] if the secret is not valid base32, and
/// [`Error::InternalError`] for instants before the unix epoch.
pub fn generate_totp(secret: &str, at: DateTime<Utc>, policy: &OtpPolicy) -> Result<String> {
    let seconds = u64::try_from(at.timestamp())
        .map_err(|_| Error::InternalError(format!("clock reads {at}, before the unix epoch")))?;
    Ok(policy.totp(secret)?.generate(seconds))
}

/// Verifies a one-time code against `secret` within the policy's skew window.
///
/// # Errors
///
/// Returns [`Error::InvalidCredentials`] if the code is malformed, the secret cannot be
/// decoded, or no step in the window produces the code, and [`Error::InternalError`] when
/// `at` precedes the first full window.
pub fn verify_totp(secret: &str, code: &str, at: DateTime<Utc>, policy: &OtpPolicy) -> Result<()> {
    if code.len() != OTP_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidCredentials(
            "one-time code must be six decimal digits".to_string(),
        ));
    }

    let totp = policy.totp(secret)?;
    if totp.check(code, policy.unix_seconds(at)?) {
        Ok(())
    } else {
        Err(Error::InvalidCredentials(
            "one-time code rejected".to_string(),
        ))
    }
}

/// Lowercase hex SHA-256 of a password, the form stored in user records.
#[must_use]
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Splits `password` into the password proper and a trailing one-time code.
///
/// Returns `None` unless the input is longer than [`OTP_DIGITS`] characters.
#[must_use]
pub fn split_otp(password: &str) -> Option<(&str, &str)> {
    let (index, _) = password.char_indices().rev().nth(OTP_DIGITS - 1)?;
    (index > 0).then(|| password.split_at(index))
}

/// Validates bind credentials for a user and the group named in the bind DN.
#[derive(Clone)]
pub struct CredentialValidator {
    clock: Arc<dyn Clock>,
    policy: OtpPolicy,
}

impl CredentialValidator {
    /// Creates a validator using the given clock and OTP policy.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: OtpPolicy) -> Self {
        Self { clock, policy }
    }

    /// Runs the membership, one-time code and password gates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MembershipMismatch`] when `group` is not the user's primary group and
    /// [`Error::InvalidCredentials`] when the one-time code or the password is wrong.
    pub fn validate(&self, user: &UserRecord, group: &GroupRecord, password: &str) -> Result<()> {
        if user.primary_group != group.unix_id {
            return Err(Error::MembershipMismatch(format!(
                "user `{}` primary group is not `{}`",
                user.name, group.name
            )));
        }

        let password = match user.otp_secret() {
            None => password,
            Some(secret) => {
                let (password, code) = split_otp(password).ok_or_else(|| {
                    Error::InvalidCredentials(format!(
                        "password for `{}` is too short to carry a one-time code",
                        user.name
                    ))
                })?;
                verify_totp(secret, code, self.clock.now(), &self.policy)?;
                password
            }
        };

        let digest = password_digest(password);
        if !bool::from(digest.as_bytes().ct_eq(user.password_sha256.as_bytes())) {
            return Err(Error::InvalidCredentials(format!(
                "password digest mismatch for `{}`",
                user.name
            )));
        }

        Ok(())
    }
}

impl Default for CredentialValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), OtpPolicy::default())
    }
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let mut normalized = secret.trim().to_ascii_uppercase();
    let remainder = normalized.len() % 8;
    if remainder != 0 {
        normalized.push_str(&"=".repeat(8 - remainder));
    }

    BASE32
        .decode(normalized.as_bytes())
        .map_err(|e| Error::InvalidCredentials(format!("one-time secret is not valid base32: {e}")))
}
