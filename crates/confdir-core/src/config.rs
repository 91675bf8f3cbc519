//! Directory configuration records.
//!
//! The directory is served from a static snapshot of user and group records. This module
//! provides the typed records, JSON loading, and the validation applied before a snapshot is
//! handed to the backend.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;
use validator::{Validate, ValidationError};

/// The full directory served by the backend.
///
/// Immutable once loaded; a reload builds a new value and swaps it in whole.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_records"))]
pub struct DirectoryConfig {
    /// Base namespace every entry lives under (e.g. `dc=example,dc=com`)
    #[serde(alias = "basedn")]
    #[validate(custom(function = "validate_base_dn"))]
    pub base_dn: String,

    /// User records, in configuration order
    #[serde(default)]
    #[validate(nested)]
    pub users: Vec<UserRecord>,

    /// Group records, in configuration order
    #[serde(default)]
    #[validate(nested)]
    pub groups: Vec<GroupRecord>,
}

impl DirectoryConfig {
    /// Create and validate a configuration from records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the base DN is malformed, a record is invalid, or
    /// names or unix ids repeat within a record kind.
    pub fn new(
        base_dn: impl Into<String>,
        users: Vec<UserRecord>,
        groups: Vec<GroupRecord>,
    ) -> Result<Self, Error> {
        let config = Self {
            base_dn: base_dn.into(),
            users,
            groups,
        };
        config.validate_config()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for malformed JSON and [`Error::ValidationError`] when
    /// the records fail validation.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate_config()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file cannot be read or parsed, and
    /// [`Error::ValidationError`] when the records fail validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "failed to read directory config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Run field and cross-record validation.
    ///
    /// Dangling group references are allowed and logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] describing every failed rule.
    pub fn validate_config(&self) -> Result<(), Error> {
        self.validate()?;

        let group_ids: HashSet<u32> = self.groups.iter().map(|g| g.unix_id).collect();
        for user in &self.users {
            if !group_ids.contains(&user.primary_group) {
                warn!(
                    user = %user.name,
                    primary_group = user.primary_group,
                    "primary group does not exist; user will not be able to bind"
                );
            }
        }
        for group in &self.groups {
            for included in &group.include_groups {
                if !group_ids.contains(included) {
                    warn!(
                        group = %group.name,
                        included_group = included,
                        "included group does not exist"
                    );
                }
            }
        }

        Ok(())
    }
}

/// A user that may bind to and appear in the directory.
#[derive(Debug, Deserialize, Validate)]
pub struct UserRecord {
    /// Login name (case-sensitive, unique)
    #[validate(length(min = 1))]
    pub name: String,

    /// Numeric user id (`uidNumber`)
    #[serde(alias = "unixid")]
    pub unix_id: u32,

    /// Primary group unix id (`gidNumber`)
    #[serde(alias = "primarygroup")]
    pub primary_group: u32,

    /// Secondary group unix ids
    #[serde(default, alias = "othergroups")]
    pub other_groups: Vec<u32>,

    /// Lowercase hex SHA-256 of the cleartext password
    #[serde(alias = "passsha256")]
    #[validate(custom(function = "validate_sha256_hex"))]
    pub password_sha256: String,

    /// Base32 TOTP secret; absent or empty means password-only authentication
    #[serde(default, alias = "otpsecret")]
    pub otp_secret: Option<SecretString>,

    /// Given name
    #[serde(default, alias = "givenname")]
    pub given_name: Option<String>,

    /// Surname
    #[serde(default, alias = "sn")]
    pub surname: Option<String>,

    /// Mail address
    #[serde(default)]
    pub mail: Option<String>,

    /// Login shell; the entry builder substitutes a default when unset
    #[serde(default, alias = "loginshell")]
    pub login_shell: Option<String>,

    /// Home directory; the entry builder substitutes a default when unset
    #[serde(default, alias = "homedir")]
    pub home_directory: Option<String>,

    /// SSH public keys, in order
    #[serde(default, alias = "sshkeys")]
    pub ssh_keys: Vec<String>,

    /// Disabled accounts are still listed but reported as inactive
    #[serde(default)]
    pub disabled: bool,
}

impl UserRecord {
    /// Create a user with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        unix_id: u32,
        primary_group: u32,
        password_sha256: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            unix_id,
            primary_group,
            other_groups: Vec::new(),
            password_sha256: password_sha256.into(),
            otp_secret: None,
            given_name: None,
            surname: None,
            mail: None,
            login_shell: None,
            home_directory: None,
            ssh_keys: Vec::new(),
            disabled: false,
        }
    }

    /// Set secondary group memberships.
    #[must_use]
    pub fn with_other_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.other_groups = groups.into_iter().collect();
        self
    }

    /// Set the base32 TOTP secret.
    #[must_use]
    pub fn with_otp_secret(mut self, secret: impl Into<String>) -> Self {
        self.otp_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the given name.
    #[must_use]
    pub fn with_given_name(mut self, given_name: impl Into<String>) -> Self {
        self.given_name = Some(given_name.into());
        self
    }

    /// Set the surname.
    #[must_use]
    pub fn with_surname(mut self, surname: impl Into<String>) -> Self {
        self.surname = Some(surname.into());
        self
    }

    /// Set the mail address.
    #[must_use]
    pub fn with_mail(mut self, mail: impl Into<String>) -> Self {
        self.mail = Some(mail.into());
        self
    }

    /// Set the login shell.
    #[must_use]
    pub fn with_login_shell(mut self, shell: impl Into<String>) -> Self {
        self.login_shell = Some(shell.into());
        self
    }

    /// Set the home directory.
    #[must_use]
    pub fn with_home_directory(mut self, home: impl Into<String>) -> Self {
        self.home_directory = Some(home.into());
        self
    }

    /// Append an SSH public key.
    #[must_use]
    pub fn add_ssh_key(mut self, key: impl Into<String>) -> Self {
        self.ssh_keys.push(key.into());
        self
    }

    /// Mark the account disabled.
    #[must_use]
    pub const fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Returns the TOTP secret if one is configured and non-blank.
    #[must_use]
    pub fn otp_secret(&self) -> Option<&str> {
        self.otp_secret
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|secret| !secret.trim().is_empty())
    }

    /// Returns true if the user authenticates with a password and a one-time code.
    #[must_use]
    pub fn requires_otp(&self) -> bool {
        self.otp_secret().is_some()
    }

    /// Returns the primary group followed by secondary groups.
    #[must_use]
    pub fn effective_groups(&self) -> Vec<u32> {
        let mut groups = Vec::with_capacity(self.other_groups.len() + 1);
        groups.push(self.primary_group);
        groups.extend(self.other_groups.iter().copied());
        groups
    }

    /// Returns true if the user is a direct (primary or secondary) member of the group.
    #[must_use]
    pub fn is_direct_member_of(&self, gid: u32) -> bool {
        self.primary_group == gid || self.other_groups.contains(&gid)
    }
}

/// A POSIX group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct GroupRecord {
    /// Group name (unique)
    #[validate(length(min = 1))]
    pub name: String,

    /// Numeric group id (`gidNumber`)
    #[serde(alias = "unixid")]
    pub unix_id: u32,

    /// Groups whose members are also members of this group
    #[serde(default, alias = "includegroups")]
    pub include_groups: Vec<u32>,
}

impl GroupRecord {
    /// Create a group with no included groups.
    #[must_use]
    pub fn new(name: impl Into<String>, unix_id: u32) -> Self {
        Self {
            name: name.into(),
            unix_id,
            include_groups: Vec::new(),
        }
    }

    /// Set the included groups.
    #[must_use]
    pub fn with_include_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.include_groups = groups.into_iter().collect();
        self
    }
}

fn validation_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

fn validate_base_dn(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(validation_error(
            "base_dn_empty",
            "base DN cannot be empty".to_string(),
        ));
    }

    for component in value.split(',') {
        let valid = component
            .split_once('=')
            .is_some_and(|(attr, val)| !attr.trim().is_empty() && !val.trim().is_empty());
        if !valid {
            return Err(validation_error(
                "base_dn_component",
                format!("invalid base DN component `{component}`"),
            ));
        }
    }

    Ok(())
}

fn validate_sha256_hex(value: &str) -> Result<(), ValidationError> {
    if value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Ok(())
    } else {
        Err(validation_error(
            "password_sha256",
            "password digest must be 64 lowercase hex characters".to_string(),
        ))
    }
}

fn validate_unique_records(config: &DirectoryConfig) -> Result<(), ValidationError> {
    fn first_duplicate<T, I>(values: I) -> Option<T>
    where
        T: Eq + std::hash::Hash + Clone,
        I: IntoIterator<Item = T>,
    {
        let mut seen = HashSet::new();
        values.into_iter().find(|value| !seen.insert(value.clone()))
    }

    if let Some(name) = first_duplicate(config.users.iter().map(|u| u.name.as_str())) {
        return Err(validation_error(
            "duplicate_user_name",
            format!("user name `{name}` is defined more than once"),
        ));
    }
    if let Some(id) = first_duplicate(config.users.iter().map(|u| u.unix_id)) {
        return Err(validation_error(
            "duplicate_user_id",
            format!("user unix id {id} is defined more than once"),
        ));
    }
    if let Some(name) = first_duplicate(config.groups.iter().map(|g| g.name.as_str())) {
        return Err(validation_error(
            "duplicate_group_name",
            format!("group name `{name}` is defined more than once"),
        ));
    }
    if let Some(id) = first_duplicate(config.groups.iter().map(|g| g.unix_id)) {
        return Err(validation_error(
            "duplicate_group_id",
            format!("group unix id {id} is defined more than once"),
        ));
    }

    Ok(())
}
