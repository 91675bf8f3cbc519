//! Distinguished name handling relative to the configured base namespace.
//!
//! Bind DNs have the shape `cn=<user>[,ou=<group>],<base>`. Parsing is shallow:
//! the base suffix is matched case-insensitively, the remainder is split on `,`, and the
//! `cn=` / `ou=` prefixes are stripped without further checks. A malformed prefix produces a
//! name no record carries, so the subsequent lookup fails instead.

use std::fmt;
use thiserror::Error;

use confdir_core::error::Error as CoreError;

/// Organizational unit under which group entries are published.
pub const GROUPS_OU: &str = "groups";

/// Errors produced while interpreting a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The base namespace was empty.
    #[error("base distinguished name cannot be empty")]
    EmptyBase,
    /// The distinguished name does not end with the base namespace.
    #[error("distinguished name `{dn}` is not within base `{base}`")]
    OutsideBase {
        /// Distinguished name supplied by the caller.
        dn: String,
        /// Configured base namespace.
        base: String,
    },
    /// The part below the base has the wrong number of components.
    #[error("distinguished name `{dn}` should have one or two components below the base (has {count})")]
    ComponentCount {
        /// Distinguished name supplied by the caller.
        dn: String,
        /// Number of components found below the base.
        count: usize,
    },
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::IdentityFormat(err.to_string())
    }
}

/// The configured base namespace, e.g. `dc=example,dc=com`.
///
/// Keeps the configured spelling for building entry DNs and an ASCII-lowercased copy for
/// suffix comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDn {
    raw: String,
    suffix: String,
}

impl BaseDn {
    /// Creates a base namespace from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError::EmptyBase`] if the input is blank.
    pub fn new(input: impl Into<String>) -> std::result::Result<Self, DistinguishedNameError> {
        let raw = input.into().trim().to_string();
        if raw.is_empty() {
            return Err(DistinguishedNameError::EmptyBase);
        }

        let suffix = format!(",{}", raw.to_ascii_lowercase());
        Ok(Self { raw, suffix })
    }

    /// Borrows the base namespace as configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the portion of `dn` in front of `,<base>`, if `dn` ends with it.
    ///
    /// The comparison ignores ASCII case; the returned slice keeps the caller's spelling.
    #[must_use]
    pub fn relative_part<'a>(&self, dn: &'a str) -> Option<&'a str> {
        let cut = dn.len().checked_sub(self.suffix.len())?;
        let tail = dn.get(cut..)?;
        tail.eq_ignore_ascii_case(&self.suffix).then(|| &dn[..cut])
    }

    /// Returns true if `dn` is the base itself or lies below it.
    #[must_use]
    pub fn contains(&self, dn: &str) -> bool {
        dn.eq_ignore_ascii_case(&self.raw) || self.relative_part(dn).is_some()
    }

    /// Distinguished name of a user entry: `cn=<name>,ou=<group>,<base>`.
    #[must_use]
    pub fn user_dn(&self, name: &str, primary_group: &str) -> String {
        format!("cn={name},ou={primary_group},{}", self.raw)
    }

    /// Distinguished name of a group entry: `cn=<name>,ou=groups,<base>`.
    #[must_use]
    pub fn group_dn(&self, name: &str) -> String {
        format!("cn={name},ou={GROUPS_OU},{}", self.raw)
    }
}

impl fmt::Display for BaseDn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for BaseDn {
    type Error = DistinguishedNameError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BaseDn> for String {
    fn from(value: BaseDn) -> Self {
        value.raw
    }
}

/// User and group named by a bind DN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindIdentity {
    user: String,
    group: String,
}

impl BindIdentity {
    /// Parses a bind DN relative to `base`.
    ///
    /// `cn=<user>,<base>` yields an empty group name; `cn=<user>,ou=<group>,<base>` yields both.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError::OutsideBase`] if the DN does not end with `,<base>`
    /// and [`DistinguishedNameError::ComponentCount`] for any other number of components.
    pub fn parse(dn: &str, base: &BaseDn) -> std::result::Result<Self, DistinguishedNameError> {
        let relative = base
            .relative_part(dn)
            .ok_or_else(|| DistinguishedNameError::OutsideBase {
                dn: dn.to_string(),
                base: base.as_str().to_string(),
            })?;

        let parts: Vec<&str> = relative.split(',').collect();
        match parts.as_slice() {
            [user] => Ok(Self {
                user: strip_attribute(user, "cn").to_string(),
                group: String::new(),
            }),
            [user, group] => Ok(Self {
                user: strip_attribute(user, "cn").to_string(),
                group: strip_attribute(group, "ou").to_string(),
            }),
            _ => Err(DistinguishedNameError::ComponentCount {
                dn: dn.to_string(),
                count: parts.len(),
            }),
        }
    }

    /// User name from the `cn=` component.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Group name from the `ou=` component; empty when the DN has no group component.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }
}

fn strip_attribute<'a>(component: &'a str, attribute: &str) -> &'a str {
    let prefix_len = attribute.len() + 1;
    match component.get(..prefix_len) {
        Some(prefix)
            if prefix.ends_with('=') && prefix[..attribute.len()].eq_ignore_ascii_case(attribute) =>
        {
            &component[prefix_len..]
        }
        _ => component,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseDn {
        BaseDn::new("dc=example,dc=com").unwrap()
    }

    #[test]
    fn parse_user_and_group() {
        let identity = BindIdentity::parse("cn=alice,ou=staff,dc=example,dc=com", &base()).unwrap();
        assert_eq!(identity.user(), "alice");
        assert_eq!(identity.group(), "staff");
    }

    #[test]
    fn parse_user_only() {
        let identity = BindIdentity::parse("cn=alice,dc=example,dc=com", &base()).unwrap();
        assert_eq!(identity.user(), "alice");
        assert_eq!(identity.group(), "");
    }

    #[test]
    fn base_comparison_ignores_case() {
        let identity = BindIdentity::parse("CN=Alice,OU=Staff,DC=Example,DC=Com", &base()).unwrap();
        assert_eq!(identity.user(), "Alice");
        assert_eq!(identity.group(), "Staff");
    }

    #[test]
    fn rejects_foreign_base() {
        let err = BindIdentity::parse("cn=alice,ou=staff,dc=other,dc=com", &base()).unwrap_err();
        assert!(matches!(err, DistinguishedNameError::OutsideBase { .. }));

        // The base on its own is not a bind identity.
        let err = BindIdentity::parse("dc=example,dc=com", &base()).unwrap_err();
        assert!(matches!(err, DistinguishedNameError::OutsideBase { .. }));
    }

    #[test]
    fn rejects_deep_dn() {
        let err =
            BindIdentity::parse("cn=alice,ou=staff,ou=people,dc=example,dc=com", &base())
                .unwrap_err();
        assert_eq!(
            err,
            DistinguishedNameError::ComponentCount {
                dn: "cn=alice,ou=staff,ou=people,dc=example,dc=com".to_string(),
                count: 3,
            }
        );
    }

    #[test]
    fn malformed_prefix_is_kept() {
        let identity = BindIdentity::parse("uid=alice,ou=staff,dc=example,dc=com", &base()).unwrap();
        assert_eq!(identity.user(), "uid=alice");
    }

    #[test]
    fn identity_error_maps_to_core_error() {
        let err: CoreError = DistinguishedNameError::EmptyBase.into();
        assert!(matches!(err, CoreError::IdentityFormat(_)));
    }

    #[test]
    fn base_contains() {
        let base = base();
        assert!(base.contains("dc=example,dc=com"));
        assert!(base.contains("ou=groups,DC=EXAMPLE,dc=com"));
        assert!(!base.contains("dc=com"));
        assert!(!base.contains("xdc=example,dc=com"));
        assert!(!base.contains(""));
    }

    #[test]
    fn builds_entry_dns() {
        let base = base();
        assert_eq!(
            base.user_dn("alice", "staff"),
            "cn=alice,ou=staff,dc=example,dc=com"
        );
        assert_eq!(base.group_dn("staff"), "cn=staff,ou=groups,dc=example,dc=com");
        assert_eq!(base.user_dn("ghost", ""), "cn=ghost,ou=,dc=example,dc=com");
    }

    #[test]
    fn empty_base_is_rejected() {
        assert_eq!(BaseDn::new("  ").unwrap_err(), DistinguishedNameError::EmptyBase);
    }
}
