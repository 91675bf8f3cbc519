//! Directory entries as handed to the protocol layer.

use serde::Serialize;

use crate::{directory::Directory, group::GroupEntry, user::AccountEntry};

/// A named, multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Attribute name, cased as published.
    pub name: String,
    /// Values in publication order.
    pub values: Vec<String>,
}

impl Attribute {
    /// Creates an attribute with the given values.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Creates a single-valued attribute.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }
}

/// A flattened entry: DN plus ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attributes in publication order.
    pub attributes: Vec<Attribute>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute. Attribute names match case-insensitively.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(attribute))
            .map(|attr| attr.values.as_slice())
    }

    /// Returns true when the entry carries the attribute, even with no values.
    #[must_use]
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.values(attribute).is_some()
    }
}

/// A user or group entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DirectoryEntry {
    /// `posixAccount` entry.
    Account(AccountEntry),
    /// `posixGroup` entry.
    Group(GroupEntry),
}

impl DirectoryEntry {
    /// Every group entry in the snapshot, in configuration order.
    #[must_use]
    pub fn groups(directory: &Directory) -> Vec<Self> {
        directory
            .groups()
            .iter()
            .map(|group| Self::Group(GroupEntry::project(group, directory)))
            .collect()
    }

    /// Every user entry in the snapshot, in configuration order.
    #[must_use]
    pub fn accounts(directory: &Directory) -> Vec<Self> {
        directory
            .users()
            .iter()
            .map(|user| Self::Account(AccountEntry::project(user, directory)))
            .collect()
    }

    /// Distinguished name of the entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        match self {
            Self::Account(account) => &account.dn,
            Self::Group(group) => &group.dn,
        }
    }

    /// Attributes in publication order.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        match self {
            Self::Account(account) => account.attributes(),
            Self::Group(group) => group.attributes(),
        }
    }
}

impl From<DirectoryEntry> for LdapEntry {
    fn from(entry: DirectoryEntry) -> Self {
        let attributes = entry.attributes();
        let dn = match entry {
            DirectoryEntry::Account(account) => account.dn,
            DirectoryEntry::Group(group) => group.dn,
        };
        Self { dn, attributes }
    }
}
