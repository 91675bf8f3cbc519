//! `posixAccount` entries projected from user records.

use confdir_core::UserRecord;
use serde::Serialize;

use crate::{directory::Directory, entry::Attribute, resolver::GroupResolver};

/// Object class of user entries.
pub const ACCOUNT_OBJECT_CLASS: &str = "posixAccount";
/// Login shell used when the record does not set one.
pub const DEFAULT_LOGIN_SHELL: &str = "/bin/bash";
/// Parent of the default home directory.
pub const DEFAULT_HOME_ROOT: &str = "/home";

/// Account status reported in the `accountStatus` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account may be used.
    Active,
    /// Account is disabled in the configuration.
    Inactive,
}

impl AccountStatus {
    /// Attribute value for the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// A user as published in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Login name (`cn` and `uid`).
    pub name: String,
    /// Given name, when set.
    pub given_name: Option<String>,
    /// Surname, when set.
    pub surname: Option<String>,
    /// Primary group name (`ou`); empty when the primary group does not exist.
    pub primary_group_name: String,
    /// `uidNumber`.
    pub uid_number: u32,
    /// `accountStatus`.
    pub status: AccountStatus,
    /// Mail address, when set.
    pub mail: Option<String>,
    /// `loginShell`, defaulted when the record has none.
    pub login_shell: String,
    /// `homeDirectory`, defaulted when the record has none.
    pub home_directory: String,
    /// `gidNumber` of the primary group.
    pub gid_number: u32,
    /// DNs of every group the user belongs to.
    pub member_of: Vec<String>,
    /// SSH public keys.
    pub ssh_public_keys: Vec<String>,
}

impl AccountEntry {
    /// Projects a user record against the snapshot it belongs to.
    #[must_use]
    pub fn project(user: &UserRecord, directory: &Directory) -> Self {
        let login_shell = non_empty(user.login_shell.as_ref())
            .unwrap_or_else(|| DEFAULT_LOGIN_SHELL.to_string());
        let home_directory = non_empty(user.home_directory.as_ref())
            .unwrap_or_else(|| format!("{DEFAULT_HOME_ROOT}/{}", user.name));

        Self {
            dn: directory.user_dn(user),
            name: user.name.clone(),
            given_name: non_empty(user.given_name.as_ref()),
            surname: non_empty(user.surname.as_ref()),
            primary_group_name: directory.group_name(user.primary_group).to_string(),
            uid_number: user.unix_id,
            status: if user.disabled {
                AccountStatus::Inactive
            } else {
                AccountStatus::Active
            },
            mail: non_empty(user.mail.as_ref()),
            login_shell,
            home_directory,
            gid_number: user.primary_group,
            member_of: GroupResolver::new(directory).group_dns(&user.effective_groups()),
            ssh_public_keys: user.ssh_keys.clone(),
        }
    }

    /// `description` and `gecos` value.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{} via LDAP", self.name)
    }

    /// Attribute list in publication order.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut attrs = vec![
            Attribute::single("cn", &self.name),
            Attribute::single("uid", &self.name),
        ];
        if let Some(given_name) = &self.given_name {
            attrs.push(Attribute::single("givenName", given_name));
        }
        if let Some(surname) = &self.surname {
            attrs.push(Attribute::single("sn", surname));
        }
        attrs.push(Attribute::single("ou", &self.primary_group_name));
        attrs.push(Attribute::single("uidNumber", self.uid_number.to_string()));
        attrs.push(Attribute::single("accountStatus", self.status.as_str()));
        if let Some(mail) = &self.mail {
            attrs.push(Attribute::single("mail", mail));
        }
        attrs.push(Attribute::single("objectClass", ACCOUNT_OBJECT_CLASS));
        attrs.push(Attribute::single("loginShell", &self.login_shell));
        attrs.push(Attribute::single("homeDirectory", &self.home_directory));
        attrs.push(Attribute::single("description", self.description()));
        attrs.push(Attribute::single("gecos", self.description()));
        attrs.push(Attribute::single("gidNumber", self.gid_number.to_string()));
        attrs.push(Attribute::new("memberOf", self.member_of.clone()));
        if !self.ssh_public_keys.is_empty() {
            attrs.push(Attribute::new("sshPublicKey", self.ssh_public_keys.clone()));
        }
        attrs
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}
