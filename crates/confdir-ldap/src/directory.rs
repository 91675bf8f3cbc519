//! Indexed, immutable view of a directory configuration.

use confdir_core::{DirectoryConfig, GroupRecord, UserRecord};
use std::collections::HashMap;

use crate::{dn::BaseDn, Result};

/// A configuration snapshot with name and id lookups.
///
/// When a snapshot is built from unvalidated records that repeat a name or id, lookups return
/// the first record in configuration order.
#[derive(Debug)]
pub struct Directory {
    config: DirectoryConfig,
    base_dn: BaseDn,
    users_by_name: HashMap<String, usize>,
    groups_by_name: HashMap<String, usize>,
    groups_by_id: HashMap<u32, usize>,
}

impl Directory {
    /// Builds the lookup indices for a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`confdir_core::Error::IdentityFormat`] if the base DN is blank.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let base_dn = BaseDn::new(config.base_dn.as_str())?;

        let mut users_by_name = HashMap::with_capacity(config.users.len());
        for (index, user) in config.users.iter().enumerate() {
            users_by_name.entry(user.name.clone()).or_insert(index);
        }

        let mut groups_by_name = HashMap::with_capacity(config.groups.len());
        let mut groups_by_id = HashMap::with_capacity(config.groups.len());
        for (index, group) in config.groups.iter().enumerate() {
            groups_by_name.entry(group.name.clone()).or_insert(index);
            groups_by_id.entry(group.unix_id).or_insert(index);
        }

        Ok(Self {
            config,
            base_dn,
            users_by_name,
            groups_by_name,
            groups_by_id,
        })
    }

    /// The underlying configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// The base namespace.
    #[must_use]
    pub fn base_dn(&self) -> &BaseDn {
        &self.base_dn
    }

    /// All users in configuration order.
    #[must_use]
    pub fn users(&self) -> &[UserRecord] {
        &self.config.users
    }

    /// All groups in configuration order.
    #[must_use]
    pub fn groups(&self) -> &[GroupRecord] {
        &self.config.groups
    }

    /// Looks up a user by exact name.
    #[must_use]
    pub fn user(&self, name: &str) -> Option<&UserRecord> {
        self.users_by_name
            .get(name)
            .map(|&index| &self.config.users[index])
    }

    /// Looks up a group by exact name.
    #[must_use]
    pub fn group_by_name(&self, name: &str) -> Option<&GroupRecord> {
        self.groups_by_name
            .get(name)
            .map(|&index| &self.config.groups[index])
    }

    /// Looks up a group by unix id.
    #[must_use]
    pub fn group(&self, gid: u32) -> Option<&GroupRecord> {
        self.groups_by_id
            .get(&gid)
            .map(|&index| &self.config.groups[index])
    }

    /// Name of the group with the given id, or an empty string when there is none.
    #[must_use]
    pub fn group_name(&self, gid: u32) -> &str {
        self.group(gid).map_or("", |group| group.name.as_str())
    }

    /// Distinguished name of a user entry.
    #[must_use]
    pub fn user_dn(&self, user: &UserRecord) -> String {
        self.base_dn
            .user_dn(&user.name, self.group_name(user.primary_group))
    }

    /// Distinguished name of a group entry.
    #[must_use]
    pub fn group_dn(&self, group: &GroupRecord) -> String {
        self.base_dn.group_dn(&group.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

    fn unvalidated(users: Vec<UserRecord>, groups: Vec<GroupRecord>) -> Directory {
        Directory::new(DirectoryConfig {
            base_dn: "dc=example,dc=com".to_string(),
            users,
            groups,
        })
        .unwrap()
    }

    #[test]
    fn lookups() {
        let directory = unvalidated(
            vec![UserRecord::new("alice", 1000, 500, DIGEST)],
            vec![GroupRecord::new("staff", 500)],
        );

        assert_eq!(directory.user("alice").unwrap().unix_id, 1000);
        assert!(directory.user("Alice").is_none());
        assert_eq!(directory.group(500).unwrap().name, "staff");
        assert_eq!(directory.group_by_name("staff").unwrap().unix_id, 500);
        assert_eq!(directory.group_name(404), "");
        assert_eq!(
            directory.user_dn(directory.user("alice").unwrap()),
            "cn=alice,ou=staff,dc=example,dc=com"
        );
    }

    #[test]
    fn first_match_wins_on_duplicates() {
        let directory = unvalidated(
            vec![
                UserRecord::new("alice", 1000, 500, DIGEST),
                UserRecord::new("alice", 2000, 500, DIGEST),
            ],
            vec![GroupRecord::new("staff", 500), GroupRecord::new("ops", 500)],
        );

        assert_eq!(directory.user("alice").unwrap().unix_id, 1000);
        assert_eq!(directory.group_name(500), "staff");
    }

    #[test]
    fn user_without_primary_group_has_empty_ou() {
        let directory = unvalidated(vec![UserRecord::new("ghost", 1000, 404, DIGEST)], Vec::new());
        assert_eq!(
            directory.user_dn(&directory.users()[0]),
            "cn=ghost,ou=,dc=example,dc=com"
        );
    }
}
