//! `posixGroup` entries projected from group records.

use confdir_core::GroupRecord;
use serde::Serialize;

use crate::{directory::Directory, entry::Attribute, resolver::GroupResolver};

/// Object class of group entries.
pub const GROUP_OBJECT_CLASS: &str = "posixGroup";

/// A group as published in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Group name (`cn`).
    pub name: String,
    /// `gidNumber`.
    pub gid_number: u32,
    /// Member DNs, including members of included groups.
    pub unique_members: Vec<String>,
    /// Member login names, including members of included groups.
    pub member_uids: Vec<String>,
}

impl GroupEntry {
    /// Projects a group record against the snapshot it belongs to.
    #[must_use]
    pub fn project(group: &GroupRecord, directory: &Directory) -> Self {
        let resolver = GroupResolver::new(directory);
        Self {
            dn: directory.group_dn(group),
            name: group.name.clone(),
            gid_number: group.unix_id,
            unique_members: resolver.member_dns(group.unix_id),
            member_uids: resolver.member_names(group.unix_id),
        }
    }

    /// Returns the number of members in the group.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.member_uids.len()
    }

    /// Checks whether the given login name is a member of this group.
    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.member_uids.binary_search_by(|uid| uid.as_str().cmp(name)).is_ok()
    }

    /// Attribute list in publication order.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        vec![
            Attribute::single("cn", &self.name),
            Attribute::single("description", format!("{} via LDAP", self.name)),
            Attribute::single("gidNumber", self.gid_number.to_string()),
            Attribute::single("objectClass", GROUP_OBJECT_CLASS),
            Attribute::new("uniqueMember", self.unique_members.clone()),
            Attribute::new("memberUid", self.member_uids.clone()),
        ]
    }
}
