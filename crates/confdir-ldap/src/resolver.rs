//! Group membership resolution.
//!
//! Memberships are computed per query from the snapshot; nothing is precomputed. A group's
//! members are the users that list it as primary or secondary group, plus the members of every
//! group it includes, transitively. Inclusion may be cyclic, so every walk carries a visited set.
//! All results are deduplicated and returned in lexicographic order.

use confdir_core::UserRecord;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::directory::Directory;

/// Resolves group memberships against a directory snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GroupResolver<'a> {
    directory: &'a Directory,
}

impl<'a> GroupResolver<'a> {
    /// Creates a resolver over `directory`.
    #[must_use]
    pub const fn new(directory: &'a Directory) -> Self {
        Self { directory }
    }

    /// Sorted login names of every direct and included member of the group (`memberUid`).
    #[must_use]
    pub fn member_names(&self, gid: u32) -> Vec<String> {
        self.members(gid, |user| user.name.clone())
    }

    /// Sorted user DNs of every direct and included member of the group (`uniqueMember`).
    #[must_use]
    pub fn member_dns(&self, gid: u32) -> Vec<String> {
        self.members(gid, |user| self.directory.user_dn(user))
    }

    /// Sorted DNs of every group a user with the given group ids belongs to (`memberOf`).
    ///
    /// Includes the groups named by `gids` and, transitively, every group that includes one of
    /// them.
    #[must_use]
    pub fn group_dns(&self, gids: &[u32]) -> Vec<String> {
        let mut pending = gids.to_vec();
        let mut visited = HashSet::new();
        let mut dns = BTreeSet::new();

        while let Some(gid) = pending.pop() {
            if !visited.insert(gid) {
                continue;
            }

            if let Some(group) = self.directory.group(gid) {
                dns.insert(self.directory.group_dn(group));
            }

            for group in self.directory.groups() {
                if group.unix_id != gid && group.include_groups.contains(&gid) {
                    pending.push(group.unix_id);
                }
            }
        }

        dns.into_iter().collect()
    }

    fn members<F>(&self, gid: u32, project: F) -> Vec<String>
    where
        F: Fn(&UserRecord) -> String,
    {
        let mut visited = HashSet::new();
        let mut members = BTreeSet::new();
        self.collect_members(gid, &mut visited, &mut members, &project);
        members.into_iter().collect()
    }

    fn collect_members<F>(
        &self,
        gid: u32,
        visited: &mut HashSet<u32>,
        members: &mut BTreeSet<String>,
        project: &F,
    ) where
        F: Fn(&UserRecord) -> String,
    {
        if !visited.insert(gid) {
            debug!(gid, "group already resolved in this walk");
            return;
        }

        members.extend(
            self.directory
                .users()
                .iter()
                .filter(|user| user.is_direct_member_of(gid))
                .map(project),
        );

        let Some(group) = self.directory.group(gid) else {
            return;
        };
        for &included in &group.include_groups {
            if included == gid {
                debug!(gid, "ignoring group listed as its own included group");
                continue;
            }
            self.collect_members(included, visited, members, project);
        }
    }
}
