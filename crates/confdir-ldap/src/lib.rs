//! # confdir-ldap
//!
//! Directory policy for an LDAP server whose users and groups come from a configuration file.
//!
//! The crate decides who may bind and what a search returns. Wire encoding, filter evaluation
//! and connection handling belong to the protocol library that drives a [`Backend`].
//!
//! ## Modules
//!
//! - [`dn`] - Base namespace and bind DN parsing
//! - [`credentials`] - Password digests, one-time codes and the bind gates
//! - [`directory`] - Indexed configuration snapshots
//! - [`resolver`] - Transitive group membership
//! - [`entry`], [`user`], [`group`] - `posixAccount` and `posixGroup` entries
//! - [`backend`] - Bind, search and close handlers with snapshot reload

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod credentials;
pub mod directory;
pub mod dn;
pub mod entry;
pub mod group;
pub mod resolver;
pub mod user;

pub use backend::{Backend, ConfigBackend, QueryTarget, SearchRequest, SearchResult};
pub use credentials::{
    generate_totp, password_digest, verify_totp, Clock, CredentialValidator, OtpPolicy,
    SystemClock,
};
pub use directory::Directory;
pub use dn::{BaseDn, BindIdentity, DistinguishedNameError, GROUPS_OU};
pub use entry::{Attribute, DirectoryEntry, LdapEntry};
pub use group::GroupEntry;
pub use resolver::GroupResolver;
pub use user::{AccountEntry, AccountStatus};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = confdir_core::Result<T>;
