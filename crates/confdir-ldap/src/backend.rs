//! Bind, search and close handlers for the protocol layer.
//!
//! The protocol library owns the connection, filter parsing and filter evaluation. It hands
//! this module the bind credentials, or a search together with the object class it classified
//! the filter as, and gets back a result code or the candidate entries.
//!
//! Every handler reads one snapshot of the directory for its whole duration. Reloading swaps
//! the snapshot pointer; requests already running keep the snapshot they started with.

use async_trait::async_trait;
use confdir_core::{ConnectionInfo, DirectoryConfig, Error, ResultCode};
use std::{
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{debug, error, info, warn, Level};

use crate::{
    credentials::CredentialValidator,
    directory::Directory,
    dn::BindIdentity,
    entry::{DirectoryEntry, LdapEntry},
    Result,
};

/// Handlers invoked by an LDAP protocol library.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Authenticates a simple bind.
    ///
    /// Every failure is reported as [`ResultCode::InvalidCredentials`].
    async fn bind(&self, dn: &str, password: &str, connection: &ConnectionInfo) -> ResultCode;

    /// Returns the candidate entries for a search issued by `caller_dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientAccess`] for anonymous callers and out-of-namespace DNs,
    /// and [`Error::UnsupportedQuery`] for filters that are unparsable or target another object
    /// class. [`Error::result_code`] gives the wire result for either.
    async fn search(
        &self,
        caller_dn: &str,
        request: &SearchRequest,
        connection: &ConnectionInfo,
    ) -> Result<SearchResult>;

    /// Releases per-connection state.
    ///
    /// # Errors
    ///
    /// Implementations may fail to release resources.
    async fn close(&self, caller_dn: &str, connection: &ConnectionInfo) -> Result<()>;
}

/// A search as classified by the protocol library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base DN.
    pub base_dn: String,
    /// Filter expression, evaluated by the protocol library against the returned entries.
    pub filter: String,
    /// Object class the filter targets; `None` when the filter could not be parsed.
    pub object_class: Option<String>,
}

impl SearchRequest {
    /// Creates a request whose filter was classified as targeting `object_class`.
    #[must_use]
    pub fn new(
        base_dn: impl Into<String>,
        filter: impl Into<String>,
        object_class: impl Into<String>,
    ) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            object_class: Some(object_class.into()),
        }
    }

    /// Creates a request whose filter could not be parsed.
    #[must_use]
    pub fn unparsable(base_dn: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            object_class: None,
        }
    }
}

/// Entries returned for a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Candidate entries, before filter evaluation.
    pub entries: Vec<LdapEntry>,
    /// Response controls. Always empty.
    pub controls: Vec<String>,
    /// Result code of the search.
    pub result_code: ResultCode,
}

impl SearchResult {
    fn success(entries: Vec<LdapEntry>) -> Self {
        Self {
            entries,
            controls: Vec::new(),
            result_code: ResultCode::Success,
        }
    }
}

/// Entry set a search can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// Every group entry.
    Groups,
    /// Every user entry.
    Accounts,
}

impl FromStr for QueryTarget {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("posixgroup") {
            Ok(Self::Groups)
        } else if s.is_empty() || s.eq_ignore_ascii_case("posixaccount") {
            Ok(Self::Accounts)
        } else {
            Err(Error::UnsupportedQuery(format!(
                "unsupported object class `{s}`"
            )))
        }
    }
}

/// Backend serving a [`DirectoryConfig`] held in memory.
pub struct ConfigBackend {
    directory: RwLock<Arc<Directory>>,
    validator: CredentialValidator,
}

impl ConfigBackend {
    /// Creates a backend with the wall clock and the default OTP policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the configuration does not validate and
    /// [`Error::IdentityFormat`] if its base DN is blank.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        config.validate_config()?;
        Ok(Self {
            directory: RwLock::new(Arc::new(Directory::new(config)?)),
            validator: CredentialValidator::default(),
        })
    }

    /// Replaces the credential validator, e.g. to inject a clock.
    #[must_use]
    pub fn with_validator(mut self, validator: CredentialValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Directory> {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validates `config` and makes it the snapshot for subsequent requests.
    ///
    /// On error the current snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigBackend::new`].
    pub fn reload(&self, config: DirectoryConfig) -> Result<()> {
        config.validate_config()?;
        let next = Arc::new(Directory::new(config)?);
        let (users, groups) = (next.users().len(), next.groups().len());

        *self
            .directory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;

        info!(users, groups, "directory configuration reloaded");
        Ok(())
    }

    /// Runs every bind gate and reports the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityFormat`] for DNs outside the base or of the wrong shape,
    /// [`Error::NotFound`] for unknown users or groups, and the errors of
    /// [`CredentialValidator::validate`].
    pub fn authenticate(&self, dn: &str, password: &str) -> Result<()> {
        let directory = self.snapshot();
        let identity = BindIdentity::parse(dn, directory.base_dn())?;

        let user = directory
            .user(identity.user())
            .ok_or_else(|| Error::NotFound(format!("user `{}` not found", identity.user())))?;
        let group = directory
            .group_by_name(identity.group())
            .ok_or_else(|| Error::NotFound(format!("group `{}` not found", identity.group())))?;

        self.validator.validate(user, group, password)
    }

    /// Checks the caller and search base, then builds every entry of the requested kind.
    ///
    /// # Errors
    ///
    /// See [`Backend::search`].
    pub fn entries(&self, caller_dn: &str, request: &SearchRequest) -> Result<Vec<LdapEntry>> {
        let directory = self.snapshot();
        let base = directory.base_dn();

        if caller_dn.is_empty() {
            return Err(Error::InsufficientAccess(
                "anonymous search is not allowed".to_string(),
            ));
        }
        if base.relative_part(caller_dn).is_none() {
            return Err(Error::InsufficientAccess(format!(
                "caller `{caller_dn}` is not within base `{base}`"
            )));
        }
        if !base.contains(&request.base_dn) {
            return Err(Error::InsufficientAccess(format!(
                "search base `{}` is not within base `{base}`",
                request.base_dn
            )));
        }

        let object_class = request.object_class.as_deref().ok_or_else(|| {
            Error::UnsupportedQuery(format!("unparsable filter `{}`", request.filter))
        })?;
        let entries = match object_class.parse::<QueryTarget>()? {
            QueryTarget::Groups => DirectoryEntry::groups(&directory),
            QueryTarget::Accounts => DirectoryEntry::accounts(&directory),
        };

        Ok(entries.into_iter().map(LdapEntry::from).collect())
    }
}

impl std::fmt::Debug for ConfigBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBackend")
            .field("base_dn", &self.snapshot().base_dn().as_str())
            .field("validator", &self.validator)
            .finish()
    }
}

#[async_trait]
impl Backend for ConfigBackend {
    async fn bind(&self, dn: &str, password: &str, connection: &ConnectionInfo) -> ResultCode {
        info!(%dn, remote = %connection, "bind request");

        match self.authenticate(dn, password) {
            Ok(()) => {
                info!(%dn, remote = %connection, "bind succeeded");
                ResultCode::Success
            }
            Err(err) => {
                log_rejection("bind", dn, connection, &err);
                ResultCode::InvalidCredentials
            }
        }
    }

    async fn search(
        &self,
        caller_dn: &str,
        request: &SearchRequest,
        connection: &ConnectionInfo,
    ) -> Result<SearchResult> {
        info!(
            caller = %caller_dn,
            base = %request.base_dn,
            filter = %request.filter,
            remote = %connection,
            "search request"
        );

        match self.entries(caller_dn, request) {
            Ok(entries) => {
                debug!(caller = %caller_dn, count = entries.len(), "search returned entries");
                Ok(SearchResult::success(entries))
            }
            Err(err) => {
                log_rejection("search", caller_dn, connection, &err);
                Err(err)
            }
        }
    }

    async fn close(&self, caller_dn: &str, connection: &ConnectionInfo) -> Result<()> {
        debug!(caller = %caller_dn, remote = %connection, "connection closed");
        Ok(())
    }
}

/// Operator-facing failures log at `ERROR`, client mistakes at `WARN`.
fn rejection_level(err: &Error) -> Level {
    if err.should_log() {
        Level::ERROR
    } else {
        Level::WARN
    }
}

fn log_rejection(operation: &str, dn: &str, connection: &ConnectionInfo, err: &Error) {
    if rejection_level(err) == Level::ERROR {
        error!(operation, %dn, remote = %connection, code = err.error_code(), error = %err, "request failed");
    } else {
        warn!(operation, %dn, remote = %connection, code = err.error_code(), error = %err, "request rejected");
    }
}
