//! # confdir-core
//!
//! Core types and configuration for the confdir directory service.
//!
//! This crate provides the configuration records the directory is served from, the error
//! taxonomy shared by every directory operation, and the protocol-facing result types.
//!
//! ## Modules
//!
//! - [`error`] - Error types and LDAP result code mapping
//! - [`config`] - Directory configuration records, loading and validation
//! - [`types`] - Result codes and connection metadata

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{DirectoryConfig, GroupRecord, UserRecord};
pub use error::{Error, Result};
pub use types::{ConnectionInfo, ResultCode};
