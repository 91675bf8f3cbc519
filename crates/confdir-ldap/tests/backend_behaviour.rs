//! Integration tests driving the backend from a JSON directory configuration.
//!
//! The fixture uses the flat legacy key names so loading also covers the aliases.

use chrono::{DateTime, TimeZone, Utc};
use confdir_core::{ConnectionInfo, DirectoryConfig, Error, GroupRecord, ResultCode, UserRecord};
use confdir_ldap::{
    generate_totp, Backend, Clock, ConfigBackend, CredentialValidator, GroupResolver, OtpPolicy,
    SearchRequest,
};
use std::path::PathBuf;
use std::sync::Arc;

const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
const BASE: &str = "dc=example,dc=org";
const ALICE: &str = "cn=alice,ou=staff,dc=example,dc=org";
const BOB: &str = "cn=bob,ou=admins,dc=example,dc=org";

/// Clock pinned to one instant.
struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_config() -> DirectoryConfig {
    let path = fixtures_dir().join("directory.json");
    DirectoryConfig::from_path(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture at {}: {e}", path.display()))
}

fn backend_at(seconds: i64) -> ConfigBackend {
    ConfigBackend::new(load_config()).unwrap().with_validator(CredentialValidator::new(
        Arc::new(FixedClock(at(seconds))),
        OtpPolicy::new(),
    ))
}

fn conn() -> ConnectionInfo {
    ConnectionInfo::new("192.0.2.10:40312".parse().unwrap())
}

fn accounts() -> SearchRequest {
    SearchRequest::new(BASE, "(objectClass=posixAccount)", "posixAccount")
}

fn groups() -> SearchRequest {
    SearchRequest::new(BASE, "(objectClass=posixGroup)", "posixGroup")
}

#[test]
fn test_fixture_loads_with_legacy_keys() {
    let config = load_config();

    assert_eq!(config.base_dn, BASE);
    assert_eq!(config.users.len(), 3);
    assert_eq!(config.groups.len(), 5);

    let bob = &config.users[1];
    assert_eq!(bob.other_groups, vec![5503]);
    assert!(bob.requires_otp());
    assert_eq!(bob.home_directory.as_deref(), Some("/srv/bob"));
    assert!(!format!("{bob:?}").contains(SECRET));
    assert_eq!(config.groups[1].include_groups, vec![5501]);
}

#[tokio::test]
async fn test_password_bind() {
    let backend = backend_at(59);

    assert_eq!(backend.bind(ALICE, "secret", &conn()).await, ResultCode::Success);
    assert_eq!(
        backend.bind(ALICE, "wrong", &conn()).await,
        ResultCode::InvalidCredentials
    );
    assert_eq!(backend.bind(ALICE, "", &conn()).await, ResultCode::InvalidCredentials);
}

#[tokio::test]
async fn test_disabled_user_still_binds() {
    let backend = backend_at(59);
    assert_eq!(
        backend
            .bind("cn=carol,ou=loop-a,dc=example,dc=org", "secret", &conn())
            .await,
        ResultCode::Success
    );
}

#[tokio::test]
async fn test_binds_outside_base_fail() {
    let backend = backend_at(59);

    for dn in [
        "cn=alice,ou=staff,dc=example,dc=com",
        "cn=alice,ou=staff,dc=example",
        "cn=alice,ou=staff",
        "dc=example,dc=org",
    ] {
        assert_eq!(
            backend.bind(dn, "secret", &conn()).await,
            ResultCode::InvalidCredentials,
            "{dn}"
        );
    }
}

#[tokio::test]
async fn test_otp_bind_window() {
    let policy = OtpPolicy::new();
    let now = 1_111_111_109;
    let backend = backend_at(now);

    let current = generate_totp(SECRET, at(now), &policy).unwrap();
    assert_eq!(current, "081804");
    assert_eq!(
        backend.bind(BOB, &format!("secret{current}"), &conn()).await,
        ResultCode::Success
    );

    let previous = generate_totp(SECRET, at(now - 30), &policy).unwrap();
    assert_eq!(
        backend.bind(BOB, &format!("secret{previous}"), &conn()).await,
        ResultCode::Success
    );

    let stale = generate_totp(SECRET, at(now - 90), &policy).unwrap();
    assert_eq!(
        backend.bind(BOB, &format!("secret{stale}"), &conn()).await,
        ResultCode::InvalidCredentials
    );

    assert_eq!(
        backend.bind(BOB, "secret", &conn()).await,
        ResultCode::InvalidCredentials
    );
    assert_eq!(
        backend.bind(BOB, &format!("wrong{current}"), &conn()).await,
        ResultCode::InvalidCredentials
    );
}

#[tokio::test]
async fn test_account_search() {
    let backend = backend_at(59);
    let result = backend.search(ALICE, &accounts(), &conn()).await.unwrap();

    assert_eq!(result.result_code, ResultCode::Success);
    assert!(result.controls.is_empty());
    let dns: Vec<&str> = result.entries.iter().map(|e| e.dn.as_str()).collect();
    assert_eq!(
        dns,
        vec![ALICE, BOB, "cn=carol,ou=loop-a,dc=example,dc=org"]
    );

    let alice = &result.entries[0];
    assert_eq!(alice.first("givenName"), Some("Alice"));
    assert_eq!(alice.first("sn"), Some("Liddell"));
    assert_eq!(alice.first("ou"), Some("staff"));
    assert_eq!(alice.first("uidNumber"), Some("5001"));
    assert_eq!(alice.first("gidNumber"), Some("5501"));
    assert_eq!(alice.first("loginShell"), Some("/bin/bash"));
    assert_eq!(alice.first("homeDirectory"), Some("/home/alice"));
    assert_eq!(alice.first("accountStatus"), Some("active"));
    assert_eq!(
        alice.values("memberOf").unwrap(),
        &[
            "cn=admins,ou=groups,dc=example,dc=org".to_string(),
            "cn=staff,ou=groups,dc=example,dc=org".to_string(),
        ]
    );
    assert_eq!(alice.values("sshPublicKey").map(<[String]>::len), Some(1));

    let bob = &result.entries[1];
    assert_eq!(bob.first("loginShell"), Some("/bin/zsh"));
    assert!(bob.first("mail").is_none());
    assert!(bob.values("sshPublicKey").is_none());
    assert_eq!(
        bob.values("memberOf").unwrap(),
        &[
            "cn=admins,ou=groups,dc=example,dc=org".to_string(),
            "cn=ops,ou=groups,dc=example,dc=org".to_string(),
        ]
    );

    let carol = &result.entries[2];
    assert_eq!(carol.first("accountStatus"), Some("inactive"));
    assert_eq!(
        carol.values("memberOf").unwrap(),
        &[
            "cn=loop-a,ou=groups,dc=example,dc=org".to_string(),
            "cn=loop-b,ou=groups,dc=example,dc=org".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_group_search_resolves_inclusion() {
    let backend = backend_at(59);
    let result = backend.search(BOB, &groups(), &conn()).await.unwrap();
    assert_eq!(result.entries.len(), 5);

    let admins = result
        .entries
        .iter()
        .find(|entry| entry.first("cn") == Some("admins"))
        .unwrap();
    assert_eq!(admins.first("gidNumber"), Some("5502"));
    assert_eq!(admins.first("objectClass"), Some("posixGroup"));
    assert_eq!(
        admins.values("uniqueMember").unwrap(),
        &[ALICE.to_string(), BOB.to_string()]
    );
    assert_eq!(
        admins.values("memberUid").unwrap(),
        &["alice".to_string(), "bob".to_string()]
    );

    let loop_b = result
        .entries
        .iter()
        .find(|entry| entry.first("cn") == Some("loop-b"))
        .unwrap();
    assert_eq!(loop_b.values("memberUid").unwrap(), &["carol".to_string()]);
}

#[tokio::test]
async fn test_search_scope_checks() {
    let backend = backend_at(59);

    let anonymous = backend.search("", &accounts(), &conn()).await.unwrap_err();
    assert!(matches!(anonymous, Error::InsufficientAccess(_)));

    let foreign = backend
        .search("cn=alice,ou=staff,dc=example,dc=com", &accounts(), &conn())
        .await
        .unwrap_err();
    assert_eq!(foreign.result_code(), ResultCode::InsufficientAccessRights);

    let outside = SearchRequest::new("dc=example,dc=com", "(uid=*)", "posixAccount");
    let err = backend.search(ALICE, &outside, &conn()).await.unwrap_err();
    assert_eq!(err.result_code(), ResultCode::InsufficientAccessRights);

    let subtree = SearchRequest::new("ou=staff,dc=example,dc=org", "(uid=*)", "posixAccount");
    assert!(backend.search(ALICE, &subtree, &conn()).await.is_ok());

    let unsupported = SearchRequest::new(BASE, "(objectClass=device)", "device");
    let err = backend.search(ALICE, &unsupported, &conn()).await.unwrap_err();
    assert_eq!(err.result_code(), ResultCode::OperationsError);
}

#[test]
fn test_cyclic_inclusion_terminates() {
    let backend = backend_at(59);
    let directory = backend.snapshot();
    let resolver = GroupResolver::new(&directory);

    assert_eq!(resolver.member_names(5504), vec!["carol"]);
    assert_eq!(resolver.member_names(5504), resolver.member_names(5505));
}

#[tokio::test]
async fn test_reload_keeps_in_flight_snapshot() {
    let backend = backend_at(59);
    let in_flight = backend.snapshot();

    let digest = confdir_ldap::password_digest("hunter2");
    let replacement = DirectoryConfig::new(
        BASE,
        vec![UserRecord::new("alice", 5001, 5501, digest)],
        vec![GroupRecord::new("staff", 5501)],
    )
    .unwrap();
    backend.reload(replacement).unwrap();

    assert_eq!(in_flight.users().len(), 3);
    assert_eq!(backend.snapshot().users().len(), 1);
    assert_eq!(
        backend.bind(ALICE, "secret", &conn()).await,
        ResultCode::InvalidCredentials
    );
    assert_eq!(backend.bind(ALICE, "hunter2", &conn()).await, ResultCode::Success);
    assert_eq!(
        backend.bind(BOB, "secret", &conn()).await,
        ResultCode::InvalidCredentials
    );

    backend.close(ALICE, &conn()).await.unwrap();
}

#[test]
fn test_invalid_documents_are_rejected() {
    assert!(matches!(
        DirectoryConfig::from_json_str("{ not json"),
        Err(Error::ConfigError(_))
    ));

    let duplicate_gid = r#"{
        "basedn": "dc=example,dc=org",
        "groups": [
            { "name": "a", "unixid": 1 },
            { "name": "b", "unixid": 1 }
        ]
    }"#;
    assert!(matches!(
        DirectoryConfig::from_json_str(duplicate_gid),
        Err(Error::ValidationError(_))
    ));
}
