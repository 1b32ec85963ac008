//! Admin directory integration tests

mod common;

use chrono::Duration;
use common::{at, harness};
use dycetix_core::{AdminRole, IdentityError, NewAdminUser, PrivilegeFlags};
use dycetix_service::ServiceError;
use pretty_assertions::assert_eq;

/// Tenet: Emails are unique regardless of case
#[tokio::test]
async fn duplicate_email_conflicts() {
    let h = harness();
    h.staff("sam@example.com").await;
    let draft = NewAdminUser::staff("SAM@Example.com", AdminRole::Finance).unwrap();
    let err = h.directory.register(draft).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let found = h.directory.find_by_email(" Sam@EXAMPLE.com").await.unwrap();
    assert_eq!(found.map(|a| a.role), Some(AdminRole::Operations));
}

/// Tenet: Privileged accounts cannot be built with a privilege switched off
#[test]
fn superuser_flags_are_guarded() {
    let flags = PrivilegeFlags {
        is_staff: Some(false),
        is_superuser: None,
    };
    assert_eq!(
        NewAdminUser::superuser("root@example.com", flags).unwrap_err(),
        IdentityError::PrivilegeFlagDisabled { flag: "is_staff" }
    );
    assert!(NewAdminUser::superuser("", PrivilegeFlags::default()).is_err());
}

/// Tenet: Recorded creator is kept on the account
#[tokio::test]
async fn created_by_is_recorded() {
    let h = harness();
    let root = h.superuser("root@example.com").await;
    let draft = NewAdminUser::staff("new@example.com", AdminRole::Content)
        .unwrap()
        .created_by(root.id);
    let admin = h.directory.register(draft).await.unwrap();
    assert_eq!(admin.created_by, Some(root.id));
    assert_eq!(h.directory.list().await.unwrap().len(), 2);
}

/// Tenet: A session resolves to its admin until it expires
#[tokio::test]
async fn session_lifecycle() {
    let h = harness();
    let admin = h.staff("sam@example.com").await;
    let directory = h.directory.clone().with_session_ttl(Duration::hours(1));

    let session = directory
        .open_session_at(admin.id, Some("198.51.100.4".to_string()), at(8))
        .await
        .unwrap();
    assert_eq!(session.expires_at, at(9));

    let resolved = directory
        .authenticate_at(&session.session_key, at(8) + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(resolved.id, admin.id);
    assert_eq!(resolved.last_ip.as_deref(), Some("198.51.100.4"));
    assert_eq!(resolved.last_login, Some(at(8)));

    let err = directory
        .authenticate_at(&session.session_key, at(10))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    // expired sessions are dropped on sight
    assert!(!directory.revoke(&session.session_key).await.unwrap());
}

/// Tenet: Unknown keys, revoked sessions and disabled accounts are rejected
#[tokio::test]
async fn authentication_failures() {
    let h = harness();
    let admin = h.staff("sam@example.com").await;

    for key in ["", "   ", "no-such-session"] {
        assert!(matches!(
            h.directory.authenticate(key).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    let session = h.directory.open_session(admin.id, None).await.unwrap();
    assert!(h.directory.revoke(&session.session_key).await.unwrap());
    assert!(h.directory.authenticate(&session.session_key).await.is_err());

    let session = h.directory.open_session(admin.id, None).await.unwrap();
    h.directory.set_active(admin.id, false).await.unwrap();
    assert!(matches!(
        h.directory.authenticate(&session.session_key).await,
        Err(ServiceError::Unauthorized(_))
    ));
    assert!(matches!(
        h.directory.open_session(admin.id, None).await,
        Err(ServiceError::Forbidden(_))
    ));
}

/// Tenet: Purging removes exactly the expired sessions
#[tokio::test]
async fn purge_expired_sessions() {
    let h = harness();
    let admin = h.staff("sam@example.com").await;
    let directory = h.directory.clone().with_session_ttl(Duration::hours(1));
    directory.open_session_at(admin.id, None, at(1)).await.unwrap();
    let live = directory.open_session_at(admin.id, None, at(8)).await.unwrap();

    assert_eq!(directory.purge_expired(at(8)).await.unwrap(), 1);
    assert!(directory.authenticate_at(&live.session_key, at(8)).await.is_ok());
}
