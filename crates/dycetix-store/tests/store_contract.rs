//! Behavioural contract shared by every requirement/admin backend.
//!
//! Each scenario runs against the in-memory store and against a SQLite file
//! in a temporary directory. Both backends must agree on:
//! - newest-first ordering and pagination totals
//! - the filter and row-level visibility semantics of `RequirementFilter`
//! - live stats with zero buckets
//! - cascade deletion of attachments
//! - unique, case-insensitive admin emails

use chrono::{DateTime, Duration, TimeZone, Utc};
use dycetix_core::{
    AdminRole, AdminSession, AdminUserId, BlobChecksum, NewAdminUser, NewAttachment,
    NewRequirement, PageRequest, PrivilegeFlags, RequestMeta, RequirementFilter, RequirementForm,
    RequirementId, RequirementStatus, ServiceType, Visibility,
};
use dycetix_store::{AdminStore, MemoryStore, RequirementStore, SqliteStore, StoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

trait Backend: RequirementStore + AdminStore {}
impl<T: RequirementStore + AdminStore> Backend for T {}

/// Both backends, the SQLite one kept alive by its temp dir
fn backends() -> Vec<(&'static str, Box<dyn Backend>, Option<TempDir>)> {
    let dir = tempfile::tempdir().expect("temp dir");
    let memory: Box<dyn Backend> = Box::new(MemoryStore::new());
    let sqlite: Box<dyn Backend> =
        Box::new(SqliteStore::open(dir.path().join("contract.db")).expect("open sqlite"));
    vec![("memory", memory, None), ("sqlite", sqlite, Some(dir))]
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 14, 10, 30, 0).unwrap()
}

fn draft(first: &str, company: &str, services: &[&str]) -> NewRequirement {
    let form = RequirementForm {
        first_name: first.to_string(),
        last_name: "Okafor".to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        company: company.to_string(),
        services: services.iter().map(ToString::to_string).collect(),
        other_service: "Kiosk".to_string(),
        project_description: "Replace the booking system".to_string(),
        ..RequirementForm::default()
    };
    NewRequirement::validate(form, RequestMeta::new(Some("10.0.0.1".into()), None))
        .expect("valid draft")
}

fn attachment(owner: RequirementId, name: &str) -> NewAttachment {
    NewAttachment {
        client_requirement: Some(owner),
        original_filename: name.to_string(),
        storage_key: format!("form_attachments/2026/04/14/u_{name}"),
        url: format!("/media/form_attachments/2026/04/14/u_{name}"),
        declared_size: None,
        stored_size: 11,
        mime_type: "text/plain".to_string(),
        checksum: BlobChecksum::compute(name.as_bytes()),
        uploaded_by_ip: Some("10.0.0.1".to_string()),
        uploaded_by_user_agent: None,
    }
}

/// Tenet: inserted rows read back unchanged, with triage defaults.
#[tokio::test]
async fn insert_and_get_round_trip() {
    for (name, store, _guard) in backends() {
        let created = store
            .insert_requirement(draft("Ngozi", "Acme", &["software", "it"]), base_time())
            .await
            .unwrap();
        let fetched = store.get_requirement(created.id).await.unwrap();

        assert_eq!(fetched.as_ref(), Some(&created), "{name}");
        let fetched = fetched.unwrap();
        assert_eq!(fetched.status, RequirementStatus::New, "{name}");
        assert!(fetched.requests(ServiceType::ItSupport), "{name}");
        assert_eq!(fetched.ip_address.as_deref(), Some("10.0.0.1"), "{name}");
        assert!(store.get_requirement(RequirementId(999)).await.unwrap().is_none());
    }
}

/// Tenet: listing is newest first and the total ignores pagination.
#[tokio::test]
async fn list_is_newest_first_with_total() {
    for (name, store, _guard) in backends() {
        for (i, first) in ["Ada", "Bea", "Cal", "Dee"].iter().enumerate() {
            let at = base_time() + Duration::minutes(i as i64);
            store
                .insert_requirement(draft(first, "", &["design"]), at)
                .await
                .unwrap();
        }

        let page = store
            .list_requirements(&RequirementFilter::new(), PageRequest::new(Some(2), Some(1)))
            .await
            .unwrap();

        assert_eq!(page.total, 4, "{name}");
        let names: Vec<_> = page.items.iter().map(|r| r.first_name.as_str()).collect();
        assert_eq!(names, vec!["Cal", "Bea"], "{name}");
    }
}

/// Tenet: filters combine with AND and search is case-insensitive over
/// name, email, company and description.
#[tokio::test]
async fn filters_and_search_agree_across_backends() {
    for (name, store, _guard) in backends() {
        let acme = store
            .insert_requirement(draft("Ada", "ACME Ltd", &["software"]), base_time())
            .await
            .unwrap();
        store
            .insert_requirement(draft("Bea", "Globex", &["design", "other"]), base_time())
            .await
            .unwrap();

        let search = RequirementFilter::new().with_search("acme");
        let page = store
            .list_requirements(&search, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1, "{name}");
        assert_eq!(page.items[0].id, acme.id, "{name}");

        let by_service = RequirementFilter::new().with_service(ServiceType::Other);
        let page = store
            .list_requirements(&by_service, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items[0].first_name, "Bea", "{name}");

        let none = RequirementFilter::new()
            .with_service(ServiceType::Software)
            .with_status(RequirementStatus::Quoted);
        let page = store
            .list_requirements(&none, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0, "{name}");
    }
}

/// Tenet: search folds non-ASCII letters the same way on every backend.
#[tokio::test]
async fn search_folds_unicode_case() {
    for (name, store, _guard) in backends() {
        let emile = store
            .insert_requirement(draft("Émile", "Société Öresund", &["software"]), base_time())
            .await
            .unwrap();
        store
            .insert_requirement(draft("Emil", "Globex", &["design"]), base_time())
            .await
            .unwrap();

        for term in ["émile", "ÉMILE", "société", "ÖRESUND"] {
            let filter = RequirementFilter::new().with_search(term);
            let page = store
                .list_requirements(&filter, PageRequest::default())
                .await
                .unwrap();
            assert_eq!(page.total, 1, "{name}: {term}");
            assert_eq!(page.items[0].id, emile.id, "{name}: {term}");
        }
    }
}

/// Tenet: a restricted caller never receives a row owned by someone else.
#[tokio::test]
async fn visibility_hides_foreign_assignments() {
    for (name, store, _guard) in backends() {
        let owner = store
            .insert_admin(
                NewAdminUser::staff("owner@example.com", AdminRole::Operations).unwrap(),
                base_time(),
            )
            .await
            .unwrap();
        let other = store
            .insert_admin(
                NewAdminUser::staff("other@example.com", AdminRole::Operations).unwrap(),
                base_time(),
            )
            .await
            .unwrap();

        let mut mine = store
            .insert_requirement(draft("Ada", "", &["software"]), base_time())
            .await
            .unwrap();
        mine.assigned_to = Some(owner.id);
        store.save_requirement(&mine).await.unwrap();
        let mut theirs = store
            .insert_requirement(draft("Bea", "", &["software"]), base_time())
            .await
            .unwrap();
        theirs.assigned_to = Some(other.id);
        store.save_requirement(&theirs).await.unwrap();
        store
            .insert_requirement(draft("Cal", "", &["software"]), base_time())
            .await
            .unwrap();

        let filter = RequirementFilter::new().with_visibility(Visibility::OwnOrUnassigned(owner.id));
        let page = store
            .list_requirements(&filter, PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 2, "{name}");
        assert!(
            page.items.iter().all(|r| r.assigned_to != Some(other.id)),
            "{name}"
        );

        let recent = store
            .recent_requirements(
                base_time() - Duration::days(7),
                10,
                Visibility::OwnOrUnassigned(owner.id),
            )
            .await
            .unwrap();
        assert_eq!(recent.len(), 2, "{name}");
    }
}

/// Tenet: recent only returns rows created at or after the cutoff, capped.
#[tokio::test]
async fn recent_respects_cutoff_and_limit() {
    for (name, store, _guard) in backends() {
        store
            .insert_requirement(draft("Old", "", &["design"]), base_time() - Duration::days(8))
            .await
            .unwrap();
        for i in 0..3 {
            store
                .insert_requirement(
                    draft("New", "", &["design"]),
                    base_time() + Duration::seconds(i),
                )
                .await
                .unwrap();
        }

        let recent = store
            .recent_requirements(base_time() - Duration::days(7), 2, Visibility::Unrestricted)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2, "{name}");
        assert!(recent[0].created_at > recent[1].created_at, "{name}");
        assert!(recent.iter().all(|r| r.first_name == "New"), "{name}");
    }
}

/// Tenet: stats are computed live and list every status and service.
#[tokio::test]
async fn stats_count_every_bucket() {
    for (name, store, _guard) in backends() {
        store
            .insert_requirement(draft("Ada", "", &["software", "design"]), base_time())
            .await
            .unwrap();
        let mut quoted = store
            .insert_requirement(
                draft("Bea", "", &["design"]),
                base_time() - Duration::days(2),
            )
            .await
            .unwrap();
        quoted.status = RequirementStatus::Quoted;
        store.save_requirement(&quoted).await.unwrap();

        let stats = store.stats(base_time().date_naive()).await.unwrap();

        assert_eq!(stats.total, 2, "{name}");
        assert_eq!(stats.today_count, 1, "{name}");
        assert_eq!(stats.unassigned_count, 1, "{name}");
        assert_eq!(stats.status(RequirementStatus::Quoted), 1, "{name}");
        assert_eq!(stats.status(RequirementStatus::Archived), 0, "{name}");
        assert_eq!(stats.service(ServiceType::Design), 2, "{name}");
        assert_eq!(stats.service_counts.len(), ServiceType::ALL.len(), "{name}");
    }
}

/// Tenet: saving a vanished row is reported, not silently ignored.
#[tokio::test]
async fn save_missing_requirement_is_not_found() {
    for (name, store, _guard) in backends() {
        let mut record = store
            .insert_requirement(draft("Ada", "", &["software"]), base_time())
            .await
            .unwrap();
        assert!(store.delete_requirement(record.id).await.unwrap(), "{name}");
        record.status = RequirementStatus::Contacted;

        let err = store.save_requirement(&record).await.unwrap_err();
        assert!(err.is_not_found(), "{name}: {err}");
    }
}

/// Tenet: deleting a requirement cascades to its attachment rows.
#[tokio::test]
async fn delete_cascades_to_attachments() {
    for (name, store, _guard) in backends() {
        let owner = store
            .insert_requirement(draft("Ada", "", &["photography"]), base_time())
            .await
            .unwrap();
        let stored = store
            .insert_attachment(attachment(owner.id, "brief.txt"), base_time())
            .await
            .unwrap();
        store
            .insert_attachment(attachment(owner.id, "moodboard.txt"), base_time())
            .await
            .unwrap();

        let listed = store.attachments_for(owner.id).await.unwrap();
        assert_eq!(listed.len(), 2, "{name}");
        assert_eq!(listed[0], stored, "{name}");
        assert_eq!(listed[0].file_size, 11, "{name}");

        let counts = store
            .attachment_counts(&[owner.id, RequirementId(500)])
            .await
            .unwrap();
        assert_eq!(counts.get(&owner.id), Some(&2), "{name}");
        assert!(!counts.contains_key(&RequirementId(500)), "{name}");

        assert!(store.delete_requirement(owner.id).await.unwrap(), "{name}");
        assert!(store.attachments_for(owner.id).await.unwrap().is_empty(), "{name}");
        assert!(!store.delete_requirement(owner.id).await.unwrap(), "{name}");
    }
}

/// Tenet: attachments cannot point at a requirement that does not exist.
#[tokio::test]
async fn attachment_requires_existing_owner() {
    for (name, store, _guard) in backends() {
        let err = store
            .insert_attachment(attachment(RequirementId(77), "x.txt"), base_time())
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{name}: {err}");
    }
}

/// Tenet: admin emails are unique and looked up case-insensitively.
#[tokio::test]
async fn admin_email_is_unique() {
    for (name, store, _guard) in backends() {
        let root = store
            .insert_admin(
                NewAdminUser::superuser("Root@Example.com", PrivilegeFlags::default()).unwrap(),
                base_time(),
            )
            .await
            .unwrap();
        assert_eq!(root.email, "root@example.com", "{name}");

        let dup = NewAdminUser::staff("ROOT@example.com", AdminRole::Finance).unwrap();
        let err = store.insert_admin(dup, base_time()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "{name}: {err}");

        let found = store.find_admin_by_email(" root@EXAMPLE.com ").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(root.id), "{name}");

        let staff = NewAdminUser::staff("ops@example.com", AdminRole::Operations)
            .unwrap()
            .with_name("Tomas", "Berg")
            .created_by(root.id);
        let staff = store.insert_admin(staff, base_time()).await.unwrap();
        assert_eq!(staff.created_by, Some(root.id), "{name}");
        assert_eq!(store.list_admins().await.unwrap().len(), 2, "{name}");
    }
}

/// Tenet: login bookkeeping and deactivation persist.
#[tokio::test]
async fn login_and_activation_are_recorded() {
    for (name, store, _guard) in backends() {
        let admin = store
            .insert_admin(
                NewAdminUser::staff("ops@example.com", AdminRole::Content).unwrap(),
                base_time(),
            )
            .await
            .unwrap();
        let at = base_time() + Duration::hours(1);
        store
            .record_login(admin.id, Some("192.0.2.7".to_string()), at)
            .await
            .unwrap();
        store.set_active(admin.id, false, at).await.unwrap();

        let reloaded = store.get_admin(admin.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_login, Some(at), "{name}");
        assert_eq!(reloaded.last_ip.as_deref(), Some("192.0.2.7"), "{name}");
        assert!(!reloaded.is_active, "{name}");

        let err = store
            .record_login(AdminUserId(404), None, at)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{name}");
    }
}

/// Tenet: sessions can be issued, found, revoked and purged once expired.
#[tokio::test]
async fn session_lifecycle() {
    for (name, store, _guard) in backends() {
        let admin = store
            .insert_admin(
                NewAdminUser::staff("ops@example.com", AdminRole::Operations).unwrap(),
                base_time(),
            )
            .await
            .unwrap();
        let live = AdminSession {
            session_key: "live".to_string(),
            user_id: admin.id,
            created_at: base_time(),
            expires_at: base_time() + Duration::hours(12),
        };
        let stale = AdminSession {
            session_key: "stale".to_string(),
            expires_at: base_time() - Duration::hours(1),
            ..live.clone()
        };
        store.insert_session(&live).await.unwrap();
        store.insert_session(&stale).await.unwrap();
        assert!(store.insert_session(&live).await.unwrap_err().is_conflict(), "{name}");

        assert_eq!(store.find_session("live").await.unwrap(), Some(live), "{name}");
        assert_eq!(store.purge_expired_sessions(base_time()).await.unwrap(), 1, "{name}");
        assert!(store.find_session("stale").await.unwrap().is_none(), "{name}");
        assert!(store.delete_session("live").await.unwrap(), "{name}");
        assert!(!store.delete_session("live").await.unwrap(), "{name}");
    }
}

/// Tenet: the health probe answers on a fresh store.
#[tokio::test]
async fn ping_succeeds() {
    for (name, store, _guard) in backends() {
        assert!(store.ping().await.is_ok(), "{name}");
    }
}
