//! Intake integration tests
//!
//! Drives `IntakeService` against the in-memory stores and checks what
//! ends up persisted.

mod common;

use async_trait::async_trait;
use common::{at, file, harness, meta, payload};
use dycetix_core::{Actor, AdminUserId, BlobChecksum, PageRequest, RequirementFilter};
use dycetix_service::{
    AttachmentError, AttachmentOutcome, IntakeLimits, IntakeService, ServiceError,
    SubmissionPayload,
};
use dycetix_store::{BlobStore, MemoryStore, RequirementStore, StoreError, StoredBlob};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

mockall::mock! {
    pub Blobs {}

    #[async_trait]
    impl BlobStore for Blobs {
        async fn put(&self, key: &str, data: &[u8]) -> Result<StoredBlob, StoreError>;
        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
        async fn delete(&self, key: &str) -> Result<(), StoreError>;
        async fn exists(&self, key: &str) -> Result<bool, StoreError>;
        fn url_for(&self, key: &str) -> String;
    }
}

async fn persisted(store: &MemoryStore) -> u64 {
    store
        .list_requirements(&RequirementFilter::new(), PageRequest::default())
        .await
        .unwrap()
        .total
}

/// Tenet: A corrupt file is skipped; its siblings and the parent survive
#[tokio::test]
async fn corrupt_second_file_is_skipped() {
    let h = harness();
    let mut body = payload();
    body.files = vec![
        file("brief.txt", b"first"),
        json!({"name": "broken.pdf", "data": "%%%not-base64%%%", "size": 12, "type": "application/pdf"}),
        file("notes.txt", b"third"),
    ];

    let receipt = h.intake.submit_at(body, meta(), at(9)).await.unwrap();

    assert_eq!(receipt.attachments_count(), 2);
    assert_eq!(receipt.attachments.len(), 3);
    assert!(matches!(
        &receipt.attachments[1],
        AttachmentOutcome::Failed { filename, error: AttachmentError::InvalidBase64(_) }
            if filename == "broken.pdf"
    ));
    assert_eq!(persisted(&h.store).await, 1);

    let stored = h.store.attachments_for(receipt.submission_id()).await.unwrap();
    let names: Vec<_> = stored.iter().map(|a| a.original_filename.as_str()).collect();
    assert_eq!(names, vec!["brief.txt", "notes.txt"]);
    assert_eq!(h.blobs.len(), 2);
}

/// Tenet: Stored attachments carry key, checksum, size and request metadata
#[tokio::test]
async fn stored_attachment_records_blob_details() {
    let h = harness();
    let mut body = payload();
    body.files = vec![json!({
        "name": "../../etc/spec sheet.txt",
        "data": "data:text/plain;base64,aGVsbG8gd29ybGQ=",
    })];

    let receipt = h.intake.submit_at(body, meta(), at(9)).await.unwrap();
    let AttachmentOutcome::Stored(attachment) = &receipt.attachments[0] else {
        panic!("attachment was not stored: {:?}", receipt.attachments[0]);
    };

    assert!(attachment
        .storage_key
        .starts_with("form_attachments/2026/04/14/"));
    assert!(attachment.storage_key.ends_with("_spec_sheet.txt"));
    assert_eq!(attachment.url, format!("/media/{}", attachment.storage_key));
    assert_eq!(attachment.file_size, 11);
    assert_eq!(attachment.mime_type, "application/octet-stream");
    assert_eq!(attachment.checksum, BlobChecksum::compute(b"hello world"));
    assert_eq!(attachment.uploaded_by_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(
        h.blobs.get(&attachment.storage_key).await.unwrap(),
        b"hello world".to_vec()
    );
}

/// Tenet: Missing required fields reject the submission and persist nothing
#[tokio::test]
async fn missing_fields_are_named() {
    let h = harness();
    let cases: Vec<(&str, SubmissionPayload)> = vec![
        ("first_name", SubmissionPayload { first_name: "  ".into(), ..payload() }),
        ("last_name", SubmissionPayload { last_name: String::new(), ..payload() }),
        ("email", SubmissionPayload { email: String::new(), ..payload() }),
        ("project_description", SubmissionPayload { project_details: "\n".into(), ..payload() }),
        ("services", SubmissionPayload { services: vec![], ..payload() }),
    ];

    for (field, body) in cases {
        let err = h.intake.submit_at(body, meta(), at(9)).await.unwrap_err();
        match err {
            ServiceError::Validation(validation) => assert_eq!(validation.field(), field),
            other => panic!("expected validation error for {field}, got {other:?}"),
        }
    }
    assert_eq!(persisted(&h.store).await, 0);
}

/// Tenet: Selecting "other" requires describing it
#[tokio::test]
async fn other_service_requires_description() {
    let h = harness();
    let body = SubmissionPayload {
        services: vec!["other".to_string()],
        other_service: "   ".to_string(),
        ..payload()
    };
    let err = h.intake.submit_at(body, meta(), at(9)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(v) if v.field() == "other_service"));
}

/// Tenet: Files beyond the per-submission cap fail individually
#[tokio::test]
async fn files_beyond_cap_are_rejected_individually() {
    let h = harness();
    let intake = h
        .intake
        .clone()
        .with_limits(IntakeLimits::default().with_max_files(3).with_max_file_bytes(8));
    let mut body = payload();
    body.files = vec![
        file("a.txt", b"a"),
        file("big.txt", b"way more than eight bytes"),
        file("b.txt", b"b"),
        file("c.txt", b"c"),
    ];

    let receipt = intake.submit_at(body, meta(), at(9)).await.unwrap();

    assert_eq!(receipt.attachments_count(), 2);
    assert!(matches!(
        receipt.attachments[1],
        AttachmentOutcome::Failed { error: AttachmentError::TooLarge { size: 25, limit: 8 }, .. }
    ));
    assert!(receipt.attachments[2].is_stored());
    assert!(matches!(
        receipt.attachments[3],
        AttachmentOutcome::Failed { error: AttachmentError::TooManyFiles { limit: 3 }, .. }
    ));
}

/// Tenet: A failing blob store never fails the submission
#[tokio::test]
async fn blob_failures_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let mut blobs = MockBlobs::new();
    blobs
        .expect_put()
        .times(2)
        .returning(|_, _| Err(StoreError::Backend("disk full".to_string())));
    let intake = IntakeService::new(store.clone(), Arc::new(blobs));

    let mut body = payload();
    body.files = vec![file("a.txt", b"a"), file("b.txt", b"b")];
    let receipt = intake.submit_at(body, meta(), at(9)).await.unwrap();

    assert_eq!(receipt.attachments_count(), 0);
    assert!(receipt
        .attachments
        .iter()
        .all(|o| matches!(o, AttachmentOutcome::Failed { error: AttachmentError::Store(_), .. })));
    assert_eq!(persisted(&store).await, 1);
}

/// Tenet: Intake normalizes, detail reports back what intake stored
#[tokio::test]
async fn intake_then_detail_round_trips() {
    let h = harness();
    let mut body = payload();
    body.budget_range = Some(" 10k-25k ".to_string());
    body.files = vec![file("brief.txt", b"brief")];
    let receipt = h.intake.submit_at(body, meta(), at(9)).await.unwrap();

    let detail = h
        .triage
        .detail(&Actor::superuser(AdminUserId(99)), receipt.submission_id())
        .await
        .unwrap();
    let record = &detail.requirement;

    assert_eq!(record.first_name, "Ada");
    assert_eq!(record.last_name, "Lovelace");
    assert_eq!(record.email, "ada@example.com");
    assert_eq!(record.phone.as_deref(), Some("+44 20 7946 0000"));
    assert_eq!(record.company.as_deref(), Some("Analytical Engines"));
    assert_eq!(record.project_description, "A difference engine control panel");
    assert_eq!(record.budget_range.as_deref(), Some("10k-25k"));
    assert_eq!(record.source.as_deref(), Some("website"));
    assert_eq!(record.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(record.created_at, at(9));
    assert_eq!(detail.selected_services, "Software Development, Design");
    assert_eq!(detail.attachments_count, 1);
    assert_eq!(detail.attachments[0].filename, "brief.txt");
    assert_eq!(receipt.submission_date(), at(9));
}
