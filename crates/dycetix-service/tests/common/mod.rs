//! Shared fixtures for service integration tests

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use dycetix_core::{AdminRole, AdminUser, NewAdminUser, PrivilegeFlags, RequestMeta};
use dycetix_service::{AdminDirectory, IntakeService, SubmissionPayload, TriageService};
use dycetix_store::{MemoryBlobStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub intake: IntakeService,
    pub triage: TriageService,
    pub directory: AdminDirectory,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::default());
    Harness {
        intake: IntakeService::new(store.clone(), blobs.clone()),
        triage: TriageService::new(store.clone(), store.clone()),
        directory: AdminDirectory::new(store.clone()),
        store,
        blobs,
    }
}

impl Harness {
    pub async fn staff(&self, email: &str) -> AdminUser {
        let draft = NewAdminUser::staff(email, AdminRole::Operations)
            .unwrap()
            .with_name("Sam", "Staff");
        self.directory.register(draft).await.unwrap()
    }

    pub async fn superuser(&self, email: &str) -> AdminUser {
        let draft = NewAdminUser::superuser(email, PrivilegeFlags::default())
            .unwrap()
            .with_name("Root", "Admin");
        self.directory.register(draft).await.unwrap()
    }

    pub async fn submit(&self, payload: SubmissionPayload, at: DateTime<Utc>) -> dycetix_core::ClientRequirement {
        self.intake
            .submit_at(payload, meta(), at)
            .await
            .unwrap()
            .requirement
    }
}

/// 2026-04-14 at the given hour, UTC
pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 14, hour, 0, 0).unwrap()
}

pub fn meta() -> RequestMeta {
    RequestMeta::new(Some("203.0.113.7".to_string()), Some("test-agent/1.0".to_string()))
}

pub fn payload() -> SubmissionPayload {
    SubmissionPayload {
        first_name: "  Ada ".to_string(),
        last_name: "Lovelace".to_string(),
        email: " Ada@Example.COM ".to_string(),
        phone: "+44 20 7946 0000".to_string(),
        company: "Analytical Engines".to_string(),
        services: vec!["software".to_string(), "design".to_string()],
        project_details: "  A difference engine control panel ".to_string(),
        ..SubmissionPayload::default()
    }
}

pub fn payload_for(first_name: &str, company: &str, description: &str) -> SubmissionPayload {
    SubmissionPayload {
        first_name: first_name.to_string(),
        company: company.to_string(),
        project_details: description.to_string(),
        ..payload()
    }
}

pub fn file(name: &str, content: &[u8]) -> Value {
    json!({
        "name": name,
        "data": STANDARD.encode(content),
        "size": content.len(),
        "type": "text/plain",
    })
}
