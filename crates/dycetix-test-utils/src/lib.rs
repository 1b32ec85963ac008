//! Testing utilities for the Dycetix workspace
//!
//! Submission payload builders, in-memory service wiring and admin fixtures.

#![allow(missing_docs)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dycetix_core::{AdminRole, AdminUser, NewAdminUser, PrivilegeFlags};
use dycetix_service::{AdminDirectory, IntakeService, TriageService};
use dycetix_store::{MemoryBlobStore, MemoryStore};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Base64 of `content`, as the public form sends file data
pub fn encode(content: &[u8]) -> String {
    STANDARD.encode(content)
}

/// One `files[]` entry
pub fn file_entry(name: &str, content: &[u8], mime_type: &str) -> Value {
    json!({
        "name": name,
        "data": encode(content),
        "size": content.len(),
        "type": mime_type,
    })
}

/// Builder for submission JSON bodies, valid by default
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    fields: Map<String, Value>,
    files: Vec<Value>,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        let mut fields = Map::new();
        fields.insert("firstName".into(), json!("Grace"));
        fields.insert("lastName".into(), json!("Hopper"));
        fields.insert("email".into(), json!("Grace.Hopper@Example.com"));
        fields.insert("phone".into(), json!("+1 555 0100"));
        fields.insert("company".into(), json!("Navy Labs"));
        fields.insert("services".into(), json!(["software"]));
        fields.insert("otherService".into(), json!(""));
        fields.insert("projectDetails".into(), json!("Compiler for business data processing"));
        fields.insert("source".into(), json!("website"));
        Self {
            fields,
            files: Vec::new(),
        }
    }
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set any top-level key
    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Drop a top-level key entirely
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    #[must_use]
    pub fn with_first_name(self, name: &str) -> Self {
        self.with("firstName", json!(name))
    }

    #[must_use]
    pub fn with_company(self, company: &str) -> Self {
        self.with("company", json!(company))
    }

    #[must_use]
    pub fn with_email(self, email: &str) -> Self {
        self.with("email", json!(email))
    }

    #[must_use]
    pub fn with_services(self, services: &[&str]) -> Self {
        self.with("services", json!(services))
    }

    #[must_use]
    pub fn with_other_service(self, other: &str) -> Self {
        self.with("otherService", json!(other))
    }

    #[must_use]
    pub fn with_project_details(self, details: &str) -> Self {
        self.with("projectDetails", json!(details))
    }

    /// Attach a text file
    #[must_use]
    pub fn with_file(mut self, name: &str, content: &[u8]) -> Self {
        self.files.push(file_entry(name, content, "text/plain"));
        self
    }

    /// Attach an arbitrary `files[]` entry
    #[must_use]
    pub fn with_raw_file(mut self, entry: Value) -> Self {
        self.files.push(entry);
        self
    }

    pub fn build(self) -> Value {
        let mut fields = self.fields;
        if !self.files.is_empty() {
            fields.insert("files".into(), Value::Array(self.files));
        }
        Value::Object(fields)
    }

    pub fn to_bytes(self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).unwrap()
    }
}

/// Services wired over one in-memory store
pub struct TestServices {
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub intake: IntakeService,
    pub triage: TriageService,
    pub directory: AdminDirectory,
}

pub fn setup_services() -> TestServices {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::default());
    TestServices {
        intake: IntakeService::new(store.clone(), blobs.clone()),
        triage: TriageService::new(store.clone(), store.clone()),
        directory: AdminDirectory::new(store.clone()),
        store,
        blobs,
    }
}

/// Registered admin plus a live session key
pub struct SeededAdmin {
    pub admin: AdminUser,
    pub token: String,
}

impl SeededAdmin {
    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Register an operations admin and open a session for it
pub async fn seed_staff(directory: &AdminDirectory, email: &str) -> SeededAdmin {
    let draft = NewAdminUser::staff(email, AdminRole::Operations)
        .unwrap()
        .with_name("Staff", "Member");
    seed(directory, draft).await
}

/// Register a superuser and open a session for it
pub async fn seed_superuser(directory: &AdminDirectory, email: &str) -> SeededAdmin {
    let draft = NewAdminUser::superuser(email, PrivilegeFlags::default())
        .unwrap()
        .with_name("Super", "User");
    seed(directory, draft).await
}

async fn seed(directory: &AdminDirectory, draft: NewAdminUser) -> SeededAdmin {
    let admin = directory.register(draft).await.unwrap();
    let session = directory.open_session(admin.id, None).await.unwrap();
    SeededAdmin {
        admin,
        token: session.session_key,
    }
}
