//! Submission intake
//!
//! Turns a public form submission into one persisted [`ClientRequirement`]
//! plus zero or more [`FormAttachment`]s. Validation failures reject the
//! whole submission. File failures do not: each file yields an
//! [`AttachmentOutcome`] and the parent row stays persisted regardless.

use crate::error::{AttachmentError, ServiceError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dycetix_core::{
    attachment_storage_key, BlobChecksum, ClientRequirement, FormAttachment, NewAttachment,
    NewRequirement, RequestMeta, RequirementForm, RequirementId,
};
use dycetix_store::{BlobStore, RequirementStore};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

/// Mime type recorded when the client declares none
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Default cap on files per submission
pub const DEFAULT_MAX_FILES: usize = 5;

/// Default cap on decoded bytes per file (25 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;

/// Inbound submission body, keyed the way the public form posts it
///
/// Missing and `null` values both read as empty, so the validator reports
/// them as missing fields rather than as malformed JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionPayload {
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(deserialize_with = "null_as_default")]
    pub services: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub other_service: String,
    #[serde(deserialize_with = "null_as_default")]
    pub project_details: String,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
    pub source: Option<String>,
    /// Raw file entries; each one is parsed on its own so a bad entry only
    /// fails that file
    #[serde(deserialize_with = "null_as_default")]
    pub files: Vec<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl SubmissionPayload {
    /// Parse a raw JSON body
    ///
    /// # Errors
    /// `MalformedPayload` when the body is not JSON or has the wrong shape.
    pub fn from_slice(body: &[u8]) -> Result<Self, ServiceError> {
        serde_json::from_slice(body).map_err(|err| ServiceError::MalformedPayload(err.to_string()))
    }

    /// Split into the validated-form input and the file entries
    #[must_use]
    pub fn into_parts(self) -> (RequirementForm, Vec<Value>) {
        let form = RequirementForm {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            services: self.services,
            other_service: self.other_service,
            project_description: self.project_details,
            budget_range: self.budget_range,
            timeline: self.timeline,
            source: self.source,
        };
        (form, self.files)
    }
}

/// One inline file: name, base64 content, declared size and type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilePayload {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data: String,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
}

impl FilePayload {
    /// Parse one entry of the `files` array
    ///
    /// # Errors
    /// `Malformed` when the entry is not an object of the expected shape.
    pub fn from_value(value: Value) -> Result<Self, AttachmentError> {
        serde_json::from_value(value).map_err(|err| AttachmentError::Malformed(err.to_string()))
    }

    /// Decode the content, accepting an optional `data:...;base64,` prefix
    ///
    /// # Errors
    /// `InvalidBase64` when the content does not decode.
    pub fn decode(&self) -> Result<Vec<u8>, AttachmentError> {
        let encoded = match self.data.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(STANDARD.decode(compact)?)
    }
}

/// Server-side caps on inline files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl IntakeLimits {
    /// Override the file count cap
    #[inline]
    #[must_use]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Override the per-file byte cap
    #[inline]
    #[must_use]
    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }
}

/// Result of processing one file entry
#[derive(Debug)]
pub enum AttachmentOutcome {
    /// Blob written and row persisted
    Stored(FormAttachment),
    /// Skipped; the submission went on without it
    Failed {
        filename: String,
        error: AttachmentError,
    },
}

impl AttachmentOutcome {
    /// Check if the file was stored
    #[inline]
    #[must_use]
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// What a successful submission produced
#[derive(Debug)]
pub struct SubmissionReceipt {
    pub requirement: ClientRequirement,
    /// One outcome per file entry, in request order
    pub attachments: Vec<AttachmentOutcome>,
}

impl SubmissionReceipt {
    /// Id of the created requirement
    #[inline]
    #[must_use]
    pub fn submission_id(&self) -> RequirementId {
        self.requirement.id
    }

    /// Number of attachments actually stored
    #[must_use]
    pub fn attachments_count(&self) -> usize {
        self.attachments.iter().filter(|o| o.is_stored()).count()
    }

    /// Creation timestamp
    #[inline]
    #[must_use]
    pub fn submission_date(&self) -> DateTime<Utc> {
        self.requirement.created_at
    }
}

/// Submission Intake Service
#[derive(Clone)]
pub struct IntakeService {
    requirements: Arc<dyn RequirementStore>,
    blobs: Arc<dyn BlobStore>,
    limits: IntakeLimits,
}

impl std::fmt::Debug for IntakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeService")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl IntakeService {
    /// Create a service with default limits
    #[must_use]
    pub fn new(requirements: Arc<dyn RequirementStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            requirements,
            blobs,
            limits: IntakeLimits::default(),
        }
    }

    /// With custom limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: IntakeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Active limits
    #[inline]
    #[must_use]
    pub fn limits(&self) -> IntakeLimits {
        self.limits
    }

    /// Validate and persist a submission, stamped with the current time
    ///
    /// # Errors
    /// See [`IntakeService::submit_at`].
    pub async fn submit(
        &self,
        payload: SubmissionPayload,
        meta: RequestMeta,
    ) -> Result<SubmissionReceipt, ServiceError> {
        self.submit_at(payload, meta, Utc::now()).await
    }

    /// Validate and persist a submission at `now`
    ///
    /// # Workflow
    /// 1. Validate the form (nothing is written if this fails)
    /// 2. Persist the requirement
    /// 3. Store each file; failures are recorded per file and skipped
    ///
    /// # Errors
    /// - `Validation` naming the first offending field
    /// - `Persistence` when the requirement row cannot be written
    pub async fn submit_at(
        &self,
        payload: SubmissionPayload,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, ServiceError> {
        let (form, files) = payload.into_parts();
        let draft = NewRequirement::validate(form, meta.clone())?;
        let requirement = self.requirements.insert_requirement(draft, now).await?;
        tracing::info!(
            requirement_id = %requirement.id,
            files = files.len(),
            "Client requirement submitted"
        );

        let mut attachments = Vec::with_capacity(files.len());
        for (index, raw) in files.into_iter().enumerate() {
            let filename = raw
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let result = if index >= self.limits.max_files {
                Err(AttachmentError::TooManyFiles {
                    limit: self.limits.max_files,
                })
            } else {
                self.store_file(requirement.id, raw, &meta, now).await
            };
            match result {
                Ok(stored) => attachments.push(AttachmentOutcome::Stored(stored)),
                Err(error) => {
                    tracing::warn!(
                        requirement_id = %requirement.id,
                        file = %filename,
                        "Skipping attachment: {}",
                        error
                    );
                    attachments.push(AttachmentOutcome::Failed { filename, error });
                }
            }
        }

        let receipt = SubmissionReceipt {
            requirement,
            attachments,
        };
        tracing::debug!(
            requirement_id = %receipt.submission_id(),
            attachments = receipt.attachments_count(),
            "Attachments processed"
        );
        Ok(receipt)
    }

    async fn store_file(
        &self,
        owner: RequirementId,
        raw: Value,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Result<FormAttachment, AttachmentError> {
        let file = FilePayload::from_value(raw)?;
        let original_filename = file.name.trim().to_string();
        if original_filename.is_empty() {
            return Err(AttachmentError::EmptyName);
        }

        let bytes = file.decode()?;
        let size = bytes.len() as u64;
        if size > self.limits.max_file_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                limit: self.limits.max_file_bytes,
            });
        }

        let unique = uuid::Uuid::new_v4().simple().to_string();
        let key = attachment_storage_key(now, &unique, &original_filename);
        let blob = self.blobs.put(&key, &bytes).await?;

        let draft = NewAttachment {
            client_requirement: Some(owner),
            original_filename,
            storage_key: blob.key.clone(),
            url: blob.url,
            declared_size: file.size,
            stored_size: blob.size,
            mime_type: file
                .mime_type
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            checksum: BlobChecksum::compute(&bytes),
            uploaded_by_ip: meta.ip_address.clone(),
            uploaded_by_user_agent: meta.user_agent.clone(),
        };

        match self.requirements.insert_attachment(draft, now).await {
            Ok(stored) => Ok(stored),
            Err(err) => {
                if let Err(cleanup) = self.blobs.delete(&blob.key).await {
                    tracing::warn!(key = %blob.key, "Orphaned blob left behind: {}", cleanup);
                }
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn payload_reads_camel_case_and_nulls() {
        let body = json!({
            "firstName": "Ada",
            "lastName": null,
            "email": "ada@example.com",
            "services": ["software"],
            "projectDetails": "A compiler",
            "files": null
        });
        let payload: SubmissionPayload = serde_json::from_value(body).unwrap();
        assert_eq!(payload.first_name, "Ada");
        assert_eq!(payload.last_name, "");
        assert_eq!(payload.project_details, "A compiler");
        assert!(payload.files.is_empty());
    }

    #[test]
    fn payload_rejects_non_json() {
        let err = SubmissionPayload::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, ServiceError::MalformedPayload(_)));
    }

    #[test]
    fn decode_strips_data_url_prefix_and_whitespace() {
        let file = FilePayload {
            name: "a.txt".to_string(),
            data: "data:text/plain;base64,aGVs\nbG8=".to_string(),
            ..FilePayload::default()
        };
        assert_eq!(file.decode().unwrap(), b"hello");
    }

    #[test]
    fn decode_rejects_corrupt_content() {
        let file = FilePayload {
            name: "a.txt".to_string(),
            data: "%%% not base64 %%%".to_string(),
            ..FilePayload::default()
        };
        assert!(matches!(
            file.decode(),
            Err(AttachmentError::InvalidBase64(_))
        ));
    }

    #[test]
    fn file_entry_must_be_an_object() {
        let err = FilePayload::from_value(json!("just a string")).unwrap_err();
        assert!(matches!(err, AttachmentError::Malformed(_)));
    }

    #[test]
    fn limits_builders() {
        let limits = IntakeLimits::default()
            .with_max_files(2)
            .with_max_file_bytes(10);
        assert_eq!(limits.max_files, 2);
        assert_eq!(limits.max_file_bytes, 10);
        assert_eq!(IntakeLimits::default().max_files, DEFAULT_MAX_FILES);
    }
}
