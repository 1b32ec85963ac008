//! Form attachments
//!
//! Metadata for a file uploaded with a submission. The bytes themselves live
//! in a blob store; the row only keeps the storage key and public url.

use crate::checksum::BlobChecksum;
use crate::types::{AttachmentId, RequirementId};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Storage prefix for attachment blobs
pub const ATTACHMENT_PREFIX: &str = "form_attachments";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Persisted attachment row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAttachment {
    pub id: AttachmentId,
    /// Owning requirement (orphans are representable but not produced by intake)
    pub client_requirement: Option<RequirementId>,
    pub original_filename: String,
    pub storage_key: String,
    pub url: String,
    pub file_size: u64,
    pub mime_type: String,
    pub checksum: BlobChecksum,
    pub uploaded_by_ip: Option<String>,
    pub uploaded_by_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FormAttachment {
    /// Size in MB, rounded to two decimals
    #[must_use]
    pub fn file_size_mb(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let mb = self.file_size as f64 / BYTES_PER_MB;
        (mb * 100.0).round() / 100.0
    }
}

/// Attachment about to be persisted, after its blob has been written
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub client_requirement: Option<RequirementId>,
    pub original_filename: String,
    pub storage_key: String,
    pub url: String,
    /// Size the client declared, if any
    pub declared_size: Option<u64>,
    /// Size of the blob actually stored
    pub stored_size: u64,
    pub mime_type: String,
    pub checksum: BlobChecksum,
    pub uploaded_by_ip: Option<String>,
    pub uploaded_by_user_agent: Option<String>,
}

impl NewAttachment {
    /// Effective file size: the declared size, or the stored blob's size when unset
    #[inline]
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.declared_size
            .filter(|size| *size > 0)
            .unwrap_or(self.stored_size)
    }

    /// Materialize as a stored row
    #[must_use]
    pub fn into_record(self, id: AttachmentId, created_at: DateTime<Utc>) -> FormAttachment {
        let file_size = self.file_size();
        FormAttachment {
            id,
            client_requirement: self.client_requirement,
            original_filename: self.original_filename,
            storage_key: self.storage_key,
            url: self.url,
            file_size,
            mime_type: self.mime_type,
            checksum: self.checksum,
            uploaded_by_ip: self.uploaded_by_ip,
            uploaded_by_user_agent: self.uploaded_by_user_agent,
            created_at,
        }
    }
}

/// Strip directories and unsafe characters from a client-supplied filename
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Blob key for an attachment: `form_attachments/YYYY/MM/DD/<unique>_<filename>`
#[must_use]
pub fn attachment_storage_key(uploaded_at: DateTime<Utc>, unique: &str, filename: &str) -> String {
    format!(
        "{ATTACHMENT_PREFIX}/{:04}/{:02}/{:02}/{unique}_{}",
        uploaded_at.year(),
        uploaded_at.month(),
        uploaded_at.day(),
        sanitize_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_attachment(declared: Option<u64>) -> NewAttachment {
        NewAttachment {
            client_requirement: Some(RequirementId(1)),
            original_filename: "brief.pdf".to_string(),
            storage_key: "form_attachments/2026/01/02/x_brief.pdf".to_string(),
            url: "/media/form_attachments/2026/01/02/x_brief.pdf".to_string(),
            declared_size: declared,
            stored_size: 2048,
            mime_type: "application/pdf".to_string(),
            checksum: BlobChecksum::compute(b"brief"),
            uploaded_by_ip: None,
            uploaded_by_user_agent: None,
        }
    }

    #[test]
    fn file_size_falls_back_to_stored_size() {
        assert_eq!(new_attachment(None).file_size(), 2048);
        assert_eq!(new_attachment(Some(0)).file_size(), 2048);
        assert_eq!(new_attachment(Some(4096)).file_size(), 4096);
    }

    #[test]
    fn file_size_mb_rounds_to_two_decimals() {
        let mut record = new_attachment(Some(1_572_864)).into_record(AttachmentId(1), Utc::now());
        assert!((record.file_size_mb() - 1.5).abs() < f64::EPSILON);

        record.file_size = 1234;
        assert!((record.file_size_mb() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sanitize_strips_paths_and_symbols() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\My Brief (v2).pdf"), "My_Brief__v2_.pdf");
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn storage_key_is_dated() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(
            attachment_storage_key(at, "abc", "logo.png"),
            "form_attachments/2026/03/09/abc_logo.png"
        );
    }
}
