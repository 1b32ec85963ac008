//! Triage updates
//!
//! A [`TriagePatch`] is a partial update restricted to the triage fields.
//! Unknown keys in the inbound JSON are ignored. Applying a patch always
//! stamps `updated_at`, and moving a row to `contacted` while nobody owns it
//! assigns it to the acting admin.

use crate::error::ValidationError;
use crate::identity::Actor;
use crate::requirement::{non_blank, ClientRequirement};
use crate::types::{AdminUserId, Priority, RequirementStatus};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Keys a patch may carry; everything else is ignored
pub const PATCHABLE_FIELDS: [&str; 5] = [
    "status",
    "priority",
    "assigned_to_id",
    "internal_notes",
    "admin_response",
];

/// Requested change of assignee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeChange {
    /// Clear the assignee
    Unassign,
    /// Assign to this admin
    AssignTo(AdminUserId),
}

/// Partial triage update
///
/// `None` means "leave untouched". For the text fields, `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriagePatch {
    pub status: Option<RequirementStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<AssigneeChange>,
    pub internal_notes: Option<Option<String>>,
    pub admin_response: Option<Option<String>>,
}

impl TriagePatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON object
    ///
    /// # Errors
    /// - `Malformed` when the body is not an object
    /// - `InvalidChoice` when a known key carries an unusable value
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or_else(|| ValidationError::Malformed {
            reason: "expected a JSON object".to_string(),
        })?;

        let mut patch = Self::default();
        if let Some(raw) = object.get("status") {
            patch.status = Some(as_choice("status", raw)?.parse()?);
        }
        if let Some(raw) = object.get("priority") {
            patch.priority = Some(as_choice("priority", raw)?.parse()?);
        }
        if let Some(raw) = object.get("assigned_to_id") {
            patch.assignee = Some(as_assignee(raw)?);
        }
        if let Some(raw) = object.get("internal_notes") {
            patch.internal_notes = Some(as_text("internal_notes", raw)?);
        }
        if let Some(raw) = object.get("admin_response") {
            patch.admin_response = Some(as_text("admin_response", raw)?);
        }
        Ok(patch)
    }

    /// With status change
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: RequirementStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With priority change
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// With assignee change
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, change: AssigneeChange) -> Self {
        self.assignee = Some(change);
        self
    }

    /// With internal notes
    #[inline]
    #[must_use]
    pub fn with_internal_notes(mut self, notes: impl Into<String>) -> Self {
        self.internal_notes = Some(non_blank(notes.into()));
        self
    }

    /// Check whether the patch carries no change
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to a record on behalf of `actor`
    ///
    /// Returns `true` when the contacted rule auto-assigned the actor.
    pub fn apply(&self, record: &mut ClientRequirement, actor: &Actor, now: DateTime<Utc>) -> bool {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        match self.assignee {
            Some(AssigneeChange::Unassign) => record.assigned_to = None,
            Some(AssigneeChange::AssignTo(admin)) => record.assigned_to = Some(admin),
            None => {}
        }
        if let Some(notes) = &self.internal_notes {
            record.internal_notes.clone_from(notes);
        }
        if let Some(response) = &self.admin_response {
            if response.is_some() && record.admin_response != *response {
                record.response_sent_at = Some(now);
            }
            record.admin_response.clone_from(response);
        }

        let auto_assigned =
            self.status == Some(RequirementStatus::Contacted) && record.assigned_to.is_none();
        if auto_assigned {
            record.assigned_to = Some(actor.user_id);
        }

        record.touch(now);
        auto_assigned
    }
}

fn as_choice<'a>(field: &'static str, raw: &'a Value) -> Result<&'a str, ValidationError> {
    raw.as_str()
        .ok_or_else(|| ValidationError::invalid_choice(field, raw.to_string()))
}

fn as_assignee(raw: &Value) -> Result<AssigneeChange, ValidationError> {
    let invalid = || ValidationError::invalid_choice("assigned_to_id", raw.to_string());
    let id = match raw {
        Value::Null | Value::Bool(false) => return Ok(AssigneeChange::Unassign),
        Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
        Value::String(s) if s.trim().is_empty() => return Ok(AssigneeChange::Unassign),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    match id {
        0 => Ok(AssigneeChange::Unassign),
        id if id > 0 => Ok(AssigneeChange::AssignTo(AdminUserId(id))),
        _ => Err(invalid()),
    }
}

fn as_text(field: &'static str, raw: &Value) -> Result<Option<String>, ValidationError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) => Ok(non_blank(s.clone())),
        other => Err(ValidationError::invalid_choice(field, other.to_string())),
    }
}
