//! Row-level visibility
//!
//! Superusers see every requirement. Everybody else sees the rows assigned
//! to them plus the unassigned ones. Stores translate [`Visibility`] into
//! their own query language; [`Visibility::admits`] is the reference
//! semantics they must agree with.

use crate::identity::Actor;
use crate::types::AdminUserId;
use serde::{Deserialize, Serialize};

/// Which requirement rows an actor may read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Every row
    #[default]
    Unrestricted,
    /// Rows assigned to this admin, or to nobody
    OwnOrUnassigned(AdminUserId),
}

impl Visibility {
    /// Visibility granted to an actor
    #[inline]
    #[must_use]
    pub fn for_actor(actor: &Actor) -> Self {
        if actor.is_superuser {
            Self::Unrestricted
        } else {
            Self::OwnOrUnassigned(actor.user_id)
        }
    }

    /// Check a row by its assignee
    #[inline]
    #[must_use]
    pub fn admits(&self, assigned_to: Option<AdminUserId>) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::OwnOrUnassigned(me) => assigned_to.map_or(true, |owner| owner == *me),
        }
    }

    /// Check whether the restriction applies at all
    #[inline]
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::OwnOrUnassigned(_))
    }
}
