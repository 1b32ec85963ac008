//! Live aggregate counts
//!
//! Stores feed rows through a [`StatsAccumulator`] (or compute the same
//! numbers in SQL). Every status and every service appears in the result,
//! zero counts included.

use crate::requirement::ClientRequirement;
use crate::types::{RequirementStatus, ServiceType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `system_status` reported by the dashboard while the store answers
pub const SYSTEM_ONLINE: &str = "online";

/// Aggregate counts over all requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementStats {
    pub status_counts: BTreeMap<RequirementStatus, u64>,
    /// Created on the reference day (UTC)
    pub today_count: u64,
    /// Status `new` and nobody assigned
    pub unassigned_count: u64,
    pub service_counts: BTreeMap<ServiceType, u64>,
    pub total: u64,
}

impl RequirementStats {
    /// Count for one status
    #[inline]
    #[must_use]
    pub fn status(&self, status: RequirementStatus) -> u64 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Count for one service
    #[inline]
    #[must_use]
    pub fn service(&self, service: ServiceType) -> u64 {
        self.service_counts.get(&service).copied().unwrap_or(0)
    }

    /// Headline counts shown next to the list
    #[must_use]
    pub fn list_counts(&self) -> ListCounts {
        ListCounts {
            total: self.total,
            new: self.status(RequirementStatus::New),
            contacted: self.status(RequirementStatus::Contacted),
            today: self.today_count,
        }
    }

    /// Dashboard summary
    #[must_use]
    pub fn dashboard(&self) -> DashboardStats {
        DashboardStats {
            total_forms: self.total,
            new_forms: self.status(RequirementStatus::New),
            today_forms: self.today_count,
            alerts: 0,
            system_status: SYSTEM_ONLINE.to_string(),
        }
    }

    /// Sidebar badges
    #[must_use]
    pub fn sidebar(&self) -> SidebarStats {
        SidebarStats {
            new_forms: self.status(RequirementStatus::New),
            alerts: 0,
        }
    }
}

/// Incremental builder for [`RequirementStats`]
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    today: NaiveDate,
    stats: RequirementStats,
}

impl StatsAccumulator {
    /// Start counting, with `today` as the reference day
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            stats: RequirementStats {
                status_counts: RequirementStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
                today_count: 0,
                unassigned_count: 0,
                service_counts: ServiceType::ALL.into_iter().map(|s| (s, 0)).collect(),
                total: 0,
            },
        }
    }

    /// Count one row
    pub fn observe(&mut self, requirement: &ClientRequirement) {
        let stats = &mut self.stats;
        stats.total += 1;
        *stats.status_counts.entry(requirement.status).or_insert(0) += 1;
        for service in &requirement.services {
            *stats.service_counts.entry(*service).or_insert(0) += 1;
        }
        if requirement.created_at.date_naive() == self.today {
            stats.today_count += 1;
        }
        if requirement.status == RequirementStatus::New && requirement.assigned_to.is_none() {
            stats.unassigned_count += 1;
        }
    }

    /// Finished counts
    #[must_use]
    pub fn finish(self) -> RequirementStats {
        self.stats
    }

    /// Count a whole collection in one go
    #[must_use]
    pub fn from_records<'a>(
        today: NaiveDate,
        records: impl IntoIterator<Item = &'a ClientRequirement>,
    ) -> RequirementStats {
        let mut acc = Self::new(today);
        for record in records {
            acc.observe(record);
        }
        acc.finish()
    }
}

/// Counts shown above the requirement list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCounts {
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub today: u64,
}

/// Admin dashboard header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_forms: u64,
    pub new_forms: u64,
    pub today_forms: u64,
    pub alerts: u64,
    pub system_status: String,
}

/// Admin sidebar badges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarStats {
    pub new_forms: u64,
    pub alerts: u64,
}
