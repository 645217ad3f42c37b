use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{TriageCategory, TriageResult, TriageStatus};

/// Records per history page.
pub const HISTORY_PAGE_SIZE: usize = 20;

/// Shortest name fragment a patient search accepts.
pub const SEARCH_MIN_CHARS: usize = 2;

/// Most patients a search returns.
pub const SEARCH_LIMIT: usize = 10;

/// One triaged patient in the emergency-room queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRecord {
    pub id: Uuid,
    pub patient_name: String,
    pub result: TriageResult,
    pub status: TriageStatus,
    pub triaged_at: NaiveDateTime,
    /// Clinician who performed the triage.
    #[serde(default)]
    pub triaged_by: Option<String>,
    /// Clinician who took charge.
    pub taken_by: Option<String>,
    pub taken_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    /// Admission order, breaks ties between identical timestamps.
    pub(crate) seq: u64,
}

/// Per-category record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: TriageCategory,
    pub count: usize,
}

/// Aggregate counters over every record ever admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// `None` when the queue is empty.
    pub average_urgency: Option<f64>,
    pub first_triage: Option<NaiveDateTime>,
    pub last_triage: Option<NaiveDateTime>,
}

/// History query. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub category: Option<TriageCategory>,
    /// Only records triaged by this clinician.
    pub triaged_by: Option<String>,
    /// Inclusive, by triage date.
    pub from: Option<NaiveDate>,
    /// Inclusive, by triage date.
    pub to: Option<NaiveDate>,
    /// 1-based.
    pub page: usize,
}

impl HistoryFilter {
    pub(crate) fn matches(&self, record: &TriageRecord) -> bool {
        let date = record.triaged_at.date();
        self.category.map_or(true, |c| record.result.category == c)
            && self
                .triaged_by
                .as_deref()
                .map_or(true, |who| record.triaged_by.as_deref() == Some(who))
            && self.from.map_or(true, |d| date >= d)
            && self.to.map_or(true, |d| date <= d)
    }
}

/// One page of history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub records: Vec<TriageRecord>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// A patient found by name, with their triage count and latest triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientMatch {
    pub patient_name: String,
    pub triage_count: usize,
    pub last_triage: NaiveDateTime,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Triage record not found: {0}")]
    NotFound(Uuid),

    #[error("Patient is no longer waiting: {0}")]
    NotAvailable(Uuid),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Queue lock poisoned")]
    LockFailed,
}
