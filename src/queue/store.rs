use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::{TriageCategory, TriageResult, TriageStatus};

use super::types::{
    CategoryCount, HistoryFilter, HistoryPage, PatientMatch, QueueError, QueueStats, TriageRecord,
    HISTORY_PAGE_SIZE, SEARCH_LIMIT, SEARCH_MIN_CHARS,
};

/// In-memory queue of triage records backed by RwLock.
/// Persistence is the caller's concern.
pub struct WaitingQueue {
    records: RwLock<Vec<TriageRecord>>,
    next_seq: AtomicU64,
}

impl Default for WaitingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Admit a triaged patient now. Returns the record id.
    pub fn admit(&self, patient_name: &str, result: TriageResult) -> Result<Uuid, QueueError> {
        self.admit_at(patient_name, result, chrono::Local::now().naive_local())
    }

    /// Admit a patient triaged now by `clinician`.
    pub fn admit_by(
        &self,
        patient_name: &str,
        clinician: &str,
        result: TriageResult,
    ) -> Result<Uuid, QueueError> {
        self.insert(patient_name, Some(clinician), result, chrono::Local::now().naive_local())
    }

    /// Admit with an explicit triage time.
    pub fn admit_at(
        &self,
        patient_name: &str,
        result: TriageResult,
        triaged_at: NaiveDateTime,
    ) -> Result<Uuid, QueueError> {
        self.insert(patient_name, None, result, triaged_at)
    }

    fn insert(
        &self,
        patient_name: &str,
        triaged_by: Option<&str>,
        result: TriageResult,
        triaged_at: NaiveDateTime,
    ) -> Result<Uuid, QueueError> {
        let record = TriageRecord {
            id: Uuid::new_v4(),
            patient_name: patient_name.to_string(),
            result,
            status: TriageStatus::Waiting,
            triaged_at,
            triaged_by: triaged_by.map(str::to_string),
            taken_by: None,
            taken_at: None,
            completed_at: None,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        let id = record.id;

        tracing::info!(
            record_id = %id,
            category = %record.result.category,
            priority = record.result.priority,
            "Patient admitted to waiting queue"
        );

        self.records
            .write()
            .map_err(|_| QueueError::LockFailed)?
            .push(record);
        Ok(id)
    }

    pub fn get(&self, id: &Uuid) -> Result<TriageRecord, QueueError> {
        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        records
            .iter()
            .find(|r| r.id == *id)
            .cloned()
            .ok_or(QueueError::NotFound(*id))
    }

    /// Waiting patients: priority ascending, urgency descending, earliest first.
    pub fn waiting(&self, limit: usize) -> Result<Vec<TriageRecord>, QueueError> {
        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        let mut waiting: Vec<TriageRecord> = records
            .iter()
            .filter(|r| r.status == TriageStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|r| {
            (
                r.result.priority,
                Reverse(r.result.urgency_score),
                r.triaged_at,
                r.seq,
            )
        });
        waiting.truncate(limit);
        Ok(waiting)
    }

    /// A clinician takes charge of a waiting patient.
    pub fn take_charge(&self, id: &Uuid, clinician: &str) -> Result<(), QueueError> {
        let mut records = self.records.write().map_err(|_| QueueError::LockFailed)?;
        let record = records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or(QueueError::NotFound(*id))?;

        if record.status != TriageStatus::Waiting {
            return Err(QueueError::NotAvailable(*id));
        }

        record.status = TriageStatus::InProgress;
        record.taken_by = Some(clinician.to_string());
        record.taken_at = Some(chrono::Local::now().naive_local());
        tracing::info!(record_id = %id, "Patient taken in charge");
        Ok(())
    }

    /// Set a status by its stored name (`waiting`, `in_progress`, `completed`).
    pub fn set_status_str(&self, id: &Uuid, status: &str) -> Result<(), QueueError> {
        let status = TriageStatus::from_str(status)
            .map_err(|_| QueueError::InvalidStatus(status.to_string()))?;
        self.set_status(id, status)
    }

    /// Move a record to any status. Completion stamps the end time.
    pub fn set_status(&self, id: &Uuid, status: TriageStatus) -> Result<(), QueueError> {
        let mut records = self.records.write().map_err(|_| QueueError::LockFailed)?;
        let record = records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or(QueueError::NotFound(*id))?;

        record.status = status;
        if status == TriageStatus::Completed {
            record.completed_at = Some(chrono::Local::now().naive_local());
        }
        tracing::info!(record_id = %id, status = status.as_str(), "Triage status updated");
        Ok(())
    }

    /// Record counts per category, most urgent first. Categories with no
    /// records are omitted.
    pub fn distribution(&self) -> Result<Vec<CategoryCount>, QueueError> {
        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        Ok(TriageCategory::ALL
            .iter()
            .map(|c| CategoryCount {
                category: *c,
                count: records.iter().filter(|r| r.result.category == *c).count(),
            })
            .filter(|cc| cc.count > 0)
            .collect())
    }

    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        Ok(summarize(records.iter()))
    }

    /// Counters over the records one clinician triaged.
    pub fn stats_for(&self, clinician: &str) -> Result<QueueStats, QueueError> {
        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        Ok(summarize(
            records
                .iter()
                .filter(|r| r.triaged_by.as_deref() == Some(clinician)),
        ))
    }

    /// Patients whose name contains `query` (case-insensitive), most recently
    /// triaged first. Queries shorter than two characters match nothing.
    pub fn search(&self, query: &str) -> Result<Vec<PatientMatch>, QueueError> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < SEARCH_MIN_CHARS {
            return Ok(Vec::new());
        }

        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        let mut by_name: BTreeMap<&str, PatientMatch> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.patient_name.to_lowercase().contains(&query))
        {
            by_name
                .entry(record.patient_name.as_str())
                .and_modify(|m| {
                    m.triage_count += 1;
                    m.last_triage = m.last_triage.max(record.triaged_at);
                })
                .or_insert_with(|| PatientMatch {
                    patient_name: record.patient_name.clone(),
                    triage_count: 1,
                    last_triage: record.triaged_at,
                });
        }

        let mut matches: Vec<PatientMatch> = by_name.into_values().collect();
        matches.sort_by(|a, b| b.last_triage.cmp(&a.last_triage));
        matches.truncate(SEARCH_LIMIT);
        Ok(matches)
    }

    /// Filtered history, newest first, paginated.
    pub fn history(&self, filter: &HistoryFilter) -> Result<HistoryPage, QueueError> {
        let records = self.records.read().map_err(|_| QueueError::LockFailed)?;
        let mut matching: Vec<&TriageRecord> =
            records.iter().filter(|r| filter.matches(r)).collect();
        matching.sort_by_key(|r| Reverse((r.triaged_at, r.seq)));

        let total = matching.len();
        let page = filter.page.max(1);
        let total_pages = total.div_ceil(HISTORY_PAGE_SIZE);
        let records = matching
            .into_iter()
            .skip((page - 1).saturating_mul(HISTORY_PAGE_SIZE))
            .take(HISTORY_PAGE_SIZE)
            .cloned()
            .collect();

        Ok(HistoryPage {
            records,
            page,
            per_page: HISTORY_PAGE_SIZE,
            total,
            total_pages,
        })
    }
}

fn summarize<'a>(records: impl Iterator<Item = &'a TriageRecord> + Clone) -> QueueStats {
    let count = |s: TriageStatus| records.clone().filter(|r| r.status == s).count();
    let total = records.clone().count();
    let average_urgency = (total > 0).then(|| {
        records
            .clone()
            .map(|r| f64::from(r.result.urgency_score))
            .sum::<f64>()
            / total as f64
    });

    QueueStats {
        total,
        waiting: count(TriageStatus::Waiting),
        in_progress: count(TriageStatus::InProgress),
        completed: count(TriageStatus::Completed),
        average_urgency,
        first_triage: records.clone().map(|r| r.triaged_at).min(),
        last_triage: records.map(|r| r.triaged_at).max(),
    }
}
