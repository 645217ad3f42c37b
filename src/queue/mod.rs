//! Waiting queue of triage outcomes for the emergency-room floor.

pub mod store;
pub mod types;

pub use store::WaitingQueue;
pub use types::{
    CategoryCount, HistoryFilter, HistoryPage, PatientMatch, QueueError, QueueStats, TriageRecord,
    HISTORY_PAGE_SIZE, SEARCH_LIMIT, SEARCH_MIN_CHARS,
};
