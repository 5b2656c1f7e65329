use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Session, SessionStatus, VirtualOccurrence};

/// Filters accepted by session listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub team_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    /// Keep cancelled occurrences in expanded listings (management views)
    pub include_cancelled: bool,
}

/// Inclusive date range a listing is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Result of a session listing: raw templates, or resolved occurrences when expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Sessions(Vec<Session>),
    Occurrences(Vec<VirtualOccurrence>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Sessions(sessions) => sessions.len(),
            Listing::Occurrences(occurrences) => occurrences.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
