use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Draft,
    Scheduled,
    Cancelled,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid session status: {0}")]
pub struct ParseSessionStatusError(String);

impl FromStr for SessionStatus {
    type Err = ParseSessionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(SessionStatus::Draft),
            "scheduled" => Ok(SessionStatus::Scheduled),
            "cancelled" | "canceled" => Ok(SessionStatus::Cancelled),
            _ => Err(ParseSessionStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Draft => write!(f, "draft"),
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrencePattern {
    /// Weekly and biweekly series pick their weekdays from `recurrence_days`.
    pub fn uses_weekdays(self) -> bool {
        matches!(self, RecurrencePattern::Weekly | RecurrencePattern::Biweekly)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence pattern: {0}")]
pub struct ParseRecurrencePatternError(String);

impl FromStr for RecurrencePattern {
    type Err = ParseRecurrencePatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "biweekly" | "fortnightly" => Ok(RecurrencePattern::Biweekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            _ => Err(ParseRecurrencePatternError(s.to_string())),
        }
    }
}

impl std::fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrencePattern::Daily => write!(f, "daily"),
            RecurrencePattern::Weekly => write!(f, "weekly"),
            RecurrencePattern::Biweekly => write!(f, "biweekly"),
            RecurrencePattern::Monthly => write!(f, "monthly"),
        }
    }
}

/// Set of weekday ordinals, 0 = Sunday through 6 = Saturday, stored as a bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct WeekdaySet(i32);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Builds a set from ordinals, rejecting anything outside 0..=6.
    pub fn from_ordinals<I: IntoIterator<Item = u8>>(ordinals: I) -> Result<Self, InvalidWeekdayError> {
        let mut bits = 0;
        for ordinal in ordinals {
            if ordinal > 6 {
                return Err(InvalidWeekdayError(ordinal));
            }
            bits |= 1 << ordinal;
        }
        Ok(WeekdaySet(bits))
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_sunday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 & 0x7f == 0
    }

    pub fn ordinals(self) -> Vec<u8> {
        (0u8..7).filter(|ordinal| self.0 & (1 << ordinal) != 0).collect()
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday ordinal {0}: expected 0 (Sunday) to 6 (Saturday)")]
pub struct InvalidWeekdayError(u8);

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.ordinals()
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = InvalidWeekdayError;

    fn try_from(ordinals: Vec<u8>) -> Result<Self, Self::Error> {
        WeekdaySet::from_ordinals(ordinals)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday list: {0}")]
pub struct ParseWeekdaySetError(String);

impl FromStr for WeekdaySet {
    type Err = ParseWeekdaySetError;

    /// Accepts comma-separated ordinals (`1,3`) or names (`mon,wed`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ordinals = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let ordinal = match part.parse::<u8>() {
                Ok(n) => n,
                Err(_) => part
                    .parse::<Weekday>()
                    .map(|w| w.num_days_from_sunday() as u8)
                    .map_err(|_| ParseWeekdaySetError(s.to_string()))?,
            };
            ordinals.push(ordinal);
        }
        WeekdaySet::from_ordinals(ordinals).map_err(|e| ParseWeekdaySetError(e.to_string()))
    }
}

/// A stored session definition: either one-off or the template of a recurring series.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SessionTemplate {
    pub id: Uuid,
    pub club_id: Uuid,
    pub season_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub session_type: String,
    pub status: SessionStatus,
    /// First date of the series, or the only date of a one-off session
    pub anchor_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub coach_id: Option<Uuid>,
    pub max_participants: Option<i32>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_days: WeekdaySet,
    /// Day-of-month a monthly series targets; falls back to the anchor's day
    pub recurrence_month_day: Option<i32>,
    /// Inclusive last date of the series
    pub recurrence_end_date: Option<NaiveDate>,
    /// Head template this one was split from, if any
    pub split_from_id: Option<Uuid>,
    pub lock_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A template together with its ordered team associations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(flatten)]
    pub template: SessionTemplate,
    pub team_ids: Vec<Uuid>,
}

/// Recurrence settings supplied when creating a series.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceSpec {
    pub pattern: RecurrencePattern,
    pub days: WeekdaySet,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewSessionData {
    pub season_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub session_type: String,
    /// Defaults to draft
    pub status: Option<SessionStatus>,
    pub anchor_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub coach_id: Option<Uuid>,
    pub max_participants: Option<i32>,
    /// When present the session becomes a recurring series
    pub recurrence: Option<RecurrenceSpec>,
    pub team_ids: Vec<Uuid>,
}

/// Template-level changes used by the "future" and "all" edit scopes.
///
/// `Option<Option<T>>` fields distinguish "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub session_type: Option<String>,
    pub status: Option<SessionStatus>,
    pub season_id: Option<Option<Uuid>>,
    pub anchor_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<Option<String>>,
    pub coach_id: Option<Option<Uuid>>,
    pub max_participants: Option<Option<i32>>,
    pub is_recurring: Option<bool>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_days: Option<WeekdaySet>,
    pub recurrence_end_date: Option<NaiveDate>,
    pub team_ids: Option<Vec<Uuid>>,
}

impl SessionChanges {
    pub fn is_empty(&self) -> bool {
        *self == SessionChanges::default()
    }

    /// True when the change can alter which dates the template produces.
    pub fn touches_recurrence(&self) -> bool {
        self.anchor_date.is_some()
            || self.is_recurring.is_some()
            || self.recurrence_pattern.is_some()
            || self.recurrence_days.is_some()
            || self.recurrence_end_date.is_some()
    }

    /// Applies every present field to `template`. Team ids are not part of the row.
    pub fn apply_to(&self, template: &mut SessionTemplate) {
        if let Some(title) = &self.title {
            template.title = title.clone();
        }
        if let Some(description) = &self.description {
            template.description = description.clone();
        }
        if let Some(session_type) = &self.session_type {
            template.session_type = session_type.clone();
        }
        if let Some(status) = self.status {
            template.status = status;
        }
        if let Some(season_id) = self.season_id {
            template.season_id = season_id;
        }
        if let Some(anchor_date) = self.anchor_date {
            template.anchor_date = anchor_date;
            template.recurrence_month_day = None;
        }
        if let Some(start_time) = self.start_time {
            template.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            template.end_time = end_time;
        }
        if let Some(location) = &self.location {
            template.location = location.clone();
        }
        if let Some(coach_id) = self.coach_id {
            template.coach_id = coach_id;
        }
        if let Some(max_participants) = self.max_participants {
            template.max_participants = max_participants;
        }
        if let Some(pattern) = self.recurrence_pattern {
            if template.recurrence_pattern != Some(pattern) {
                template.recurrence_month_day = None;
            }
            template.recurrence_pattern = Some(pattern);
            template.is_recurring = true;
        }
        if let Some(days) = self.recurrence_days {
            template.recurrence_days = days;
        }
        if let Some(end_date) = self.recurrence_end_date {
            template.recurrence_end_date = Some(end_date);
        }
        match self.is_recurring {
            Some(false) => {
                template.is_recurring = false;
                template.recurrence_pattern = None;
                template.recurrence_days = WeekdaySet::EMPTY;
                template.recurrence_month_day = None;
                template.recurrence_end_date = None;
            }
            Some(true) => template.is_recurring = true,
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExceptionType {
    /// Occurrence is suppressed
    Cancelled,
    /// Date or times differ from the template
    Rescheduled,
    /// Other fields differ from the template
    Modified,
}

impl std::fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExceptionType::Cancelled => write!(f, "cancelled"),
            ExceptionType::Rescheduled => write!(f, "rescheduled"),
            ExceptionType::Modified => write!(f, "modified"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid exception type: {0}")]
pub struct ParseExceptionTypeError(String);

impl FromStr for ExceptionType {
    type Err = ParseExceptionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cancelled" => Ok(ExceptionType::Cancelled),
            "rescheduled" => Ok(ExceptionType::Rescheduled),
            "modified" => Ok(ExceptionType::Modified),
            _ => Err(ParseExceptionTypeError(s.to_string())),
        }
    }
}

/// Sparse per-occurrence override record. `None` means "inherit from the template".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OccurrenceOverrides {
    #[sqlx(rename = "override_date")]
    pub date: Option<NaiveDate>,
    #[sqlx(rename = "override_start_time")]
    pub start_time: Option<NaiveTime>,
    #[sqlx(rename = "override_end_time")]
    pub end_time: Option<NaiveTime>,
    #[sqlx(rename = "override_title")]
    pub title: Option<String>,
    #[sqlx(rename = "override_description")]
    pub description: Option<String>,
    #[sqlx(rename = "override_location")]
    pub location: Option<String>,
    #[sqlx(rename = "override_coach_id")]
    pub coach_id: Option<Uuid>,
    #[sqlx(rename = "override_max_participants")]
    pub max_participants: Option<i32>,
    #[sqlx(rename = "override_status")]
    pub status: Option<SessionStatus>,
}

impl OccurrenceOverrides {
    pub fn is_empty(&self) -> bool {
        *self == OccurrenceOverrides::default()
    }

    /// Returns `self` with every field present in `newer` replaced.
    pub fn merged_with(&self, newer: &OccurrenceOverrides) -> OccurrenceOverrides {
        OccurrenceOverrides {
            date: newer.date.or(self.date),
            start_time: newer.start_time.or(self.start_time),
            end_time: newer.end_time.or(self.end_time),
            title: newer.title.clone().or_else(|| self.title.clone()),
            description: newer.description.clone().or_else(|| self.description.clone()),
            location: newer.location.clone().or_else(|| self.location.clone()),
            coach_id: newer.coach_id.or(self.coach_id),
            max_participants: newer.max_participants.or(self.max_participants),
            status: newer.status.or(self.status),
        }
    }
}

/// A stored override for one occurrence of a template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct OccurrenceException {
    pub template_id: Uuid,
    /// The date the template originally produced; never changes on reschedule
    pub occurrence_date: NaiveDate,
    pub exception_type: ExceptionType,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub overrides: OccurrenceOverrides,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One computed calendar entry. Never persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VirtualOccurrence {
    pub template_id: Uuid,
    pub occurrence_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: String,
    pub description: Option<String>,
    pub session_type: String,
    pub location: Option<String>,
    pub coach_id: Option<Uuid>,
    pub max_participants: Option<i32>,
    pub status: SessionStatus,
    pub team_ids: Vec<Uuid>,
    pub is_exception: bool,
    pub exception_type: Option<ExceptionType>,
}

/// Result of a "this and future" edit.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    /// Original template, now ending the day before the split
    pub head: Session,
    /// New template starting at the split date
    pub tail: Session,
    /// Number of exceptions moved from head to tail
    pub migrated_exceptions: u64,
}

/// Scope for edits on recurring sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    /// Affect only the selected occurrence
    This,
    /// Split the series at the selected occurrence
    Future,
    /// Modify the entire series, past and future
    All,
}

impl std::fmt::Display for EditScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditScope::This => write!(f, "this"),
            EditScope::Future => write!(f, "future"),
            EditScope::All => write!(f, "all"),
        }
    }
}

impl FromStr for EditScope {
    type Err = ParseEditScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "this" | "occurrence" => Ok(EditScope::This),
            "future" | "this_and_future" => Ok(EditScope::Future),
            "all" | "series" | "entire" => Ok(EditScope::All),
            _ => Err(ParseEditScopeError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid edit scope: {0}")]
pub struct ParseEditScopeError(String);

/// Result of a scope-dispatched edit.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum EditOutcome {
    This(OccurrenceException),
    Future(SplitOutcome),
    All(Session),
}

/// Listing window policy and lock timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Window length used when a listing gives no end date
    pub default_window_days: u32,
    /// Longest window a single listing may expand
    pub max_window_days: u32,
    /// How long a writer waits for the template lock
    pub lock_timeout_secs: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_window_days: 90,
            max_window_days: 731,
            lock_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1,3", vec![1, 3])]
    #[case("mon,wed", vec![1, 3])]
    #[case("sun, sat", vec![0, 6])]
    #[case("", vec![])]
    fn test_weekday_set_from_str(#[case] input: &str, #[case] expected: Vec<u8>) {
        let set: WeekdaySet = input.parse().unwrap();
        assert_eq!(set.ordinals(), expected);
    }

    #[test]
    fn test_weekday_set_rejects_out_of_range() {
        assert!(WeekdaySet::from_ordinals([7]).is_err());
        assert!("8".parse::<WeekdaySet>().is_err());
    }

    #[test]
    fn test_weekday_set_contains_uses_sunday_zero() {
        let set = WeekdaySet::from_ordinals([0, 1]).unwrap();
        assert!(set.contains(Weekday::Sun));
        assert!(set.contains(Weekday::Mon));
        assert!(!set.contains(Weekday::Sat));
    }

    #[test]
    fn test_weekday_set_serializes_as_ordinals() {
        let set = WeekdaySet::from_ordinals([3, 1]).unwrap();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[1,3]");
        let back: WeekdaySet = serde_json::from_str("[1,3]").unwrap();
        assert_eq!(back, set);
    }

    #[rstest]
    #[case("this", EditScope::This)]
    #[case("future", EditScope::Future)]
    #[case("ALL", EditScope::All)]
    #[case("series", EditScope::All)]
    fn test_edit_scope_from_str(#[case] input: &str, #[case] expected: EditScope) {
        assert_eq!(input.parse::<EditScope>().unwrap(), expected);
    }

    #[test]
    fn test_overrides_merge_keeps_older_fields() {
        let older = OccurrenceOverrides {
            title: Some("Keeper drills".into()),
            ..Default::default()
        };
        let newer = OccurrenceOverrides {
            location: Some("Pitch 2".into()),
            ..Default::default()
        };
        let merged = older.merged_with(&newer);
        assert_eq!(merged.title.as_deref(), Some("Keeper drills"));
        assert_eq!(merged.location.as_deref(), Some("Pitch 2"));
    }

    #[test]
    fn test_changes_to_one_off_clear_recurrence() {
        let changes = SessionChanges {
            is_recurring: Some(false),
            ..Default::default()
        };
        assert!(changes.touches_recurrence());
        assert!(!changes.is_empty());
        assert!(SessionChanges::default().is_empty());
    }
}
