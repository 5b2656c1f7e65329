//! Recurrence expansion.
//!
//! Turns a template's anchor date, pattern, weekday set and end date into the
//! ordered set of calendar dates on which the template recurs. Everything here is
//! pure: the same template and window always produce the same dates, which is what
//! lets exceptions be keyed by the original occurrence date alone.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::CoreError;
use crate::models::{RecurrencePattern, SessionTemplate, WeekdaySet};

/// Validated recurrence view of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Non-recurring: a single occurrence on the anchor date
    Once(NaiveDate),
    Repeating {
        anchor: NaiveDate,
        pattern: RecurrencePattern,
        days: WeekdaySet,
        /// Day-of-month targeted by monthly series (1..=31)
        month_day: u32,
        /// Inclusive. May precede `anchor` for a closed head left behind by a split
        until: NaiveDate,
    },
}

impl Recurrence {
    /// Reads the recurrence fields of a stored template.
    ///
    /// Fails with `Validation` when a recurring template is missing its pattern or end
    /// date, or a weekly/biweekly template has no weekdays. A closed series (end date
    /// before the anchor) is accepted here; see [`validate_template`] for the stricter
    /// rule applied to user input.
    pub fn from_template(template: &SessionTemplate) -> Result<Self, CoreError> {
        if !template.is_recurring {
            return Ok(Recurrence::Once(template.anchor_date));
        }

        let pattern = template.recurrence_pattern.ok_or_else(|| {
            CoreError::Validation("recurring session requires a recurrence pattern".to_string())
        })?;
        let until = template.recurrence_end_date.ok_or_else(|| {
            CoreError::Validation("recurring session requires a recurrence end date".to_string())
        })?;
        if pattern.uses_weekdays() && template.recurrence_days.is_empty() {
            return Err(CoreError::Validation(format!(
                "{} recurrence requires at least one weekday",
                pattern
            )));
        }

        let month_day = match template.recurrence_month_day {
            Some(day) if (1..=31).contains(&day) => day as u32,
            Some(day) => {
                return Err(CoreError::Validation(format!(
                    "recurrence month day {} is out of range",
                    day
                )))
            }
            None => template.anchor_date.day(),
        };

        Ok(Recurrence::Repeating {
            anchor: template.anchor_date,
            pattern,
            days: template.recurrence_days,
            month_day,
            until,
        })
    }

    /// Whether `date` is an occurrence of this recurrence.
    pub fn produces(&self, date: NaiveDate) -> bool {
        match *self {
            Recurrence::Once(anchor) => date == anchor,
            Recurrence::Repeating {
                anchor,
                pattern,
                days,
                month_day,
                until,
            } => {
                if date < anchor || date > until {
                    return false;
                }
                match pattern {
                    RecurrencePattern::Daily => true,
                    RecurrencePattern::Weekly => days.contains(date.weekday()),
                    RecurrencePattern::Biweekly => {
                        days.contains(date.weekday()) && week_offset(anchor, date) % 2 == 0
                    }
                    RecurrencePattern::Monthly => {
                        date.day() == clamp_to_month(date.year(), date.month(), month_day).day()
                    }
                }
            }
        }
    }

    /// Sorted, de-duplicated occurrence dates inside `[window_start, window_end]`.
    pub fn expand(&self, window_start: NaiveDate, window_end: NaiveDate) -> Vec<NaiveDate> {
        if window_end < window_start {
            return Vec::new();
        }

        match *self {
            Recurrence::Once(anchor) => {
                if anchor >= window_start && anchor <= window_end {
                    vec![anchor]
                } else {
                    Vec::new()
                }
            }
            Recurrence::Repeating {
                anchor,
                pattern,
                month_day,
                until,
                ..
            } => {
                let from = anchor.max(window_start);
                let to = until.min(window_end);
                if to < from {
                    return Vec::new();
                }
                match pattern {
                    RecurrencePattern::Monthly => monthly_dates(from, to, month_day),
                    _ => from
                        .iter_days()
                        .take_while(|date| *date <= to)
                        .filter(|date| self.produces(*date))
                        .collect(),
                }
            }
        }
    }

    /// First and last date any occurrence can fall on, or `None` for a closed series.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            Recurrence::Once(anchor) => Some((anchor, anchor)),
            Recurrence::Repeating { anchor, until, .. } if until >= anchor => Some((anchor, until)),
            Recurrence::Repeating { .. } => None,
        }
    }
}

/// Occurrence dates of `template` inside the window.
pub fn expand(
    template: &SessionTemplate,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Vec<NaiveDate>, CoreError> {
    Ok(Recurrence::from_template(template)?.expand(window_start, window_end))
}

/// Whether `template` currently produces an occurrence on `date`.
pub fn produces(template: &SessionTemplate, date: NaiveDate) -> Result<bool, CoreError> {
    Ok(Recurrence::from_template(template)?.produces(date))
}

/// Checks the template invariants that user-supplied data must satisfy.
pub fn validate_template(template: &SessionTemplate) -> Result<(), CoreError> {
    if template.title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be empty".to_string()));
    }
    if template.session_type.trim().is_empty() {
        return Err(CoreError::Validation("session type must not be empty".to_string()));
    }
    if template.end_time <= template.start_time {
        return Err(CoreError::Validation(format!(
            "end time {} must be after start time {}",
            template.end_time, template.start_time
        )));
    }
    if let Some(max) = template.max_participants {
        if max < 0 {
            return Err(CoreError::Validation(
                "max participants must not be negative".to_string(),
            ));
        }
    }

    if let Recurrence::Repeating { anchor, until, .. } = Recurrence::from_template(template)? {
        if until < anchor {
            return Err(CoreError::Validation(format!(
                "recurrence end date {} is before anchor date {}",
                until, anchor
            )));
        }
    }
    Ok(())
}

/// Monday that starts the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Zero-based number of weeks between the anchor's week and `date`'s week.
fn week_offset(anchor: NaiveDate, date: NaiveDate) -> i64 {
    (week_start(date) - week_start(anchor)).num_days() / 7
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// `month_day` of the given month, or its last day when the month is shorter.
fn clamp_to_month(year: i32, month: u32, month_day: u32) -> NaiveDate {
    let day = month_day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or(NaiveDate::MIN)
}

fn monthly_dates(from: NaiveDate, to: NaiveDate, month_day: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    loop {
        let candidate = clamp_to_month(year, month, month_day);
        if candidate > to {
            break;
        }
        if candidate >= from {
            dates.push(candidate);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    dates
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{SessionStatus, SessionTemplate};
    use chrono::{NaiveTime, Utc};
    use proptest::prelude::*;
    use rstest::rstest;
    use uuid::Uuid;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn template(
        anchor: NaiveDate,
        pattern: Option<RecurrencePattern>,
        days: &[u8],
        until: Option<NaiveDate>,
    ) -> SessionTemplate {
        SessionTemplate {
            id: Uuid::now_v7(),
            club_id: Uuid::now_v7(),
            season_id: None,
            title: "U12 Training".to_string(),
            description: None,
            session_type: "training".to_string(),
            status: SessionStatus::Scheduled,
            anchor_date: anchor,
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            location: Some("Main pitch".to_string()),
            coach_id: None,
            max_participants: Some(20),
            is_recurring: pattern.is_some(),
            recurrence_pattern: pattern,
            recurrence_days: WeekdaySet::from_ordinals(days.iter().copied()).unwrap(),
            recurrence_month_day: None,
            recurrence_end_date: until,
            split_from_id: None,
            lock_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_weekly_mon_wed_january() {
        let t = template(
            date(2024, 1, 1),
            Some(RecurrencePattern::Weekly),
            &[1, 3],
            Some(date(2024, 1, 31)),
        );
        let dates = expand(&t, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(dates.len(), 10);
        assert_eq!(dates.first(), Some(&date(2024, 1, 1)));
        assert_eq!(dates.last(), Some(&date(2024, 1, 31)));
        assert!(dates.contains(&date(2024, 1, 3)));
    }

    #[test]
    fn test_biweekly_even_weeks_only() {
        let t = template(
            date(2024, 1, 1),
            Some(RecurrencePattern::Biweekly),
            &[1],
            Some(date(2024, 1, 31)),
        );
        let dates = expand(&t, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 15), date(2024, 1, 29)]);
    }

    #[test]
    fn test_biweekly_parity_independent_of_window() {
        let t = template(
            date(2024, 1, 1),
            Some(RecurrencePattern::Biweekly),
            &[1],
            Some(date(2024, 3, 31)),
        );
        let dates = expand(&t, date(2024, 1, 20), date(2024, 2, 20)).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 29), date(2024, 2, 12)]);
    }

    #[test]
    fn test_biweekly_anchor_mid_week_shares_anchor_week() {
        // Anchored on a Wednesday: Monday of week 0 precedes the anchor, Friday doesn't.
        let t = template(
            date(2024, 1, 3),
            Some(RecurrencePattern::Biweekly),
            &[1, 5],
            Some(date(2024, 1, 31)),
        );
        let dates = expand(&t, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 1, 5), date(2024, 1, 15), date(2024, 1, 19), date(2024, 1, 29)]
        );
    }

    #[test]
    fn test_daily_clipped_to_window_and_end() {
        let t = template(
            date(2024, 1, 10),
            Some(RecurrencePattern::Daily),
            &[],
            Some(date(2024, 1, 14)),
        );
        let dates = expand(&t, date(2024, 1, 1), date(2024, 1, 12)).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 10), date(2024, 1, 11), date(2024, 1, 12)]);
    }

    #[test]
    fn test_monthly_clamps_to_last_day() {
        let t = template(
            date(2024, 1, 31),
            Some(RecurrencePattern::Monthly),
            &[],
            Some(date(2024, 5, 31)),
        );
        let dates = expand(&t, date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30),
                date(2024, 5, 31),
            ]
        );
    }

    #[test]
    fn test_monthly_month_day_survives_clamped_anchor() {
        let mut t = template(
            date(2024, 2, 29),
            Some(RecurrencePattern::Monthly),
            &[],
            Some(date(2024, 4, 30)),
        );
        t.recurrence_month_day = Some(31);
        let dates = expand(&t, date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(dates, vec![date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]);
    }

    #[test]
    fn test_one_off_yields_anchor_only() {
        let t = template(date(2024, 6, 1), None, &[], None);
        assert_eq!(
            expand(&t, date(2024, 1, 1), date(2024, 12, 31)).unwrap(),
            vec![date(2024, 6, 1)]
        );
        assert!(expand(&t, date(2024, 7, 1), date(2024, 12, 31)).unwrap().is_empty());
    }

    #[test]
    fn test_closed_series_produces_nothing() {
        let t = template(
            date(2024, 1, 8),
            Some(RecurrencePattern::Weekly),
            &[1],
            Some(date(2024, 1, 7)),
        );
        assert!(expand(&t, date(2024, 1, 1), date(2024, 12, 31)).unwrap().is_empty());
        assert_eq!(Recurrence::from_template(&t).unwrap().bounds(), None);
        assert!(validate_template(&t).is_err());
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let t = template(date(2024, 1, 1), Some(RecurrencePattern::Daily), &[], Some(date(2024, 12, 31)));
        assert!(expand(&t, date(2024, 2, 1), date(2024, 1, 1)).unwrap().is_empty());
    }

    #[rstest]
    #[case(RecurrencePattern::Weekly)]
    #[case(RecurrencePattern::Biweekly)]
    fn test_weekday_patterns_require_days(#[case] pattern: RecurrencePattern) {
        let t = template(date(2024, 1, 1), Some(pattern), &[], Some(date(2024, 1, 31)));
        assert!(matches!(
            Recurrence::from_template(&t),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_recurring_requires_end_date() {
        let t = template(date(2024, 1, 1), Some(RecurrencePattern::Daily), &[], None);
        assert!(matches!(validate_template(&t), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_times() {
        let mut t = template(date(2024, 1, 1), None, &[], None);
        t.end_time = t.start_time;
        assert!(matches!(validate_template(&t), Err(CoreError::Validation(_))));
    }

    #[rstest]
    #[case(date(2024, 1, 1), true)]
    #[case(date(2024, 1, 2), false)]
    #[case(date(2024, 1, 8), false)]
    #[case(date(2024, 1, 15), true)]
    #[case(date(2023, 12, 18), false)]
    #[case(date(2024, 2, 12), false)]
    fn test_produces_biweekly(#[case] candidate: NaiveDate, #[case] expected: bool) {
        let t = template(
            date(2024, 1, 1),
            Some(RecurrencePattern::Biweekly),
            &[1],
            Some(date(2024, 1, 31)),
        );
        assert_eq!(produces(&t, candidate).unwrap(), expected);
    }

    fn pattern_strategy() -> impl Strategy<Value = RecurrencePattern> {
        prop_oneof![
            Just(RecurrencePattern::Daily),
            Just(RecurrencePattern::Weekly),
            Just(RecurrencePattern::Biweekly),
            Just(RecurrencePattern::Monthly),
        ]
    }

    proptest! {
        #[test]
        fn prop_expand_is_deterministic_and_consistent(
            pattern in pattern_strategy(),
            anchor_offset in 0i64..400,
            length in 0i64..400,
            days in 1u8..128,
            window_offset in 0i64..500,
            window_length in 0i64..200,
        ) {
            let base = date(2024, 1, 1);
            let anchor = base + Duration::days(anchor_offset);
            let ordinals: Vec<u8> = (0..7).filter(|bit| days & (1 << bit) != 0).collect();
            let t = template(anchor, Some(pattern), &ordinals, Some(anchor + Duration::days(length)));
            let start = base + Duration::days(window_offset);
            let end = start + Duration::days(window_length);

            let first = expand(&t, start, end).unwrap();
            let second = expand(&t, start, end).unwrap();
            prop_assert_eq!(&first, &second);

            let mut sorted = first.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(&sorted, &first);

            let by_day: Vec<NaiveDate> = start
                .iter_days()
                .take_while(|d| *d <= end)
                .filter(|d| produces(&t, *d).unwrap())
                .collect();
            prop_assert_eq!(by_day, first);
        }
    }
}
