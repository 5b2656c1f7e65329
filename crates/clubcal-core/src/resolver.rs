//! Occurrence resolution: template dates overlaid with per-occurrence exceptions.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::CoreError;
use crate::models::{
    ExceptionType, OccurrenceException, Session, SessionStatus, SessionTemplate, VirtualOccurrence,
};
use crate::query::DateWindow;
use crate::recurrence::Recurrence;

/// Resolves the occurrences of one session inside `[window_start, window_end]`.
///
/// Dates come from the recurrence expander; each one is looked up in `exceptions`:
/// - no exception: the template's fields verbatim
/// - `cancelled`: dropped unless `include_cancelled` is set
/// - `rescheduled` / `modified`: template fields overlaid with the non-null overrides;
///   only `rescheduled` moves `effective_date`
///
/// Occurrences whose effective status is cancelled (including every occurrence of a
/// cancelled template) are suppressed the same way.
///
/// Membership in the window is decided by `effective_date`: an occurrence
/// rescheduled out of the window is dropped and one rescheduled into it from an
/// outside date is included. The result is ordered by `effective_date`, then
/// `start_time`.
pub fn resolve(
    session: &Session,
    exceptions: &[OccurrenceException],
    window_start: NaiveDate,
    window_end: NaiveDate,
    include_cancelled: bool,
) -> Result<Vec<VirtualOccurrence>, CoreError> {
    let template = &session.template;
    let recurrence = Recurrence::from_template(template)?;
    let window = DateWindow::new(window_start, window_end);

    let by_date: HashMap<NaiveDate, &OccurrenceException> = exceptions
        .iter()
        .filter(|ex| ex.template_id == template.id)
        .map(|ex| (ex.occurrence_date, ex))
        .collect();

    let mut dates = recurrence.expand(window_start, window_end);
    dates.extend(
        by_date
            .values()
            .filter(|ex| ex.exception_type == ExceptionType::Rescheduled)
            .filter(|ex| ex.overrides.date.is_some_and(|moved_to| window.contains(moved_to)))
            .map(|ex| ex.occurrence_date)
            .filter(|original| !window.contains(*original) && recurrence.produces(*original)),
    );

    let mut occurrences: Vec<VirtualOccurrence> = dates
        .into_iter()
        .map(|date| match by_date.get(&date) {
            Some(exception) => overlay(template, &session.team_ids, exception),
            None => base_occurrence(template, &session.team_ids, date),
        })
        .filter(|occurrence| window.contains(occurrence.effective_date))
        .filter(|occurrence| include_cancelled || occurrence.status != SessionStatus::Cancelled)
        .collect();

    sort_occurrences(&mut occurrences);
    Ok(occurrences)
}

/// Orders by effective date, then start time, then template for a stable merge.
pub fn sort_occurrences(occurrences: &mut [VirtualOccurrence]) {
    occurrences.sort_by(|a, b| {
        a.effective_date
            .cmp(&b.effective_date)
            .then(a.start_time.cmp(&b.start_time))
            .then(a.template_id.cmp(&b.template_id))
            .then(a.occurrence_date.cmp(&b.occurrence_date))
    });
}

/// The occurrence a template produces on `date` with no exception applied.
pub fn base_occurrence(
    template: &SessionTemplate,
    team_ids: &[uuid::Uuid],
    date: NaiveDate,
) -> VirtualOccurrence {
    VirtualOccurrence {
        template_id: template.id,
        occurrence_date: date,
        effective_date: date,
        start_time: template.start_time,
        end_time: template.end_time,
        title: template.title.clone(),
        description: template.description.clone(),
        session_type: template.session_type.clone(),
        location: template.location.clone(),
        coach_id: template.coach_id,
        max_participants: template.max_participants,
        status: template.status,
        team_ids: team_ids.to_vec(),
        is_exception: false,
        exception_type: None,
    }
}

fn overlay(
    template: &SessionTemplate,
    team_ids: &[uuid::Uuid],
    exception: &OccurrenceException,
) -> VirtualOccurrence {
    let mut occurrence = base_occurrence(template, team_ids, exception.occurrence_date);
    let o = &exception.overrides;

    if exception.exception_type == ExceptionType::Rescheduled {
        if let Some(date) = o.date {
            occurrence.effective_date = date;
        }
    }
    if let Some(start_time) = o.start_time {
        occurrence.start_time = start_time;
    }
    if let Some(end_time) = o.end_time {
        occurrence.end_time = end_time;
    }
    if let Some(title) = &o.title {
        occurrence.title = title.clone();
    }
    if let Some(description) = &o.description {
        occurrence.description = Some(description.clone());
    }
    if let Some(location) = &o.location {
        occurrence.location = Some(location.clone());
    }
    if let Some(coach_id) = o.coach_id {
        occurrence.coach_id = Some(coach_id);
    }
    if let Some(max_participants) = o.max_participants {
        occurrence.max_participants = Some(max_participants);
    }
    if let Some(status) = o.status {
        occurrence.status = status;
    }
    if exception.exception_type == ExceptionType::Cancelled {
        occurrence.status = SessionStatus::Cancelled;
    }

    occurrence.is_exception = true;
    occurrence.exception_type = Some(exception.exception_type);
    occurrence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OccurrenceOverrides, RecurrencePattern};
    use crate::recurrence::tests::{date, template};
    use chrono::{NaiveTime, Utc};
    use uuid::Uuid;

    fn weekly_mondays() -> Session {
        Session {
            template: template(
                date(2024, 1, 1),
                Some(RecurrencePattern::Weekly),
                &[1],
                Some(date(2024, 1, 31)),
            ),
            team_ids: vec![Uuid::now_v7()],
        }
    }

    fn exception(
        session: &Session,
        on: NaiveDate,
        exception_type: ExceptionType,
        overrides: OccurrenceOverrides,
    ) -> OccurrenceException {
        OccurrenceException {
            template_id: session.template.id,
            occurrence_date: on,
            exception_type,
            overrides,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_exceptions_yields_template_fields() {
        let session = weekly_mondays();
        let resolved = resolve(&session, &[], date(2024, 1, 1), date(2024, 1, 31), false).unwrap();
        assert_eq!(resolved.len(), 5);
        for occurrence in &resolved {
            assert_eq!(occurrence.title, session.template.title);
            assert_eq!(occurrence.effective_date, occurrence.occurrence_date);
            assert_eq!(occurrence.team_ids, session.team_ids);
            assert!(!occurrence.is_exception);
        }
    }

    #[test]
    fn test_cancelled_is_suppressed_by_default() {
        let session = weekly_mondays();
        let cancelled = exception(
            &session,
            date(2024, 1, 15),
            ExceptionType::Cancelled,
            OccurrenceOverrides {
                status: Some(SessionStatus::Cancelled),
                ..Default::default()
            },
        );
        let resolved = resolve(&session, &[cancelled.clone()], date(2024, 1, 1), date(2024, 1, 31), false)
            .unwrap();
        assert_eq!(resolved.len(), 4);
        assert!(resolved.iter().all(|o| o.occurrence_date != date(2024, 1, 15)));

        let with_cancelled =
            resolve(&session, &[cancelled], date(2024, 1, 1), date(2024, 1, 31), true).unwrap();
        let jan15 = with_cancelled
            .iter()
            .find(|o| o.occurrence_date == date(2024, 1, 15))
            .unwrap();
        assert_eq!(jan15.status, SessionStatus::Cancelled);
        assert_eq!(jan15.exception_type, Some(ExceptionType::Cancelled));
    }

    #[test]
    fn test_modified_replaces_only_overridden_fields() {
        let session = weekly_mondays();
        let modified = exception(
            &session,
            date(2024, 1, 8),
            ExceptionType::Modified,
            OccurrenceOverrides {
                location: Some("Indoor hall".to_string()),
                ..Default::default()
            },
        );
        let resolved = resolve(&session, &[modified], date(2024, 1, 8), date(2024, 1, 8), false).unwrap();
        let mut expected = base_occurrence(&session.template, &session.team_ids, date(2024, 1, 8));
        expected.location = Some("Indoor hall".to_string());
        expected.is_exception = true;
        expected.exception_type = Some(ExceptionType::Modified);
        assert_eq!(resolved, vec![expected]);
    }

    #[test]
    fn test_rescheduled_moves_effective_date_and_sorts() {
        let session = weekly_mondays();
        let moved = exception(
            &session,
            date(2024, 1, 8),
            ExceptionType::Rescheduled,
            OccurrenceOverrides {
                date: Some(date(2024, 1, 16)),
                start_time: Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
                ..Default::default()
            },
        );
        let resolved = resolve(&session, &[moved], date(2024, 1, 1), date(2024, 1, 31), false).unwrap();
        let effective: Vec<NaiveDate> = resolved.iter().map(|o| o.effective_date).collect();
        assert_eq!(
            effective,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 15),
                date(2024, 1, 16),
                date(2024, 1, 22),
                date(2024, 1, 29),
            ]
        );
        let moved = &resolved[2];
        assert_eq!(moved.occurrence_date, date(2024, 1, 8));
        assert_eq!(moved.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_exceptions_of_other_templates_ignored() {
        let session = weekly_mondays();
        let other = weekly_mondays();
        let foreign = exception(&other, date(2024, 1, 8), ExceptionType::Cancelled, Default::default());
        let resolved = resolve(&session, &[foreign], date(2024, 1, 1), date(2024, 1, 31), false).unwrap();
        assert_eq!(resolved.len(), 5);
    }

    #[test]
    fn test_orphaned_exception_has_no_effect() {
        let session = weekly_mondays();
        // Tuesday is never produced by a Monday series.
        let orphan = exception(&session, date(2024, 1, 9), ExceptionType::Modified, OccurrenceOverrides {
            title: Some("Ghost".to_string()),
            ..Default::default()
        });
        let resolved = resolve(&session, &[orphan], date(2024, 1, 1), date(2024, 1, 31), true).unwrap();
        assert!(resolved.iter().all(|o| o.title != "Ghost"));
    }

    #[test]
    fn test_cancelled_template_hides_everything_by_default() {
        let mut session = weekly_mondays();
        session.template.status = SessionStatus::Cancelled;
        assert!(resolve(&session, &[], date(2024, 1, 1), date(2024, 1, 31), false)
            .unwrap()
            .is_empty());
        assert_eq!(
            resolve(&session, &[], date(2024, 1, 1), date(2024, 1, 31), true).unwrap().len(),
            5
        );
    }

    #[test]
    fn test_window_membership_follows_effective_date() {
        let session = weekly_mondays();
        let moved = exception(
            &session,
            date(2024, 1, 29),
            ExceptionType::Rescheduled,
            OccurrenceOverrides {
                date: Some(date(2024, 2, 2)),
                ..Default::default()
            },
        );

        let january = resolve(&session, &[moved.clone()], date(2024, 1, 1), date(2024, 1, 31), false).unwrap();
        let effective: Vec<NaiveDate> = january.iter().map(|o| o.effective_date).collect();
        assert_eq!(
            effective,
            vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15), date(2024, 1, 22)]
        );

        let february = resolve(&session, &[moved], date(2024, 2, 1), date(2024, 2, 29), false).unwrap();
        assert_eq!(february.len(), 1);
        assert_eq!(february[0].effective_date, date(2024, 2, 2));
        assert_eq!(february[0].occurrence_date, date(2024, 1, 29));
    }
}
