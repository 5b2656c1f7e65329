//! Transactional edits of recurring sessions.
//!
//! Every operation takes the template lock as its first statement and runs inside the
//! caller's transaction, so a failure at any step leaves the series untouched once the
//! transaction is dropped.

use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    ExceptionType, OccurrenceException, OccurrenceOverrides, RecurrencePattern, Session, SessionChanges,
    SessionStatus, SessionTemplate, SplitOutcome,
};
use crate::recurrence::{self, Recurrence};
use crate::repository::SqliteRepository;

pub struct SeriesEditCoordinator;

impl SeriesEditCoordinator {
    /// Edits a single occurrence by creating or updating its exception.
    ///
    /// New overrides are merged over any existing exception for the date, then the
    /// exception type is derived from the merged record. Applying the same overrides
    /// twice leaves the same exception behind.
    pub async fn edit_this(
        tx: &mut Transaction<'_, Sqlite>,
        club_id: Uuid,
        template_id: Uuid,
        occurrence_date: NaiveDate,
        overrides: &OccurrenceOverrides,
    ) -> Result<OccurrenceException, CoreError> {
        if overrides.is_empty() {
            return Err(CoreError::Validation("no occurrence changes supplied".to_string()));
        }
        validate_overrides(overrides)?;

        let template = SqliteRepository::lock_template_in_transaction(tx, club_id, template_id).await?;
        ensure_not_cancelled(&template)?;
        if !recurrence::produces(&template, occurrence_date)? {
            return Err(CoreError::OccurrenceNotInSeries {
                template_id,
                date: occurrence_date,
            });
        }

        let merged = match SqliteRepository::get_exception_in_transaction(tx, template_id, occurrence_date).await? {
            Some(existing) => existing.overrides.merged_with(overrides),
            None => overrides.clone(),
        };

        let start_time = merged.start_time.unwrap_or(template.start_time);
        let end_time = merged.end_time.unwrap_or(template.end_time);
        if end_time <= start_time {
            return Err(CoreError::Validation(format!(
                "end time {} must be after start time {}",
                end_time, start_time
            )));
        }

        let exception_type = classify(&template, occurrence_date, &merged);
        debug!(%template_id, %occurrence_date, %exception_type, "upserting occurrence exception");

        SqliteRepository::upsert_exception_in_transaction(tx, &template, occurrence_date, exception_type, &merged)
            .await
    }

    /// Splits a series at `split_date`: the original (head) stops the day before, and a
    /// new template (tail) carrying `changes` produces every occurrence from the split on.
    ///
    /// Exceptions dated on or after the split move to the tail with their overrides
    /// intact. A head left with no occurrences is kept as a closed series, never deleted.
    pub async fn edit_future(
        tx: &mut Transaction<'_, Sqlite>,
        club_id: Uuid,
        template_id: Uuid,
        split_date: NaiveDate,
        changes: &SessionChanges,
    ) -> Result<SplitOutcome, CoreError> {
        if changes.is_empty() {
            return Err(CoreError::Validation("no series changes supplied".to_string()));
        }
        if changes.anchor_date.is_some() {
            return Err(CoreError::Validation(
                "the new series always starts on the split date; anchor date cannot be changed".to_string(),
            ));
        }
        if changes.is_recurring == Some(false) {
            return Err(CoreError::Validation(
                "cannot make the remainder of a series non-recurring; edit the occurrence instead".to_string(),
            ));
        }

        let mut head = SqliteRepository::lock_template_in_transaction(tx, club_id, template_id).await?;
        ensure_not_cancelled(&head)?;
        if !head.is_recurring {
            return Err(CoreError::Validation(
                "session is not recurring; edit the whole session instead".to_string(),
            ));
        }
        if split_date < head.anchor_date {
            return Err(CoreError::Validation(format!(
                "split date {} is before the series start {}",
                split_date, head.anchor_date
            )));
        }
        let head_recurrence = Recurrence::from_template(&head)?;
        if !head_recurrence.produces(split_date) {
            return Err(CoreError::OccurrenceNotInSeries {
                template_id,
                date: split_date,
            });
        }

        // Tail: clone of the head starting at the split date.
        let now = Utc::now();
        let mut tail = SessionTemplate {
            id: Uuid::now_v7(),
            anchor_date: split_date,
            recurrence_month_day: match head_recurrence {
                Recurrence::Repeating {
                    pattern: RecurrencePattern::Monthly,
                    month_day,
                    ..
                } => Some(month_day as i32),
                _ => None,
            },
            split_from_id: Some(head.id),
            lock_version: 0,
            created_at: now,
            updated_at: now,
            ..head.clone()
        };
        changes.apply_to(&mut tail);
        recurrence::validate_template(&tail)?;

        SqliteRepository::insert_template_in_transaction(tx, &tail).await?;
        debug!(head_id = %head.id, tail_id = %tail.id, %split_date, "inserted split tail");

        head.recurrence_end_date = split_date.pred_opt();
        let head = SqliteRepository::update_template_in_transaction(tx, &head).await?;
        debug!(head_id = %head.id, until = ?head.recurrence_end_date, "truncated split head");

        let migrated_exceptions =
            SqliteRepository::reassign_exceptions_in_transaction(tx, head.id, tail.id, split_date).await?;
        debug!(head_id = %head.id, tail_id = %tail.id, migrated_exceptions, "reassigned exceptions");

        let head_team_ids = SqliteRepository::find_team_ids_in_transaction(tx, head.id).await?;
        let tail_team_ids = SqliteRepository::replace_team_ids_in_transaction(
            tx,
            tail.id,
            changes.team_ids.as_deref().unwrap_or(&head_team_ids),
        )
        .await?;
        debug!(tail_id = %tail.id, teams = tail_team_ids.len(), "copied team associations");

        Ok(SplitOutcome {
            head: Session {
                template: head,
                team_ids: head_team_ids,
            },
            tail: Session {
                template: tail,
                team_ids: tail_team_ids,
            },
            migrated_exceptions,
        })
    }

    /// Applies `changes` to the template in place, past and future occurrences alike.
    ///
    /// Exceptions are left untouched. A recurrence change that would stop producing
    /// the date of an existing exception is rejected.
    pub async fn edit_all(
        tx: &mut Transaction<'_, Sqlite>,
        club_id: Uuid,
        template_id: Uuid,
        changes: &SessionChanges,
    ) -> Result<Session, CoreError> {
        if changes.is_empty() {
            return Err(CoreError::Validation("no series changes supplied".to_string()));
        }

        let current = SqliteRepository::lock_template_in_transaction(tx, club_id, template_id).await?;
        let reinstating = matches!(changes.status, Some(SessionStatus::Draft | SessionStatus::Scheduled));
        if current.status == SessionStatus::Cancelled && !reinstating {
            return Err(CoreError::SeriesAlreadyCancelled(template_id));
        }

        let mut updated = current.clone();
        changes.apply_to(&mut updated);
        recurrence::validate_template(&updated)?;

        if changes.touches_recurrence() {
            let recurrence = Recurrence::from_template(&updated)?;
            let orphaned: Vec<String> = SqliteRepository::list_exceptions_in_transaction(tx, template_id)
                .await?
                .into_iter()
                .filter(|exception| !recurrence.produces(exception.occurrence_date))
                .map(|exception| exception.occurrence_date.to_string())
                .collect();
            if !orphaned.is_empty() {
                return Err(CoreError::Validation(format!(
                    "recurrence change would orphan exceptions on {}; restore them first",
                    orphaned.join(", ")
                )));
            }
        }

        let template = SqliteRepository::update_template_in_transaction(tx, &updated).await?;
        let team_ids = match &changes.team_ids {
            Some(team_ids) => SqliteRepository::replace_team_ids_in_transaction(tx, template_id, team_ids).await?,
            None => SqliteRepository::find_team_ids_in_transaction(tx, template_id).await?,
        };
        debug!(%template_id, lock_version = template.lock_version, "updated series in place");

        Ok(Session { template, team_ids })
    }

    /// Removes the exception for one occurrence, restoring the template's fields.
    /// Returns whether an exception existed; restoring an unmodified occurrence is a no-op.
    pub async fn delete_exception(
        tx: &mut Transaction<'_, Sqlite>,
        club_id: Uuid,
        template_id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<bool, CoreError> {
        SqliteRepository::lock_template_in_transaction(tx, club_id, template_id).await?;
        let removed = SqliteRepository::delete_exception_in_transaction(tx, template_id, occurrence_date).await?;
        debug!(%template_id, %occurrence_date, removed, "restored occurrence");
        Ok(removed)
    }
}

fn ensure_not_cancelled(template: &SessionTemplate) -> Result<(), CoreError> {
    if template.status == SessionStatus::Cancelled {
        return Err(CoreError::SeriesAlreadyCancelled(template.id));
    }
    Ok(())
}

fn validate_overrides(overrides: &OccurrenceOverrides) -> Result<(), CoreError> {
    if let Some(title) = &overrides.title {
        if title.trim().is_empty() {
            return Err(CoreError::Validation("title must not be empty".to_string()));
        }
    }
    if let Some(max) = overrides.max_participants {
        if max < 0 {
            return Err(CoreError::Validation(
                "max participants must not be negative".to_string(),
            ));
        }
    }
    if overrides.status == Some(SessionStatus::Draft) {
        return Err(CoreError::Validation(
            "a single occurrence can only be scheduled or cancelled".to_string(),
        ));
    }
    Ok(())
}

/// Derives the exception type from the merged override record.
fn classify(template: &SessionTemplate, occurrence_date: NaiveDate, overrides: &OccurrenceOverrides) -> ExceptionType {
    if overrides.status == Some(SessionStatus::Cancelled) {
        return ExceptionType::Cancelled;
    }
    let moved = overrides.date.is_some_and(|date| date != occurrence_date);
    let retimed = overrides.start_time.is_some_and(|t| t != template.start_time)
        || overrides.end_time.is_some_and(|t| t != template.end_time);
    if moved || retimed {
        ExceptionType::Rescheduled
    } else {
        ExceptionType::Modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::tests::{date, template};
    use chrono::NaiveTime;
    use rstest::rstest;

    fn mondays() -> SessionTemplate {
        template(
            date(2024, 1, 1),
            Some(RecurrencePattern::Weekly),
            &[1],
            Some(date(2024, 1, 31)),
        )
    }

    #[rstest]
    #[case(OccurrenceOverrides { status: Some(SessionStatus::Cancelled), ..Default::default() }, ExceptionType::Cancelled)]
    #[case(OccurrenceOverrides { date: Some(date(2024, 1, 9)), ..Default::default() }, ExceptionType::Rescheduled)]
    #[case(OccurrenceOverrides { start_time: NaiveTime::from_hms_opt(17, 0, 0), ..Default::default() }, ExceptionType::Rescheduled)]
    #[case(OccurrenceOverrides { location: Some("Gym".into()), ..Default::default() }, ExceptionType::Modified)]
    #[case(OccurrenceOverrides { date: Some(date(2024, 1, 8)), ..Default::default() }, ExceptionType::Modified)]
    fn test_classify(#[case] overrides: OccurrenceOverrides, #[case] expected: ExceptionType) {
        assert_eq!(classify(&mondays(), date(2024, 1, 8), &overrides), expected);
    }

    #[test]
    fn test_cancelled_status_wins_over_reschedule() {
        let overrides = OccurrenceOverrides {
            date: Some(date(2024, 1, 9)),
            status: Some(SessionStatus::Cancelled),
            ..Default::default()
        };
        assert_eq!(classify(&mondays(), date(2024, 1, 8), &overrides), ExceptionType::Cancelled);
    }

    #[test]
    fn test_draft_override_rejected() {
        let overrides = OccurrenceOverrides {
            status: Some(SessionStatus::Draft),
            ..Default::default()
        };
        assert!(matches!(validate_overrides(&overrides), Err(CoreError::Validation(_))));
    }
}
