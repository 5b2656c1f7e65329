//! The scheduling facade: the single entry point for callers.
//!
//! Reads go through the repository traits and the pure resolver. Every mutating call
//! opens one transaction, delegates to the [`SeriesEditCoordinator`] or the repository
//! helpers, and commits; any error drops the transaction and rolls it back.

use chrono::{Duration, Local, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::coordinator::SeriesEditCoordinator;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    EditOutcome, EditScope, NewSessionData, OccurrenceException, OccurrenceOverrides, SchedulingConfig,
    Session, SessionChanges, SessionStatus, SessionTemplate, SplitOutcome, VirtualOccurrence,
    WeekdaySet,
};
use crate::query::{DateWindow, Listing, SessionFilter};
use crate::recurrence;
use crate::repository::{ExceptionRepository, SqliteRepository, TemplateRepository};
use crate::resolver;

#[derive(Clone)]
pub struct SchedulingService {
    repo: SqliteRepository,
    config: SchedulingConfig,
}

impl SchedulingService {
    pub fn new(pool: DbPool, config: SchedulingConfig) -> Self {
        Self {
            repo: SqliteRepository::new(pool),
            config,
        }
    }

    pub fn repository(&self) -> &SqliteRepository {
        &self.repo
    }

    /// Creates a one-off session, or a recurring series when `data.recurrence` is set.
    #[tracing::instrument(skip(self, data), fields(title = %data.title, anchor = %data.anchor_date))]
    pub async fn create_session(&self, club_id: Uuid, data: NewSessionData) -> Result<Session, CoreError> {
        let now = Utc::now();
        let (is_recurring, recurrence_pattern, recurrence_days, recurrence_end_date) = match &data.recurrence {
            Some(spec) => (true, Some(spec.pattern), spec.days, Some(spec.end_date)),
            None => (false, None, WeekdaySet::EMPTY, None),
        };

        let template = SessionTemplate {
            id: Uuid::now_v7(),
            club_id,
            season_id: data.season_id,
            title: data.title,
            description: data.description,
            session_type: data.session_type,
            status: data.status.unwrap_or(SessionStatus::Draft),
            anchor_date: data.anchor_date,
            start_time: data.start_time,
            end_time: data.end_time,
            location: data.location,
            coach_id: data.coach_id,
            max_participants: data.max_participants,
            is_recurring,
            recurrence_pattern,
            recurrence_days,
            recurrence_month_day: None,
            recurrence_end_date,
            split_from_id: None,
            lock_version: 0,
            created_at: now,
            updated_at: now,
        };
        recurrence::validate_template(&template)?;

        let mut tx = self.repo.pool().begin().await?;
        SqliteRepository::insert_template_in_transaction(&mut tx, &template).await?;
        let team_ids = SqliteRepository::replace_team_ids_in_transaction(&mut tx, template.id, &data.team_ids).await?;
        tx.commit().await?;

        info!(session_id = %template.id, "created session");
        Ok(Session { template, team_ids })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_session(&self, club_id: Uuid, id: Uuid) -> Result<Session, CoreError> {
        self.repo
            .find_session(club_id, id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Session with id {} not found", id)))
    }

    /// Resolves a full id or an unambiguous hex prefix of at least two characters.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_session_id(&self, club_id: Uuid, id_or_prefix: &str) -> Result<Uuid, CoreError> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return Ok(id);
        }
        let prefix = id_or_prefix.trim();
        if prefix.len() < 2 || !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(CoreError::Validation(format!(
                "'{}' is not a session ID or an ID prefix of at least 2 hex characters",
                id_or_prefix
            )));
        }

        let mut matches = self.repo.find_templates_by_short_id_prefix(club_id, prefix).await?;
        match matches.len() {
            0 => Err(CoreError::NotFound(format!("No session found with ID prefix '{}'", prefix))),
            1 => Ok(matches.remove(0).id),
            _ => Err(CoreError::AmbiguousId(
                matches
                    .into_iter()
                    .map(|template| (template.id.to_string(), template.title))
                    .collect(),
            )),
        }
    }

    /// Lists sessions of a club. Unexpanded listings return template rows; expanded
    /// listings return resolved occurrences over the requested window.
    #[tracing::instrument(skip(self))]
    pub async fn list_occurrences(
        &self,
        club_id: Uuid,
        filter: &SessionFilter,
        expand: bool,
    ) -> Result<Listing, CoreError> {
        let today = Local::now().date_naive();
        if expand {
            let window = self.listing_window(filter, today)?;
            Ok(Listing::Occurrences(self.resolve_window(club_id, filter, window).await?))
        } else {
            let window = if filter.from_date.is_some() || filter.to_date.is_some() {
                Some(self.listing_window(filter, today)?)
            } else {
                None
            };
            Ok(Listing::Sessions(self.repo.find_sessions(club_id, filter, window, true).await?))
        }
    }

    /// The window a listing covers: `from_date` defaults to `today`, `to_date` to the
    /// configured default length, and anything longer than the maximum is clamped.
    pub fn listing_window(&self, filter: &SessionFilter, today: NaiveDate) -> Result<DateWindow, CoreError> {
        let start = filter.from_date.unwrap_or(today);
        let end = filter
            .to_date
            .unwrap_or(start + Duration::days(self.config.default_window_days as i64));
        if end < start {
            return Err(CoreError::Validation(format!(
                "to date {} is before from date {}",
                end, start
            )));
        }
        let max_end = start + Duration::days(self.config.max_window_days as i64);
        Ok(DateWindow::new(start, end.min(max_end)))
    }

    /// Resolved occurrences of every matching session inside `window`, merged and
    /// ordered by effective date and start time.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_window(
        &self,
        club_id: Uuid,
        filter: &SessionFilter,
        window: DateWindow,
    ) -> Result<Vec<VirtualOccurrence>, CoreError> {
        let sessions = self.repo.find_sessions(club_id, filter, Some(window), false).await?;
        let template_ids: Vec<Uuid> = sessions.iter().map(|s| s.template.id).collect();

        let mut exceptions_by_template: HashMap<Uuid, Vec<OccurrenceException>> = HashMap::new();
        for exception in self.repo.find_exceptions_for_templates(&template_ids).await? {
            exceptions_by_template
                .entry(exception.template_id)
                .or_default()
                .push(exception);
        }

        let include_cancelled = filter.include_cancelled || filter.status == Some(SessionStatus::Cancelled);
        let mut occurrences = Vec::new();
        for session in &sessions {
            let exceptions = exceptions_by_template
                .get(&session.template.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            occurrences.extend(resolver::resolve(
                session,
                exceptions,
                window.start,
                window.end,
                include_cancelled,
            )?);
        }
        if let Some(status) = filter.status {
            occurrences.retain(|occurrence| occurrence.status == status);
        }
        resolver::sort_occurrences(&mut occurrences);
        Ok(occurrences)
    }

    /// Same as [`edit_all`](Self::edit_all); the plain update entry point.
    pub async fn update_session(
        &self,
        club_id: Uuid,
        id: Uuid,
        changes: SessionChanges,
    ) -> Result<Session, CoreError> {
        self.edit_all(club_id, id, changes).await
    }

    /// Moves a draft session to scheduled. Publishing a scheduled session is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn publish_session(&self, club_id: Uuid, id: Uuid) -> Result<Session, CoreError> {
        let mut tx = self.repo.pool().begin().await?;
        let mut template = SqliteRepository::lock_template_in_transaction(&mut tx, club_id, id).await?;
        match template.status {
            SessionStatus::Cancelled => return Err(CoreError::SeriesAlreadyCancelled(id)),
            SessionStatus::Scheduled => {}
            SessionStatus::Draft => {
                template.status = SessionStatus::Scheduled;
                template = SqliteRepository::update_template_in_transaction(&mut tx, &template).await?;
                info!(session_id = %id, "published session");
            }
        }
        let team_ids = SqliteRepository::find_team_ids_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(Session { template, team_ids })
    }

    /// Deletes a session with its exceptions and team links.
    #[tracing::instrument(skip(self))]
    pub async fn delete_session(&self, club_id: Uuid, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.repo.pool().begin().await?;
        SqliteRepository::lock_template_in_transaction(&mut tx, club_id, id).await?;
        SqliteRepository::delete_template_in_transaction(&mut tx, club_id, id).await?;
        tx.commit().await?;
        info!(session_id = %id, "deleted session");
        Ok(())
    }

    #[tracing::instrument(skip(self, overrides))]
    pub async fn edit_this(
        &self,
        club_id: Uuid,
        id: Uuid,
        occurrence_date: NaiveDate,
        overrides: OccurrenceOverrides,
    ) -> Result<OccurrenceException, CoreError> {
        let mut tx = self.repo.pool().begin().await?;
        let exception = SeriesEditCoordinator::edit_this(&mut tx, club_id, id, occurrence_date, &overrides).await?;
        tx.commit().await?;
        info!(session_id = %id, %occurrence_date, exception_type = %exception.exception_type, "edited occurrence");
        Ok(exception)
    }

    pub async fn cancel_occurrence(
        &self,
        club_id: Uuid,
        id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<OccurrenceException, CoreError> {
        let overrides = OccurrenceOverrides {
            status: Some(SessionStatus::Cancelled),
            ..Default::default()
        };
        self.edit_this(club_id, id, occurrence_date, overrides).await
    }

    /// Moves one occurrence to another date and/or time.
    pub async fn reschedule_occurrence(
        &self,
        club_id: Uuid,
        id: Uuid,
        occurrence_date: NaiveDate,
        new_date: Option<NaiveDate>,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<OccurrenceException, CoreError> {
        if new_date.is_none() && start_time.is_none() && end_time.is_none() {
            return Err(CoreError::Validation(
                "reschedule needs a new date, start time or end time".to_string(),
            ));
        }
        let overrides = OccurrenceOverrides {
            date: new_date,
            start_time,
            end_time,
            ..Default::default()
        };
        self.edit_this(club_id, id, occurrence_date, overrides).await
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn edit_future(
        &self,
        club_id: Uuid,
        id: Uuid,
        split_date: NaiveDate,
        changes: SessionChanges,
    ) -> Result<SplitOutcome, CoreError> {
        let mut tx = self.repo.pool().begin().await?;
        let outcome = SeriesEditCoordinator::edit_future(&mut tx, club_id, id, split_date, &changes).await?;
        tx.commit().await?;
        info!(
            head_id = %outcome.head.template.id,
            tail_id = %outcome.tail.template.id,
            migrated = outcome.migrated_exceptions,
            "split series"
        );
        Ok(outcome)
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn edit_all(&self, club_id: Uuid, id: Uuid, changes: SessionChanges) -> Result<Session, CoreError> {
        let mut tx = self.repo.pool().begin().await?;
        let session = SeriesEditCoordinator::edit_all(&mut tx, club_id, id, &changes).await?;
        tx.commit().await?;
        info!(session_id = %id, "edited series");
        Ok(session)
    }

    /// Restores an occurrence to the template's fields. Returns whether anything was removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_exception(
        &self,
        club_id: Uuid,
        id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<bool, CoreError> {
        let mut tx = self.repo.pool().begin().await?;
        let removed = SeriesEditCoordinator::delete_exception(&mut tx, club_id, id, occurrence_date).await?;
        tx.commit().await?;
        if removed {
            info!(session_id = %id, %occurrence_date, "restored occurrence");
        }
        Ok(removed)
    }

    /// Dispatches an edit by scope. `on` names the occurrence for the `this` and
    /// `future` scopes and is ignored for `all`.
    #[tracing::instrument(skip(self, changes))]
    pub async fn edit_with_scope(
        &self,
        club_id: Uuid,
        id: Uuid,
        scope: EditScope,
        on: Option<NaiveDate>,
        changes: SessionChanges,
    ) -> Result<EditOutcome, CoreError> {
        let occurrence_date = || {
            on.ok_or_else(|| CoreError::Validation(format!("the '{}' scope needs an occurrence date", scope)))
        };
        match scope {
            EditScope::This => {
                let overrides = occurrence_overrides(&changes)?;
                let exception = self.edit_this(club_id, id, occurrence_date()?, overrides).await?;
                Ok(EditOutcome::This(exception))
            }
            EditScope::Future => {
                let outcome = self.edit_future(club_id, id, occurrence_date()?, changes).await?;
                Ok(EditOutcome::Future(outcome))
            }
            EditScope::All => Ok(EditOutcome::All(self.edit_all(club_id, id, changes).await?)),
        }
    }

    /// Exceptions of a session, ordered by occurrence date.
    #[tracing::instrument(skip(self))]
    pub async fn list_exceptions(&self, club_id: Uuid, id: Uuid) -> Result<Vec<OccurrenceException>, CoreError> {
        self.get_session(club_id, id).await?;
        self.repo.find_exceptions_for_template(id).await
    }

    /// Templates split off from `id` by "this and future" edits.
    pub async fn split_successors(&self, club_id: Uuid, id: Uuid) -> Result<Vec<SessionTemplate>, CoreError> {
        self.repo.find_split_successors(club_id, id).await
    }
}

/// Maps template-level changes onto a single-occurrence override record.
///
/// Only fields an occurrence can override are accepted; a new anchor date becomes
/// the occurrence's new date.
fn occurrence_overrides(changes: &SessionChanges) -> Result<OccurrenceOverrides, CoreError> {
    let unsupported = changes.is_recurring.is_some()
        || changes.recurrence_pattern.is_some()
        || changes.recurrence_days.is_some()
        || changes.recurrence_end_date.is_some()
        || changes.session_type.is_some()
        || changes.season_id.is_some()
        || changes.team_ids.is_some();
    if unsupported {
        return Err(CoreError::Validation(
            "a single occurrence cannot change its recurrence, type, season or teams".to_string(),
        ));
    }

    let cleared = matches!(changes.description, Some(None))
        || matches!(changes.location, Some(None))
        || matches!(changes.coach_id, Some(None))
        || matches!(changes.max_participants, Some(None));
    if cleared {
        return Err(CoreError::Validation(
            "a single occurrence can override fields but not clear them".to_string(),
        ));
    }

    Ok(OccurrenceOverrides {
        date: changes.anchor_date,
        start_time: changes.start_time,
        end_time: changes.end_time,
        title: changes.title.clone(),
        description: changes.description.clone().flatten(),
        location: changes.location.clone().flatten(),
        coach_id: changes.coach_id.flatten(),
        max_participants: changes.max_participants.flatten(),
        status: changes.status,
    })
}
