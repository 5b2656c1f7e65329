use crate::error::CoreError;
use crate::models::{ExceptionType, OccurrenceException, OccurrenceOverrides, SessionTemplate};
use crate::recurrence;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ExceptionRepository for SqliteRepository {
    async fn find_exception(
        &self,
        template_id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<Option<OccurrenceException>, CoreError> {
        let exception = sqlx::query_as(
            "SELECT * FROM occurrence_exceptions WHERE template_id = $1 AND occurrence_date = $2",
        )
        .bind(template_id)
        .bind(occurrence_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(exception)
    }

    async fn find_exceptions_for_template(&self, template_id: Uuid) -> Result<Vec<OccurrenceException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM occurrence_exceptions WHERE template_id = $1 ORDER BY occurrence_date",
        )
        .bind(template_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn find_exceptions_on_or_after(
        &self,
        template_id: Uuid,
        on_or_after: NaiveDate,
    ) -> Result<Vec<OccurrenceException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM occurrence_exceptions
             WHERE template_id = $1 AND occurrence_date >= $2
             ORDER BY occurrence_date",
        )
        .bind(template_id)
        .bind(on_or_after)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn find_exceptions_for_templates(
        &self,
        template_ids: &[Uuid],
    ) -> Result<Vec<OccurrenceException>, CoreError> {
        if template_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM occurrence_exceptions WHERE template_id IN (");
        let mut separated = qb.separated(", ");
        for id in template_ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY template_id, occurrence_date");

        let exceptions = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(exceptions)
    }
}

impl SqliteRepository {
    pub async fn get_exception_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<Option<OccurrenceException>, CoreError> {
        let exception = sqlx::query_as(
            "SELECT * FROM occurrence_exceptions WHERE template_id = $1 AND occurrence_date = $2",
        )
        .bind(template_id)
        .bind(occurrence_date)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(exception)
    }

    /// Creates or replaces the exception for one occurrence.
    ///
    /// The date must be one the template currently produces; the key is always the
    /// original occurrence date, even when the overrides move it elsewhere.
    pub async fn upsert_exception_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template: &SessionTemplate,
        occurrence_date: NaiveDate,
        exception_type: ExceptionType,
        overrides: &OccurrenceOverrides,
    ) -> Result<OccurrenceException, CoreError> {
        if !recurrence::produces(template, occurrence_date)? {
            return Err(CoreError::OccurrenceNotInSeries {
                template_id: template.id,
                date: occurrence_date,
            });
        }

        let now = Utc::now();
        let exception = sqlx::query_as(
            r#"INSERT INTO occurrence_exceptions (
                template_id, occurrence_date, exception_type,
                override_date, override_start_time, override_end_time, override_title,
                override_description, override_location, override_coach_id,
                override_max_participants, override_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (template_id, occurrence_date) DO UPDATE SET
                exception_type = excluded.exception_type,
                override_date = excluded.override_date,
                override_start_time = excluded.override_start_time,
                override_end_time = excluded.override_end_time,
                override_title = excluded.override_title,
                override_description = excluded.override_description,
                override_location = excluded.override_location,
                override_coach_id = excluded.override_coach_id,
                override_max_participants = excluded.override_max_participants,
                override_status = excluded.override_status,
                updated_at = excluded.updated_at
            RETURNING *"#,
        )
        .bind(template.id)
        .bind(occurrence_date)
        .bind(exception_type)
        .bind(overrides.date)
        .bind(overrides.start_time)
        .bind(overrides.end_time)
        .bind(&overrides.title)
        .bind(&overrides.description)
        .bind(&overrides.location)
        .bind(overrides.coach_id)
        .bind(overrides.max_participants)
        .bind(overrides.status)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
        Ok(exception)
    }

    /// Removes the exception for one occurrence. Returns whether a row existed.
    pub async fn delete_exception_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            "DELETE FROM occurrence_exceptions WHERE template_id = $1 AND occurrence_date = $2",
        )
        .bind(template_id)
        .bind(occurrence_date)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_exceptions_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: Uuid,
    ) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM occurrence_exceptions WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_exceptions_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: Uuid,
    ) -> Result<Vec<OccurrenceException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM occurrence_exceptions WHERE template_id = $1 ORDER BY occurrence_date",
        )
        .bind(template_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(exceptions)
    }

    /// Moves every exception of `from_template` dated on or after `on_or_after` to
    /// `to_template`, keeping occurrence dates and overrides. Returns the number moved.
    pub async fn reassign_exceptions_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        from_template: Uuid,
        to_template: Uuid,
        on_or_after: NaiveDate,
    ) -> Result<u64, CoreError> {
        let result = sqlx::query(
            "UPDATE occurrence_exceptions SET template_id = $1, updated_at = $2
             WHERE template_id = $3 AND occurrence_date >= $4",
        )
        .bind(to_template)
        .bind(Utc::now())
        .bind(from_template)
        .bind(on_or_after)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
