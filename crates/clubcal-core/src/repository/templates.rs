use crate::error::CoreError;
use crate::models::{Session, SessionTemplate};
use crate::query::{DateWindow, SessionFilter};
use crate::repository::query_builder::SqlQueryBuilder;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
impl super::TemplateRepository for SqliteRepository {
    async fn find_session(&self, club_id: Uuid, id: Uuid) -> Result<Option<Session>, CoreError> {
        let template: Option<SessionTemplate> =
            sqlx::query_as("SELECT * FROM session_templates WHERE id = $1 AND club_id = $2")
                .bind(id)
                .bind(club_id)
                .fetch_optional(self.pool())
                .await?;

        let Some(template) = template else {
            return Ok(None);
        };

        let team_ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT team_id FROM session_teams WHERE template_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(Some(Session {
            template,
            team_ids: team_ids.into_iter().map(|(team_id,)| team_id).collect(),
        }))
    }

    async fn find_sessions(
        &self,
        club_id: Uuid,
        filter: &SessionFilter,
        window: Option<DateWindow>,
        filter_status: bool,
    ) -> Result<Vec<Session>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT st.* FROM session_templates st");
        SqlQueryBuilder::build_template_where_clause(club_id, filter, window, filter_status, &mut qb);
        qb.push(" ORDER BY st.anchor_date, st.start_time, st.id");

        let templates: Vec<SessionTemplate> = qb.build_query_as().fetch_all(self.pool()).await?;
        if templates.is_empty() {
            return Ok(Vec::new());
        }

        let mut teams_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT template_id, team_id FROM session_teams WHERE template_id IN (");
        let mut separated = teams_qb.separated(", ");
        for template in &templates {
            separated.push_bind(template.id);
        }
        teams_qb.push(") ORDER BY template_id, position");

        let links: Vec<(Uuid, Uuid)> = teams_qb.build_query_as().fetch_all(self.pool()).await?;
        let mut teams_by_template: HashMap<Uuid, Vec<Uuid>> = HashMap::with_capacity(templates.len());
        for (template_id, team_id) in links {
            teams_by_template.entry(template_id).or_default().push(team_id);
        }

        Ok(templates
            .into_iter()
            .map(|template| {
                let team_ids = teams_by_template.remove(&template.id).unwrap_or_default();
                Session { template, team_ids }
            })
            .collect())
    }

    async fn find_templates_by_short_id_prefix(
        &self,
        club_id: Uuid,
        short_id: &str,
    ) -> Result<Vec<SessionTemplate>, CoreError> {
        // Ids are stored as 16-byte blobs, so match on their hex rendering.
        let mut pattern: String = short_id
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        pattern.push('%');

        let templates = sqlx::query_as(
            "SELECT * FROM session_templates WHERE club_id = $1 AND lower(hex(id)) LIKE $2 ORDER BY anchor_date",
        )
        .bind(club_id)
        .bind(pattern)
        .fetch_all(self.pool())
        .await?;
        Ok(templates)
    }

    async fn find_split_successors(&self, club_id: Uuid, id: Uuid) -> Result<Vec<SessionTemplate>, CoreError> {
        let templates = sqlx::query_as(
            "SELECT * FROM session_templates WHERE club_id = $1 AND split_from_id = $2 ORDER BY anchor_date",
        )
        .bind(club_id)
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        Ok(templates)
    }
}

impl SqliteRepository {
    /// Takes the write lock on a template row and returns its current state.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`; bumping `lock_version` as the first
    /// statement of the transaction acquires the database write lock, which every
    /// other writer then waits on until commit or rollback. A lock wait that outlives
    /// the busy timeout surfaces as `ConcurrentModification`.
    pub async fn lock_template_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        club_id: Uuid,
        id: Uuid,
    ) -> Result<SessionTemplate, CoreError> {
        sqlx::query_as(
            "UPDATE session_templates SET lock_version = lock_version + 1
             WHERE id = $1 AND club_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(club_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Session with id {} not found", id)))
    }

    pub async fn insert_template_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template: &SessionTemplate,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO session_templates (
                id, club_id, season_id, title, description, session_type, status,
                anchor_date, start_time, end_time, location, coach_id, max_participants,
                is_recurring, recurrence_pattern, recurrence_days, recurrence_month_day,
                recurrence_end_date, split_from_id, lock_version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)"#,
        )
        .bind(template.id)
        .bind(template.club_id)
        .bind(template.season_id)
        .bind(&template.title)
        .bind(&template.description)
        .bind(&template.session_type)
        .bind(template.status)
        .bind(template.anchor_date)
        .bind(template.start_time)
        .bind(template.end_time)
        .bind(&template.location)
        .bind(template.coach_id)
        .bind(template.max_participants)
        .bind(template.is_recurring)
        .bind(template.recurrence_pattern)
        .bind(template.recurrence_days)
        .bind(template.recurrence_month_day)
        .bind(template.recurrence_end_date)
        .bind(template.split_from_id)
        .bind(template.lock_version)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Writes every mutable column of `template` and returns the stored row.
    pub async fn update_template_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template: &SessionTemplate,
    ) -> Result<SessionTemplate, CoreError> {
        sqlx::query_as(
            r#"UPDATE session_templates SET
                season_id = $1, title = $2, description = $3, session_type = $4, status = $5,
                anchor_date = $6, start_time = $7, end_time = $8, location = $9, coach_id = $10,
                max_participants = $11, is_recurring = $12, recurrence_pattern = $13,
                recurrence_days = $14, recurrence_month_day = $15, recurrence_end_date = $16,
                updated_at = $17
            WHERE id = $18 AND club_id = $19
            RETURNING *"#,
        )
        .bind(template.season_id)
        .bind(&template.title)
        .bind(&template.description)
        .bind(&template.session_type)
        .bind(template.status)
        .bind(template.anchor_date)
        .bind(template.start_time)
        .bind(template.end_time)
        .bind(&template.location)
        .bind(template.coach_id)
        .bind(template.max_participants)
        .bind(template.is_recurring)
        .bind(template.recurrence_pattern)
        .bind(template.recurrence_days)
        .bind(template.recurrence_month_day)
        .bind(template.recurrence_end_date)
        .bind(Utc::now())
        .bind(template.id)
        .bind(template.club_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Session with id {} not found", template.id)))
    }

    /// Deletes a template after its exceptions and team links.
    pub async fn delete_template_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        club_id: Uuid,
        id: Uuid,
    ) -> Result<(), CoreError> {
        Self::delete_all_exceptions_in_transaction(tx, id).await?;

        sqlx::query("DELETE FROM session_teams WHERE template_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        let result = sqlx::query("DELETE FROM session_templates WHERE id = $1 AND club_id = $2")
            .bind(id)
            .bind(club_id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Session with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn find_team_ids_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: Uuid,
    ) -> Result<Vec<Uuid>, CoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT team_id FROM session_teams WHERE template_id = $1 ORDER BY position",
        )
        .bind(template_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(team_id,)| team_id).collect())
    }

    /// Replaces the ordered team set of a template. Duplicate ids keep their first position.
    pub async fn replace_team_ids_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: Uuid,
        team_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, CoreError> {
        sqlx::query("DELETE FROM session_teams WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;

        let ordered = dedup_preserving_order(team_ids);
        for (position, team_id) in ordered.iter().enumerate() {
            sqlx::query("INSERT INTO session_teams (template_id, team_id, position) VALUES ($1, $2, $3)")
                .bind(template_id)
                .bind(team_id)
                .bind(position as i64)
                .execute(&mut **tx)
                .await?;
        }
        Ok(ordered)
    }
}

fn dedup_preserving_order(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_preserving_order() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(dedup_preserving_order(&[b, a, b]), vec![b, a]);
    }
}
