use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{OccurrenceException, Session, SessionTemplate};
use crate::query::{DateWindow, SessionFilter};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

pub mod exceptions;
pub mod query_builder;
pub mod templates;

/// Read access to session templates. Writes go through the `*_in_transaction`
/// helpers so the caller owns the transaction boundary.
#[async_trait]
pub trait TemplateRepository {
    async fn find_session(&self, club_id: Uuid, id: Uuid) -> Result<Option<Session>, CoreError>;
    /// Templates matching `filter` that can have an occurrence inside `window`.
    /// `filter_status` applies `filter.status` to the template rows; expanded
    /// listings leave it off and filter each occurrence's effective status instead.
    async fn find_sessions(
        &self,
        club_id: Uuid,
        filter: &SessionFilter,
        window: Option<DateWindow>,
        filter_status: bool,
    ) -> Result<Vec<Session>, CoreError>;
    async fn find_templates_by_short_id_prefix(
        &self,
        club_id: Uuid,
        short_id: &str,
    ) -> Result<Vec<SessionTemplate>, CoreError>;
    async fn find_split_successors(&self, club_id: Uuid, id: Uuid) -> Result<Vec<SessionTemplate>, CoreError>;
}

/// Read access to the exception store.
#[async_trait]
pub trait ExceptionRepository {
    async fn find_exception(
        &self,
        template_id: Uuid,
        occurrence_date: NaiveDate,
    ) -> Result<Option<OccurrenceException>, CoreError>;
    async fn find_exceptions_for_template(&self, template_id: Uuid) -> Result<Vec<OccurrenceException>, CoreError>;
    async fn find_exceptions_on_or_after(
        &self,
        template_id: Uuid,
        on_or_after: NaiveDate,
    ) -> Result<Vec<OccurrenceException>, CoreError>;
    async fn find_exceptions_for_templates(
        &self,
        template_ids: &[Uuid],
    ) -> Result<Vec<OccurrenceException>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository: TemplateRepository + ExceptionRepository {}

/// SQLite implementation of the repository pattern
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}
