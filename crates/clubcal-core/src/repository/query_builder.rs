use crate::query::{DateWindow, SessionFilter};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Utility functions for building SQL queries from listing filters
pub struct SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Build the `WHERE` clause for a template listing.
    ///
    /// The status filter applies to template rows only when the listing is not
    /// expanded; expanded listings filter on each occurrence's effective status
    /// instead, since an exception can override it.
    pub fn build_template_where_clause<'a>(
        club_id: Uuid,
        filter: &SessionFilter,
        window: Option<DateWindow>,
        filter_status: bool,
        qb: &mut QueryBuilder<'a, Sqlite>,
    ) {
        qb.push(" WHERE st.club_id = ");
        qb.push_bind(club_id);

        if let Some(team_id) = filter.team_id {
            qb.push(" AND st.id IN (SELECT template_id FROM session_teams WHERE team_id = ");
            qb.push_bind(team_id);
            qb.push(")");
        }

        if filter_status {
            if let Some(status) = filter.status {
                qb.push(" AND st.status = ");
                qb.push_bind(status);
            }
        }

        if let Some(window) = window {
            Self::build_window_clause(window, qb);
        }
    }

    /// Templates whose possible occurrence range overlaps the window, plus those
    /// with an occurrence rescheduled into it from outside that range.
    fn build_window_clause<'a>(window: DateWindow, qb: &mut QueryBuilder<'a, Sqlite>) {
        qb.push(" AND ((st.is_recurring = 0 AND st.anchor_date BETWEEN ");
        qb.push_bind(window.start);
        qb.push(" AND ");
        qb.push_bind(window.end);
        qb.push(") OR (st.is_recurring = 1 AND st.anchor_date <= ");
        qb.push_bind(window.end);
        qb.push(" AND st.recurrence_end_date >= ");
        qb.push_bind(window.start);
        qb.push(") OR st.id IN (SELECT template_id FROM occurrence_exceptions WHERE override_date BETWEEN ");
        qb.push_bind(window.start);
        qb.push(" AND ");
        qb.push_bind(window.end);
        qb.push("))");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use chrono::NaiveDate;

    #[test]
    fn test_where_clause_includes_requested_filters() {
        let filter = SessionFilter {
            team_id: Some(Uuid::nil()),
            status: Some(SessionStatus::Scheduled),
            ..Default::default()
        };
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT st.* FROM session_templates st");
        SqlQueryBuilder::build_template_where_clause(Uuid::nil(), &filter, Some(window), true, &mut qb);
        let sql = qb.sql();
        assert!(sql.contains("st.club_id = ?"));
        assert!(sql.contains("session_teams"));
        assert!(sql.contains("st.status = ?"));
        assert!(sql.contains("recurrence_end_date >= ?"));
        assert!(sql.contains("override_date BETWEEN ? AND ?"));
    }

    #[test]
    fn test_expanded_listing_skips_status_on_rows() {
        let filter = SessionFilter {
            status: Some(SessionStatus::Cancelled),
            ..Default::default()
        };
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT st.* FROM session_templates st");
        SqlQueryBuilder::build_template_where_clause(Uuid::nil(), &filter, None, false, &mut qb);
        assert!(!qb.sql().contains("st.status"));
    }
}
