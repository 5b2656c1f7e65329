use chrono::{Local, NaiveDate, NaiveTime};
use chrono_humanize::HumanTime;
use clubcal_core::models::{
    ExceptionType, OccurrenceException, Session, SessionStatus, SessionTemplate, VirtualOccurrence,
};
use comfy_table::{Attribute, Cell, Color, Row, Table};

use crate::util::short_id;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn display_sessions(sessions: &[Session]) {
    if sessions.is_empty() {
        println!("No sessions found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Type", "Status", "Date", "Time", "Recurrence", "Location"]);

    for session in sessions {
        let template = &session.template;
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(template.id)));

        let mut title = String::new();
        if template.is_recurring {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(&template.title);
        row.add_cell(status_styled(Cell::new(title), template.status));

        row.add_cell(Cell::new(&template.session_type));
        row.add_cell(status_cell(template.status));
        row.add_cell(Cell::new(template.anchor_date.to_string()));
        row.add_cell(Cell::new(time_range(template.start_time, template.end_time)));
        row.add_cell(Cell::new(recurrence_summary(template)));
        row.add_cell(Cell::new(template.location.as_deref().unwrap_or("-")));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_occurrences(occurrences: &[VirtualOccurrence]) {
    if occurrences.is_empty() {
        println!("No occurrences in this window.");
        return;
    }

    let today = Local::now().date_naive();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "When", "Time", "Title", "Status", "Location", "Note"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(occurrence.template_id)));

        let date_cell = Cell::new(occurrence.effective_date.format("%a %Y-%m-%d").to_string());
        row.add_cell(if occurrence.effective_date == today {
            date_cell.fg(Color::Yellow).add_attribute(Attribute::Bold)
        } else {
            date_cell
        });
        row.add_cell(Cell::new(relative_day(occurrence.effective_date, occurrence.start_time)));
        row.add_cell(Cell::new(time_range(occurrence.start_time, occurrence.end_time)));
        row.add_cell(status_styled(Cell::new(&occurrence.title), occurrence.status));
        row.add_cell(status_cell(occurrence.status));
        row.add_cell(Cell::new(occurrence.location.as_deref().unwrap_or("-")));
        row.add_cell(Cell::new(exception_note(occurrence)));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_session(session: &Session, exceptions: &[OccurrenceException], successors: &[SessionTemplate]) {
    let template = &session.template;
    let mut table = Table::new();
    table.add_row(vec![Cell::new("ID").add_attribute(Attribute::Bold), Cell::new(template.id)]);
    table.add_row(vec![Cell::new("Title").add_attribute(Attribute::Bold), Cell::new(&template.title)]);
    table.add_row(vec![Cell::new("Type").add_attribute(Attribute::Bold), Cell::new(&template.session_type)]);
    table.add_row(vec![Cell::new("Status").add_attribute(Attribute::Bold), status_cell(template.status)]);
    table.add_row(vec![
        Cell::new("Date").add_attribute(Attribute::Bold),
        Cell::new(template.anchor_date),
    ]);
    table.add_row(vec![
        Cell::new("Time").add_attribute(Attribute::Bold),
        Cell::new(time_range(template.start_time, template.end_time)),
    ]);
    table.add_row(vec![
        Cell::new("Recurrence").add_attribute(Attribute::Bold),
        Cell::new(recurrence_summary(template)),
    ]);
    if let Some(description) = &template.description {
        table.add_row(vec![Cell::new("Description").add_attribute(Attribute::Bold), Cell::new(description)]);
    }
    if let Some(location) = &template.location {
        table.add_row(vec![Cell::new("Location").add_attribute(Attribute::Bold), Cell::new(location)]);
    }
    if let Some(coach_id) = template.coach_id {
        table.add_row(vec![Cell::new("Coach").add_attribute(Attribute::Bold), Cell::new(coach_id)]);
    }
    if let Some(max) = template.max_participants {
        table.add_row(vec![Cell::new("Max participants").add_attribute(Attribute::Bold), Cell::new(max)]);
    }
    if !session.team_ids.is_empty() {
        let teams: Vec<String> = session.team_ids.iter().map(|id| id.to_string()).collect();
        table.add_row(vec![Cell::new("Teams").add_attribute(Attribute::Bold), Cell::new(teams.join("\n"))]);
    }
    if let Some(head) = template.split_from_id {
        table.add_row(vec![Cell::new("Split from").add_attribute(Attribute::Bold), Cell::new(head)]);
    }
    for successor in successors {
        table.add_row(vec![
            Cell::new("Continued by").add_attribute(Attribute::Bold),
            Cell::new(format!("{} from {}", successor.id, successor.anchor_date)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Updated").add_attribute(Attribute::Bold),
        Cell::new(HumanTime::from(template.updated_at).to_string()),
    ]);
    println!("{table}");

    if exceptions.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Occurrence", "Type", "Overrides"]);
    for exception in exceptions {
        table.add_row(vec![
            Cell::new(exception.occurrence_date),
            exception_type_cell(exception.exception_type),
            Cell::new(override_summary(exception)),
        ]);
    }
    println!("{table}");
}

/// One-line description of a template's schedule, e.g. `weekly on Mon, Wed until 2024-01-31`.
pub fn recurrence_summary(template: &SessionTemplate) -> String {
    let Some(pattern) = template.recurrence_pattern.filter(|_| template.is_recurring) else {
        return "one-off".to_string();
    };

    let mut summary = pattern.to_string();
    if pattern.uses_weekdays() {
        let days: Vec<&str> = template
            .recurrence_days
            .ordinals()
            .into_iter()
            .map(|ordinal| WEEKDAY_NAMES[ordinal as usize])
            .collect();
        summary.push_str(&format!(" on {}", days.join(", ")));
    }
    if let Some(until) = template.recurrence_end_date {
        if until < template.anchor_date {
            summary.push_str(" (ended)");
        } else {
            summary.push_str(&format!(" until {}", until));
        }
    }
    summary
}

fn override_summary(exception: &OccurrenceException) -> String {
    let o = &exception.overrides;
    let mut parts = Vec::new();
    if let Some(date) = o.date {
        parts.push(format!("date={}", date));
    }
    if let Some(start) = o.start_time {
        parts.push(format!("start={}", start.format("%H:%M")));
    }
    if let Some(end) = o.end_time {
        parts.push(format!("end={}", end.format("%H:%M")));
    }
    if let Some(title) = &o.title {
        parts.push(format!("title={}", title));
    }
    if let Some(description) = &o.description {
        parts.push(format!("description={}", description));
    }
    if let Some(location) = &o.location {
        parts.push(format!("location={}", location));
    }
    if let Some(coach_id) = o.coach_id {
        parts.push(format!("coach={}", short_id(coach_id)));
    }
    if let Some(max) = o.max_participants {
        parts.push(format!("max={}", max));
    }
    if let Some(status) = o.status {
        parts.push(format!("status={}", status));
    }
    parts.join(", ")
}

fn exception_note(occurrence: &VirtualOccurrence) -> String {
    match occurrence.exception_type {
        Some(ExceptionType::Rescheduled) if occurrence.effective_date != occurrence.occurrence_date => {
            format!("moved from {}", occurrence.occurrence_date)
        }
        Some(exception_type) => exception_type.to_string(),
        None => String::new(),
    }
}

fn relative_day(date: NaiveDate, start: NaiveTime) -> String {
    let now = Local::now().naive_local();
    HumanTime::from(date.and_time(start) - now).to_string()
}

fn time_range(start: NaiveTime, end: NaiveTime) -> String {
    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

fn status_cell(status: SessionStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        SessionStatus::Draft => cell.fg(Color::DarkGrey),
        SessionStatus::Scheduled => cell.fg(Color::Green),
        SessionStatus::Cancelled => cell.fg(Color::Red),
    }
}

fn status_styled(cell: Cell, status: SessionStatus) -> Cell {
    match status {
        SessionStatus::Cancelled => cell.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey),
        SessionStatus::Draft => cell.add_attribute(Attribute::Italic),
        SessionStatus::Scheduled => cell,
    }
}

fn exception_type_cell(exception_type: ExceptionType) -> Cell {
    let cell = Cell::new(exception_type);
    match exception_type {
        ExceptionType::Cancelled => cell.fg(Color::Red),
        ExceptionType::Rescheduled => cell.fg(Color::Yellow),
        ExceptionType::Modified => cell.fg(Color::Cyan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clubcal_core::models::{RecurrencePattern, WeekdaySet};
    use uuid::Uuid;

    fn template(pattern: Option<RecurrencePattern>, days: &[u8]) -> SessionTemplate {
        SessionTemplate {
            id: Uuid::now_v7(),
            club_id: Uuid::nil(),
            season_id: None,
            title: "U10 Training".to_string(),
            description: None,
            session_type: "training".to_string(),
            status: SessionStatus::Scheduled,
            anchor_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            location: None,
            coach_id: None,
            max_participants: None,
            is_recurring: pattern.is_some(),
            recurrence_pattern: pattern,
            recurrence_days: WeekdaySet::from_ordinals(days.iter().copied()).unwrap(),
            recurrence_month_day: None,
            recurrence_end_date: pattern.map(|_| NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            split_from_id: None,
            lock_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recurrence_summary() {
        assert_eq!(recurrence_summary(&template(None, &[])), "one-off");
        assert_eq!(
            recurrence_summary(&template(Some(RecurrencePattern::Weekly), &[1, 3])),
            "weekly on Mon, Wed until 2024-01-31"
        );
        assert_eq!(
            recurrence_summary(&template(Some(RecurrencePattern::Monthly), &[])),
            "monthly until 2024-01-31"
        );
    }

    #[test]
    fn test_time_range() {
        assert_eq!(
            time_range(NaiveTime::from_hms_opt(9, 5, 0).unwrap(), NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            "09:05-10:00"
        );
    }
}
