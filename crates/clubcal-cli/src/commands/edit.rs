use anyhow::{bail, Result};
use clubcal_core::models::{EditOutcome, EditScope, SessionChanges};
use clubcal_core::service::SchedulingService;
use dialoguer::Select;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::{EditCommand, SessionChangeArgs};
use crate::parser::{parse_date, parse_optional_date, parse_optional_time};
use crate::util::{resolve_session_id, short_id};

/// Turns a `--field`/`--field-clear` pair into the leave/clear/set triple.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

/// Builds the core change set from the shared `update`/`edit` flags.
pub fn build_changes(args: &SessionChangeArgs) -> Result<SessionChanges> {
    let team_ids = if args.teams_clear {
        Some(Vec::new())
    } else if args.teams.is_empty() {
        None
    } else {
        Some(args.teams.clone())
    };

    Ok(SessionChanges {
        title: args.title.clone(),
        description: clearable(args.description.clone(), args.description_clear),
        session_type: args.session_type.clone(),
        status: args.status,
        season_id: clearable(args.season, args.season_clear),
        anchor_date: parse_optional_date(args.date.as_deref())?,
        start_time: parse_optional_time(args.start.as_deref())?,
        end_time: parse_optional_time(args.end.as_deref())?,
        location: clearable(args.location.clone(), args.location_clear),
        coach_id: clearable(args.coach, args.coach_clear),
        max_participants: clearable(args.max, args.max_clear),
        is_recurring: if args.one_off { Some(false) } else { None },
        recurrence_pattern: args.every,
        recurrence_days: args.on_days,
        recurrence_end_date: parse_optional_date(args.until.as_deref())?,
        team_ids,
    })
}

pub async fn edit_session(service: &SchedulingService, club_id: Uuid, command: EditCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.id).await?;
    let session = service.get_session(club_id, id).await?;
    let changes = build_changes(&command.changes)?;
    if changes.is_empty() {
        bail!("No changes given. Pass at least one field to edit.");
    }

    let on = match command.on.as_deref() {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };

    let scope = if !session.template.is_recurring {
        EditScope::All
    } else if let Some(scope) = command.scope {
        scope
    } else {
        let scope_options = [
            match on {
                Some(date) => format!("This occurrence only ({})", date.format("%Y-%m-%d")),
                None => "This occurrence only".to_string(),
            },
            "This and future occurrences".to_string(),
            "Entire series".to_string(),
        ];

        println!("{}", "This session is part of a recurring series.".yellow());
        let selection = Select::new()
            .with_prompt("How would you like to apply your changes?")
            .items(&scope_options)
            .default(0)
            .interact()?;

        match selection {
            0 => EditScope::This,
            1 => EditScope::Future,
            _ => EditScope::All,
        }
    };

    let outcome = service.edit_with_scope(club_id, id, scope, on, changes).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    match outcome {
        EditOutcome::This(exception) => {
            println!(
                "{} Updated the occurrence on {}",
                "✓".style(success_style),
                exception.occurrence_date.format("%Y-%m-%d").bright_white().bold()
            );
            println!("  {} Exception: {}", "→".style(info_style), exception.exception_type);
        }
        EditOutcome::Future(split) => {
            println!(
                "{} Split {} at {}",
                "✓".style(success_style),
                split.head.template.title.bright_white().bold(),
                split.tail.template.anchor_date.format("%Y-%m-%d")
            );
            println!(
                "  {} Earlier occurrences stay on {}",
                "→".style(info_style),
                short_id(split.head.template.id).yellow()
            );
            println!(
                "  {} New series from here on: {}",
                "→".style(info_style),
                short_id(split.tail.template.id).yellow()
            );
            if split.migrated_exceptions > 0 {
                println!(
                    "  {} Moved {} exception(s) to the new series",
                    "→".style(info_style),
                    split.migrated_exceptions
                );
            }
        }
        EditOutcome::All(updated) => {
            let what = if updated.template.is_recurring { "series" } else { "session" };
            println!(
                "{} Updated {}: {}",
                "✓".style(success_style),
                what,
                updated.template.title.bright_white().bold()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn clear_flags_win_over_absent_values() {
        let args = SessionChangeArgs {
            location_clear: true,
            teams_clear: true,
            ..Default::default()
        };
        let changes = build_changes(&args).unwrap();
        assert_eq!(changes.location, Some(None));
        assert_eq!(changes.team_ids, Some(Vec::new()));
        assert_eq!(changes.description, None);
    }

    #[test]
    fn one_off_turns_recurrence_off() {
        let args = SessionChangeArgs {
            one_off: true,
            ..Default::default()
        };
        let changes = build_changes(&args).unwrap();
        assert_eq!(changes.is_recurring, Some(false));
        assert!(changes.touches_recurrence());
    }

    #[test]
    fn dates_and_times_are_parsed() {
        let args = SessionChangeArgs {
            date: Some("2025-03-04".to_string()),
            start: Some("19:30".to_string()),
            until: Some("2025-06-30".to_string()),
            ..Default::default()
        };
        let changes = build_changes(&args).unwrap();
        assert_eq!(changes.anchor_date, NaiveDate::from_ymd_opt(2025, 3, 4));
        assert_eq!(changes.start_time.map(|t| t.to_string()), Some("19:30:00".to_string()));
        assert_eq!(changes.recurrence_end_date, NaiveDate::from_ymd_opt(2025, 6, 30));
    }

    #[test]
    fn no_flags_means_no_changes() {
        let changes = build_changes(&SessionChangeArgs::default()).unwrap();
        assert!(changes.is_empty());
    }
}
