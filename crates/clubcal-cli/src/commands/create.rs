use anyhow::Result;
use clubcal_core::models::{NewSessionData, RecurrenceSpec, WeekdaySet};
use clubcal_core::service::SchedulingService;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::CreateCommand;
use crate::parser::{parse_date, parse_time};
use crate::util::short_id;
use crate::views::table::recurrence_summary;

pub async fn create_session(service: &SchedulingService, club_id: Uuid, command: CreateCommand) -> Result<()> {
    let anchor_date = parse_date(&command.date)?;
    let recurrence = match command.every {
        Some(pattern) => {
            // clap enforces --until alongside --every
            let until = command.until.as_deref().unwrap_or_default();
            Some(RecurrenceSpec {
                pattern,
                days: command.on.unwrap_or(WeekdaySet::EMPTY),
                end_date: parse_date(until)?,
            })
        }
        None => None,
    };

    let data = NewSessionData {
        season_id: command.season,
        title: command.title,
        description: command.description,
        session_type: command.session_type,
        status: command.status,
        anchor_date,
        start_time: parse_time(&command.start)?,
        end_time: parse_time(&command.end)?,
        location: command.location,
        coach_id: command.coach,
        max_participants: command.max,
        recurrence,
        team_ids: command.teams,
    };

    let session = service.create_session(club_id, data).await?;
    let template = &session.template;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    let kind = if template.is_recurring { "series" } else { "session" };
    println!(
        "{} Created {}: {}",
        "✓".style(success_style),
        kind,
        template.title.bright_white().bold()
    );
    println!("  {} ID: {}", "→".style(info_style), short_id(template.id).yellow());
    println!("  {} Schedule: {}", "→".style(info_style), recurrence_summary(template));
    println!("  {} Status: {}", "→".style(info_style), template.status);

    Ok(())
}
