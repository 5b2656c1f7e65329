use anyhow::Result;
use clubcal_core::models::{OccurrenceException, OccurrenceOverrides};
use clubcal_core::service::SchedulingService;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::{OccurrenceCommand, OccurrenceEditCommand, OccurrenceRef, RescheduleCommand};
use crate::parser::{parse_date, parse_optional_date, parse_optional_time};
use crate::util::resolve_session_id;

pub async fn handle_occurrence(service: &SchedulingService, club_id: Uuid, command: OccurrenceCommand) -> Result<()> {
    match command {
        OccurrenceCommand::Cancel(occurrence) => cancel(service, club_id, occurrence).await,
        OccurrenceCommand::Reschedule(command) => reschedule(service, club_id, command).await,
        OccurrenceCommand::Edit(command) => edit(service, club_id, command).await,
        OccurrenceCommand::Restore(occurrence) => restore(service, club_id, occurrence).await,
    }
}

async fn cancel(service: &SchedulingService, club_id: Uuid, occurrence: OccurrenceRef) -> Result<()> {
    let id = resolve_session_id(service, club_id, &occurrence.id).await?;
    let date = parse_date(&occurrence.date)?;
    let exception = service.cancel_occurrence(club_id, id, date).await?;
    report("Cancelled", &exception);
    Ok(())
}

async fn reschedule(service: &SchedulingService, club_id: Uuid, command: RescheduleCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.occurrence.id).await?;
    let date = parse_date(&command.occurrence.date)?;
    let exception = service
        .reschedule_occurrence(
            club_id,
            id,
            date,
            parse_optional_date(command.to.as_deref())?,
            parse_optional_time(command.start.as_deref())?,
            parse_optional_time(command.end.as_deref())?,
        )
        .await?;
    report("Rescheduled", &exception);
    Ok(())
}

async fn edit(service: &SchedulingService, club_id: Uuid, command: OccurrenceEditCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.occurrence.id).await?;
    let date = parse_date(&command.occurrence.date)?;
    let overrides = OccurrenceOverrides {
        date: None,
        start_time: parse_optional_time(command.start.as_deref())?,
        end_time: parse_optional_time(command.end.as_deref())?,
        title: command.title,
        description: command.description,
        location: command.location,
        coach_id: command.coach,
        max_participants: command.max,
        status: command.status,
    };
    let exception = service.edit_this(club_id, id, date, overrides).await?;
    report("Updated", &exception);
    Ok(())
}

async fn restore(service: &SchedulingService, club_id: Uuid, occurrence: OccurrenceRef) -> Result<()> {
    let id = resolve_session_id(service, club_id, &occurrence.id).await?;
    let date = parse_date(&occurrence.date)?;
    let removed = service.delete_exception(club_id, id, date).await?;

    if removed {
        println!(
            "{} Restored the occurrence on {}",
            "✓".style(Style::new().green().bold()),
            date.format("%Y-%m-%d").bright_white().bold()
        );
    } else {
        println!(
            "{}",
            format!("The occurrence on {} has no changes to restore.", date.format("%Y-%m-%d")).bright_black()
        );
    }
    Ok(())
}

fn report(verb: &str, exception: &OccurrenceException) {
    println!(
        "{} {} the occurrence on {}",
        "✓".style(Style::new().green().bold()),
        verb,
        exception.occurrence_date.format("%Y-%m-%d").bright_white().bold()
    );
    if let Some(moved_to) = exception.overrides.date.filter(|d| *d != exception.occurrence_date) {
        println!(
            "  {} Now on {}",
            "→".style(Style::new().blue()),
            moved_to.format("%Y-%m-%d")
        );
    }
}
