use anyhow::{bail, Result};
use clubcal_core::service::SchedulingService;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::UpdateCommand;
use crate::commands::edit::build_changes;
use crate::util::{resolve_session_id, short_id};
use crate::views::table::recurrence_summary;

pub async fn update_session(service: &SchedulingService, club_id: Uuid, command: UpdateCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.id).await?;
    let changes = build_changes(&command.changes)?;
    if changes.is_empty() {
        bail!("No changes given. Pass at least one field to update.");
    }

    let session = service.update_session(club_id, id, changes).await?;
    let template = &session.template;

    println!(
        "{} Updated {} ({})",
        "✓".style(Style::new().green().bold()),
        template.title.bright_white().bold(),
        short_id(id).yellow()
    );
    println!(
        "  {} Schedule: {}",
        "→".style(Style::new().blue()),
        recurrence_summary(template)
    );
    Ok(())
}
