use anyhow::Result;
use clubcal_core::service::SchedulingService;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::PublishCommand;
use crate::util::{resolve_session_id, short_id};

pub async fn publish_session(service: &SchedulingService, club_id: Uuid, command: PublishCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.id).await?;
    let session = service.publish_session(club_id, id).await?;

    println!(
        "{} Published {} ({})",
        "✓".style(Style::new().green().bold()),
        session.template.title.bright_white().bold(),
        short_id(id).yellow()
    );
    Ok(())
}
