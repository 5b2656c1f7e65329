use anyhow::Result;
use clubcal_core::service::SchedulingService;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::DeleteCommand;
use crate::util::resolve_session_id;

pub async fn delete_session(service: &SchedulingService, club_id: Uuid, command: DeleteCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.id).await?;
    let session = service.get_session(club_id, id).await?;

    if !command.force {
        let prompt = if session.template.is_recurring {
            format!(
                "Delete the series '{}' with all of its occurrences and exceptions?",
                session.template.title
            )
        } else {
            format!("Delete session '{}'?", session.template.title)
        };
        let confirmation = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    service.delete_session(club_id, id).await?;
    println!(
        "{} Deleted {}",
        "✓".style(Style::new().green().bold()),
        session.template.title.bright_white().bold()
    );
    Ok(())
}
