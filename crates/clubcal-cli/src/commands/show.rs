use anyhow::Result;
use clubcal_core::service::SchedulingService;
use serde_json::json;
use uuid::Uuid;

use crate::cli::ShowCommand;
use crate::util::resolve_session_id;
use crate::views::table::display_session;

pub async fn show_session(service: &SchedulingService, club_id: Uuid, command: ShowCommand) -> Result<()> {
    let id = resolve_session_id(service, club_id, &command.id).await?;
    let session = service.get_session(club_id, id).await?;
    let exceptions = service.list_exceptions(club_id, id).await?;
    let successors = service.split_successors(club_id, id).await?;

    if command.json {
        let successor_ids: Vec<Uuid> = successors.iter().map(|t| t.id).collect();
        let body = json!({
            "session": session,
            "exceptions": exceptions,
            "continued_by": successor_ids,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    display_session(&session, &exceptions, &successors);
    Ok(())
}
