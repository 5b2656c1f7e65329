use anyhow::Result;
use clubcal_core::query::{Listing, SessionFilter};
use clubcal_core::service::SchedulingService;
use uuid::Uuid;

use crate::cli::ListCommand;
use crate::parser::parse_optional_date;
use crate::views::table::{display_occurrences, display_sessions};

pub async fn list_sessions(service: &SchedulingService, club_id: Uuid, command: ListCommand) -> Result<()> {
    let filter = SessionFilter {
        from_date: parse_optional_date(command.from.as_deref())?,
        to_date: parse_optional_date(command.to.as_deref())?,
        team_id: command.team,
        status: command.status,
        include_cancelled: command.include_cancelled,
    };

    let listing = service.list_occurrences(club_id, &filter, command.expand).await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    match &listing {
        Listing::Sessions(sessions) => display_sessions(sessions),
        Listing::Occurrences(occurrences) => display_occurrences(occurrences),
    }
    Ok(())
}
