use anyhow::Result;
use clubcal_core::service::SchedulingService;
use uuid::Uuid;

/// Resolves a full session ID or an unambiguous prefix of at least 2 characters.
pub async fn resolve_session_id(service: &SchedulingService, club_id: Uuid, short_id: &str) -> Result<Uuid> {
    Ok(service.resolve_session_id(club_id, short_id).await?)
}

/// First 8 hex digits, enough to pass back as an ID prefix.
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
