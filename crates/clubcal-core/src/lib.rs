//! # Clubcal Core Library
//!
//! The recurring-session occurrence engine behind club training and match scheduling.
//! A session is stored once as a template; its calendar is computed on demand, and
//! per-occurrence edits are stored as sparse exceptions keyed by the original date.
//!
//! ## Core Modules
//!
//! - [`recurrence`]: pure expansion of a template into occurrence dates
//! - [`repository`]: SQLite persistence for templates, team links and exceptions
//! - [`resolver`]: overlays exceptions onto expanded dates
//! - [`coordinator`]: transactional "this", "this and future" and "all" edits
//! - [`service`]: the facade callers use; owns every transaction boundary
//! - [`db`]: connection setup and migrations
//! - [`error`]: error taxonomy with stable codes
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::{NaiveDate, NaiveTime};
//! use clubcal_core::{
//!     db,
//!     models::{NewSessionData, RecurrencePattern, RecurrenceSpec, SchedulingConfig, WeekdaySet},
//!     query::SessionFilter,
//!     service::SchedulingService,
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SchedulingConfig::default();
//!     let pool = db::establish_connection("clubcal.db", &config).await?;
//!     let service = SchedulingService::new(pool, config);
//!     let club_id = Uuid::now_v7();
//!
//!     let session = service
//!         .create_session(
//!             club_id,
//!             NewSessionData {
//!                 season_id: None,
//!                 title: "U12 Training".to_string(),
//!                 description: None,
//!                 session_type: "training".to_string(),
//!                 status: None,
//!                 anchor_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!                 start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
//!                 end_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
//!                 location: Some("Main pitch".to_string()),
//!                 coach_id: None,
//!                 max_participants: Some(20),
//!                 recurrence: Some(RecurrenceSpec {
//!                     pattern: RecurrencePattern::Weekly,
//!                     days: WeekdaySet::from_ordinals([1, 3])?,
//!                     end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//!                 }),
//!                 team_ids: vec![],
//!             },
//!         )
//!         .await?;
//!
//!     // Cancel one training without touching the rest of the series
//!     service
//!         .cancel_occurrence(club_id, session.template.id, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
//!         .await?;
//!
//!     let filter = SessionFilter {
//!         from_date: NaiveDate::from_ymd_opt(2024, 1, 1),
//!         to_date: NaiveDate::from_ymd_opt(2024, 1, 31),
//!         ..Default::default()
//!     };
//!     let listing = service.list_occurrences(club_id, &filter, true).await?;
//!     println!("{} occurrences", listing.len());
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod repository;
pub mod resolver;
pub mod service;
