use clap::{Args, Parser, Subcommand};
use clubcal_core::models::{EditScope, RecurrencePattern, SessionStatus, WeekdaySet};
use uuid::Uuid;

/// Schedule club training sessions and matches, one-off or recurring
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a session or a recurring series
    Create(CreateCommand),
    /// List sessions, or their occurrences with --expand
    List(ListCommand),
    /// Show a session with its exceptions
    Show(ShowCommand),
    /// Update a whole session or series in place
    Update(UpdateCommand),
    /// Move a draft session to scheduled
    Publish(PublishCommand),
    /// Delete a session with all of its exceptions
    Delete(DeleteCommand),
    /// Cancel, reschedule, edit or restore a single occurrence
    #[command(subcommand)]
    Occurrence(OccurrenceCommand),
    /// Edit a session choosing the scope: this occurrence, this and future, or all
    Edit(EditCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct CreateCommand {
    /// The title of the session
    pub title: String,
    /// Kind of session (training, match, ...)
    #[arg(long = "type", default_value = "training")]
    pub session_type: String,
    /// Date of the session, or first date of the series
    #[arg(long)]
    pub date: String,
    /// Start time (e.g. '18:00', '6:30 pm')
    #[arg(long)]
    pub start: String,
    /// End time
    #[arg(long)]
    pub end: String,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub location: Option<String>,
    /// Coach responsible for the session
    #[arg(long)]
    pub coach: Option<Uuid>,
    /// Maximum number of participants
    #[arg(long)]
    pub max: Option<i32>,
    #[arg(long)]
    pub season: Option<Uuid>,
    /// Teams taking part; repeat for several
    #[arg(long = "team")]
    pub teams: Vec<Uuid>,
    /// Initial status (defaults to draft)
    #[arg(long)]
    pub status: Option<SessionStatus>,
    /// Recurrence frequency (daily, weekly, biweekly, monthly)
    #[arg(long, requires = "until")]
    pub every: Option<RecurrencePattern>,
    /// Weekdays for weekly and biweekly series (mon,wed or 1,3 with 0 = Sunday)
    #[arg(long, requires = "every")]
    pub on: Option<WeekdaySet>,
    /// Last date of the series (inclusive)
    #[arg(long, requires = "every")]
    pub until: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Expand recurring sessions into individual occurrences
    #[arg(short, long)]
    pub expand: bool,
    /// First date of the listing window (defaults to today)
    #[arg(long)]
    pub from: Option<String>,
    /// Last date of the listing window
    #[arg(long)]
    pub to: Option<String>,
    /// Only sessions of this team
    #[arg(long)]
    pub team: Option<Uuid>,
    #[arg(long)]
    pub status: Option<SessionStatus>,
    /// Keep cancelled occurrences in expanded listings
    #[arg(long)]
    pub include_cancelled: bool,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// The ID (or unambiguous prefix) of the session
    pub id: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct UpdateCommand {
    /// The ID (or unambiguous prefix) of the session
    pub id: String,
    #[command(flatten)]
    pub changes: SessionChangeArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct PublishCommand {
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    pub id: String,
    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OccurrenceCommand {
    /// Cancel one occurrence
    Cancel(OccurrenceRef),
    /// Move one occurrence to another date or time
    Reschedule(RescheduleCommand),
    /// Override fields of one occurrence
    Edit(OccurrenceEditCommand),
    /// Drop the exception of one occurrence, restoring the series fields
    Restore(OccurrenceRef),
}

#[derive(Args, Debug, Clone)]
pub struct OccurrenceRef {
    /// The ID (or unambiguous prefix) of the session
    pub id: String,
    /// Original date of the occurrence
    pub date: String,
}

#[derive(Args, Debug, Clone)]
pub struct RescheduleCommand {
    #[command(flatten)]
    pub occurrence: OccurrenceRef,
    /// New date
    #[arg(long)]
    pub to: Option<String>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct OccurrenceEditCommand {
    #[command(flatten)]
    pub occurrence: OccurrenceRef,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub coach: Option<Uuid>,
    #[arg(long)]
    pub max: Option<i32>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub status: Option<SessionStatus>,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or unambiguous prefix) of the session
    pub id: String,
    /// How to apply changes (this|future|all); asks when omitted on a recurring session
    #[arg(long)]
    pub scope: Option<EditScope>,
    /// Occurrence the 'this' and 'future' scopes start from
    #[arg(long)]
    pub on: Option<String>,
    #[command(flatten)]
    pub changes: SessionChangeArgs,
}

/// Field changes shared by `update` and `edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionChangeArgs {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long = "type")]
    pub session_type: Option<String>,

    #[arg(long)]
    pub status: Option<SessionStatus>,

    /// New first date of the series (with --scope this: the occurrence's new date)
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,

    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, conflicts_with = "location")]
    pub location_clear: bool,

    #[arg(long)]
    pub coach: Option<Uuid>,
    #[arg(long, conflicts_with = "coach")]
    pub coach_clear: bool,

    #[arg(long)]
    pub max: Option<i32>,
    #[arg(long, conflicts_with = "max")]
    pub max_clear: bool,

    #[arg(long)]
    pub season: Option<Uuid>,
    #[arg(long, conflicts_with = "season")]
    pub season_clear: bool,

    #[arg(long)]
    pub every: Option<RecurrencePattern>,
    #[arg(long)]
    pub on_days: Option<WeekdaySet>,
    #[arg(long)]
    pub until: Option<String>,
    /// Turn a series into a one-off session on its first date
    #[arg(long, conflicts_with_all = ["every", "on_days", "until"])]
    pub one_off: bool,

    /// Replace the session's teams; repeat for several
    #[arg(long = "team")]
    pub teams: Vec<Uuid>,
    #[arg(long, conflicts_with = "teams")]
    pub teams_clear: bool,
}
