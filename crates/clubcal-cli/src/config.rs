use clubcal_core::models::SchedulingConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize, Serialize, Debug)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    /// Club every command is scoped to; single-club installs can leave it unset
    pub club_id: Option<Uuid>,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "clubcal.db".to_string(),
            club_id: None,
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `clubcal.toml`, then `CLUBCAL_*` variables
    /// (`CLUBCAL_SCHEDULING__MAX_WINDOW_DAYS` for nested keys).
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("clubcal.toml"))
            .merge(Env::prefixed("CLUBCAL_").split("__"))
    }

    pub fn club_id(&self) -> Uuid {
        self.club_id.unwrap_or(Uuid::nil())
    }
}
