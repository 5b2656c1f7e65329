use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

pub const CLUB_ID: &str = "0190a4b2-7c1e-7000-8000-00000000c1ab";

/// Test harness for running CLI commands against a temporary database
pub struct CliTestHarness {
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self {
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// A Command wired to this harness's database and club
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("clubcal").expect("Failed to find clubcal binary");
        cmd.env("CLUBCAL_DATABASE_PATH", &self.db_path);
        cmd.env("CLUBCAL_CLUB_ID", CLUB_ID);
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a command with `--json` output and parses stdout
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.command().args(args).output().expect("Failed to run clubcal");
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }

    /// Creates the fixture series and returns its full ID
    pub fn create_monday_series(&self) -> String {
        self.run_success(&TestFixtures::monday_series_args());
        let sessions = self.run_json(&["list", "--json"]);
        sessions[0]["id"].as_str().expect("session id").to_string()
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Weekly Monday training through January 2024
    pub fn monday_series_args() -> Vec<&'static str> {
        vec![
            "create", "U12 Training",
            "--date", "2024-01-01",
            "--start", "18:00",
            "--end", "19:30",
            "--every", "weekly",
            "--on", "mon",
            "--until", "2024-01-29",
            "--status", "scheduled",
        ]
    }

    pub fn january_window() -> Vec<&'static str> {
        vec!["--from", "2024-01-01", "--to", "2024-01-31"]
    }
}

pub mod assertions {
    use super::*;

    pub fn created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains("Created"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}

/// Effective dates of an expanded JSON listing
pub fn effective_dates(listing: &serde_json::Value) -> Vec<String> {
    listing
        .as_array()
        .expect("listing array")
        .iter()
        .map(|o| o["effective_date"].as_str().expect("effective_date").to_string())
        .collect()
}
