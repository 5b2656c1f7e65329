use clap::Parser;
use clubcal_core::db;
use clubcal_core::error::CoreError;
use clubcal_core::service::SchedulingService;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::parser::InputError;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => handle_error(e),
    };
    std::process::exit(code);
}

async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = config::Config::new()?;
    tracing::debug!(database = %config.database_path, club_id = ?config.club_id, "loaded configuration");
    let pool = db::establish_connection(&config.database_path, &config.scheduling).await?;
    let service = SchedulingService::new(pool, config.scheduling.clone());
    let club_id = config.club_id();

    match cli.command {
        cli::Commands::Create(command) => commands::create::create_session(&service, club_id, command).await,
        cli::Commands::List(command) => commands::list::list_sessions(&service, club_id, command).await,
        cli::Commands::Show(command) => commands::show::show_session(&service, club_id, command).await,
        cli::Commands::Update(command) => commands::update::update_session(&service, club_id, command).await,
        cli::Commands::Publish(command) => commands::publish::publish_session(&service, club_id, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_session(&service, club_id, command).await,
        cli::Commands::Occurrence(command) => {
            commands::occurrence::handle_occurrence(&service, club_id, command).await
        }
        cli::Commands::Edit(command) => commands::edit::edit_session(&service, club_id, command).await,
    }
}

/// Prints the error and returns the process exit code for it.
fn handle_error(err: anyhow::Error) -> i32 {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::AmbiguousId(candidates) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in candidates {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::Persistence(source) => {
                eprintln!("{} {}: {}", "Error:".style(error_style), core_error, source);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), core_error),
        }
        eprintln!(
            "  {} {}",
            format!("[{}]", core_error.code()).bright_black(),
            core_error.remediation()
        );
        return exit_code(core_error);
    }

    if let Some(input_error) = err.downcast_ref::<InputError>() {
        eprintln!("{} {}", "Error:".style(error_style), input_error);
        return 2;
    }

    eprintln!("{} {:#}", "Error:".style(error_style), err);
    1
}

fn exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::Validation(_) => 3,
        CoreError::OccurrenceNotInSeries { .. } => 4,
        CoreError::SeriesAlreadyCancelled(_) => 5,
        CoreError::ConcurrentModification(_) => 6,
        CoreError::NotFound(_) => 7,
        CoreError::AmbiguousId(_) => 8,
        CoreError::Persistence(_) | CoreError::Migration(_) | CoreError::Io(_) => 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        assert_eq!(exit_code(&CoreError::Validation("bad".into())), 3);
        assert_eq!(exit_code(&CoreError::SeriesAlreadyCancelled(Uuid::nil())), 5);
        assert_eq!(exit_code(&CoreError::NotFound("x".into())), 7);
        assert_eq!(exit_code(&CoreError::Io(std::io::Error::other("disk"))), 10);
    }

    #[test]
    fn test_wrapped_core_errors_are_recognised() {
        let err = anyhow::Error::new(CoreError::NotFound("session".into()));
        assert_eq!(handle_error(err), 7);
        let err = anyhow::Error::new(InputError::Time("25:99".into()));
        assert_eq!(handle_error(err), 2);
        assert_eq!(handle_error(anyhow::anyhow!("plain")), 1);
    }
}
