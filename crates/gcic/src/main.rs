//! gcic - control CLI for the GalacticCIC operations dashboard

use clap::Parser;
use gcic_core::{constants, Error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gcic={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let result = match cli.command {
        Commands::Start => commands::start::execute().await,
        Commands::Stop => commands::stop::execute().await,
        Commands::Restart => commands::restart::execute().await,
        Commands::Status => commands::status::execute().await,
        Commands::Dashboard => {
            gcic_tui::run(&constants::db_path(), &constants::config_path()).await
        }
        Commands::Collect => commands::collect::execute().await,
        Commands::Db { action } => commands::db::execute(action).await,
        Commands::Logs(args) => commands::logs::execute(args).await,
        Commands::Install => commands::install::execute().await,
        Commands::Version => {
            println!("galactic-cic {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(exit_code(&e));
    }
}

/// Exit codes: 1 operational failure, 3 precondition failure (store
/// unreadable). Clap reports usage errors as 2 on its own.
fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Db(_) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(&Error::Db("unreadable".into())), 3);
        assert_eq!(exit_code(&Error::Service("boom".into())), 1);
        assert_eq!(exit_code(&Error::DaemonNotRunning), 1);
    }
}
