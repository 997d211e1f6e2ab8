#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use credstore::config::{Command, Config, HashingConfig};
use credstore::domain::user::{NewUser, UserChanges};
use credstore::error::{AppError, Result};
use credstore::storage::DbPool;
use credstore::{storage, telemetry};
use serde_json::json;
use std::process::ExitCode;
use tracing::Instrument;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::load();
    let telemetry_guard = match telemetry::init_telemetry(&config.telemetry) {
        Ok(guard) => guard,
        Err(e) => {
            report_startup_failure(&e);
            return ExitCode::FAILURE;
        }
    };

    credstore::setup_panic_hook();

    let outcome = run(config).await;
    let (body, succeeded) = report(outcome);
    if let Some(body) = body {
        emit(&body);
    }

    telemetry_guard.shutdown();

    if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run(config: Config) -> Result<serde_json::Value> {
    let boot_span = tracing::info_span!("connect_database");
    let pool = async { storage::init_pool(&config.database).await }.instrument(boot_span).await?;

    let outcome = execute(&pool, &config.hashing, config.command).await;

    pool.close().await;
    outcome
}

/// Decides what reaches stdout. Client errors are answered there as JSON;
/// everything else is logged, so each failure surfaces exactly once.
fn report(outcome: Result<serde_json::Value>) -> (Option<serde_json::Value>, bool) {
    match outcome {
        Ok(body) => (Some(body), true),
        Err(e) if e.is_client_error() => (Some(json!({ "error": e.to_string() })), false),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            (None, false)
        }
    }
}

async fn execute(pool: &DbPool, hashing: &HashingConfig, command: Command) -> Result<serde_json::Value> {
    let users = credstore::user_service(pool.clone(), hashing)?;
    match command {
        Command::Migrate => {
            credstore::run_migrations(pool).await?;
            Ok(json!({ "migrated": true }))
        }
        Command::Create { username, email, password } => {
            let user = users.create(NewUser::new(username, email, password)).await?;
            Ok(json!(user))
        }
        Command::Update { id, username, email, password } => {
            let changes = UserChanges { username, email, password: password.map(Into::into) };
            let user = users.update(id, changes).await?;
            Ok(json!(user))
        }
        Command::Verify { email, password } => {
            let user = users.authenticate(&email, &password).await?;
            Ok(json!({ "valid": user.is_some(), "id": user.map(|u| u.id) }))
        }
        Command::Show { id } => {
            let user = users.find_by_id(id).await?.ok_or(AppError::NotFound)?;
            Ok(json!(user))
        }
        Command::Delete { id } => {
            users.delete(id).await?;
            Ok(json!({ "deleted": id }))
        }
    }
}

#[allow(clippy::print_stdout)]
fn emit(body: &serde_json::Value) {
    println!("{body}");
}

// No subscriber is installed yet, so stderr is the only sink left.
#[allow(clippy::print_stderr)]
fn report_startup_failure(error: &anyhow::Error) {
    eprintln!("Failed to initialize telemetry: {error:#}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_client_error_is_reported_once_on_stdout() {
        let (body, succeeded) = report(Err(AppError::Uniqueness { field: "email" }));
        assert!(!succeeded);
        let body = body.unwrap();
        assert_eq!(body["error"], AppError::Uniqueness { field: "email" }.to_string());
    }

    #[test]
    fn test_server_error_is_logged_not_printed() {
        let (body, succeeded) = report(Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        assert!(!succeeded);
        assert!(body.is_none());
    }

    #[test]
    fn test_success_prints_body() {
        let (body, succeeded) = report(Ok(json!({ "deleted": 4 })));
        assert!(succeeded);
        assert_eq!(body, Some(json!({ "deleted": 4 })));
    }

    #[tokio::test]
    async fn test_unreachable_database_returns_error_instead_of_exiting() {
        let config = Config::try_parse_from([
            "credstore",
            "--database-url",
            "postgres://credstore@127.0.0.1:1/credstore",
            "--db-acquire-timeout-secs",
            "1",
            "show",
            "1",
        ])
        .unwrap();

        let (body, succeeded) = report(run(config).await);
        assert!(!succeeded);
        assert!(body.is_none());
    }
}
