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

pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod storage;
pub mod telemetry;

use crate::config::HashingConfig;
use crate::services::password_service::PasswordService;
use crate::services::user_service::UserService;
use crate::storage::DbPool;
use crate::storage::user_repo::UserRepository;

/// Applies the bundled schema migrations.
///
/// # Errors
/// Returns `AppError::Migration` if a migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> error::Result<()> {
    sqlx::migrate!().run(pool).await?;
    tracing::info!("Migrations applied");
    Ok(())
}

/// Wires the user service onto an already opened pool.
///
/// # Errors
/// Returns `AppError::Hashing` if the hashing parameters are invalid.
pub fn user_service(pool: DbPool, hashing: &HashingConfig) -> error::Result<UserService> {
    let passwords = PasswordService::new(hashing)?;
    Ok(UserService::new(pool, UserRepository::new(), passwords))
}

/// Routes panics through `tracing` so they reach the configured log sink.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic = %info, %location, "Process panicked");
        default_hook(info);
    }));
}
