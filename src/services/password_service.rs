use crate::config::HashingConfig;
use crate::domain::password::{self, Password};
use crate::error::{AppError, Result};
use argon2::Params;

/// Runs the CPU-heavy hashing work on the blocking pool so async callers only await it.
#[derive(Clone, Debug)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    /// # Errors
    /// Returns `AppError::Hashing` if the configured cost, memory or parallelism is out of range.
    pub fn new(config: &HashingConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.cost, config.parallelism, None)
            .map_err(|e| AppError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.params.t_cost()
    }

    /// # Errors
    /// Returns `AppError::Hashing` if the primitive fails, or `AppError::Internal` if the worker dies.
    #[tracing::instrument(err, skip(self, password), fields(cost = self.params.t_cost()))]
    pub async fn hash_password(&self, password: &Password) -> Result<String> {
        let plain = password.expose().to_string();
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            password::hash(&plain, params).map_err(|e| AppError::Hashing(e.to_string()))
        })
        .await
        .map_err(|_| AppError::Internal)?
    }

    /// Never fails: a worker that dies counts as a mismatch.
    #[tracing::instrument(skip(self, candidate, password_hash))]
    pub async fn verify_password(&self, candidate: &str, password_hash: &str) -> bool {
        let candidate = candidate.to_string();
        let password_hash = password_hash.to_string();
        match tokio::task::spawn_blocking(move || password::verify(&candidate, &password_hash)).await {
            Ok(is_valid) => is_valid,
            Err(e) => {
                tracing::error!(error = %e, "Password verification worker failed");
                false
            }
        }
    }
}
