use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub hashing: HashingConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long = "database-url", env = "CREDSTORE_DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long = "db-max-connections", env = "CREDSTORE_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Connections kept open while idle
    #[arg(long = "db-min-connections", env = "CREDSTORE_DB_MIN_CONNECTIONS", default_value_t = 0)]
    pub min_connections: u32,

    /// How long to wait for a free connection before giving up
    #[arg(long = "db-acquire-timeout-secs", env = "CREDSTORE_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct HashingConfig {
    /// Work factor for password hashing (Argon2 iterations)
    #[arg(long = "hash-cost", env = "CREDSTORE_HASH_COST", default_value_t = 10)]
    pub cost: u32,

    /// Memory used per hash in KiB
    #[arg(long = "hash-memory-kib", env = "CREDSTORE_HASH_MEMORY_KIB", default_value_t = argon2::Params::DEFAULT_M_COST)]
    pub memory_kib: u32,

    /// Lanes per hash
    #[arg(long = "hash-parallelism", env = "CREDSTORE_HASH_PARALLELISM", default_value_t = 1)]
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self { cost: 10, memory_kib: argon2::Params::DEFAULT_M_COST, parallelism: 1 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "CREDSTORE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint for traces and metrics; export is disabled when unset
    #[arg(long, env = "CREDSTORE_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Create the user table if it does not exist
    Migrate,
    /// Create a user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CREDSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Change fields of an existing user
    Update {
        id: i32,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New password; only taken from this flag, never from the environment
        #[arg(long)]
        password: Option<String>,
    },
    /// Check a password for the user with the given email
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CREDSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print a user
    Show { id: i32 },
    /// Remove a user
    Delete { id: i32 },
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
