//! Configuration module
//!
//! Server, storage and pipeline settings, loaded once at startup from the
//! environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const SERVER_PORT: u16 = 3000;
const MAX_FILES_PER_BATCH: usize = 10;
const MAX_FILE_SIZE_MB: usize = 50;
const MAX_PARALLEL_CONVERSIONS: usize = 1;
const RESULTS_DIR: &str = "uploads";
const PUBLIC_DIR: &str = "public";
const PUBLIC_PATH_PREFIX: &str = "/uploads";
const ARCHIVE_FILENAME: &str = "images-converties.zip";
const STAGING_DIR_NAME: &str = "imgpress-staging";

/// How a batch reacts to a failed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// The first failure aborts the batch and discards produced outcomes
    #[default]
    AllOrNothing,
    /// Every item is attempted; failures are reported next to the outcomes
    PartialSuccess,
}

impl FromStr for BatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all_or_nothing" | "all-or-nothing" | "atomic" => Ok(BatchPolicy::AllOrNothing),
            "partial" | "partial_success" | "partial-success" => Ok(BatchPolicy::PartialSuccess),
            _ => Err(anyhow::anyhow!("Invalid batch policy: {}", s)),
        }
    }
}

/// Log output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub results_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub public_dir: PathBuf,
    pub public_path_prefix: String,
    pub archive_filename: String,
    pub max_files_per_batch: usize,
    pub max_file_size_bytes: usize,
    /// Reject unknown target formats before any conversion runs
    pub strict_format_validation: bool,
    pub batch_policy: BatchPolicy,
    pub max_parallel_conversions: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            results_dir: PathBuf::from(RESULTS_DIR),
            staging_dir: env::temp_dir().join(STAGING_DIR_NAME),
            public_dir: PathBuf::from(PUBLIC_DIR),
            public_path_prefix: PUBLIC_PATH_PREFIX.to_string(),
            archive_filename: ARCHIVE_FILENAME.to_string(),
            max_files_per_batch: MAX_FILES_PER_BATCH,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            strict_format_validation: true,
            batch_policy: BatchPolicy::default(),
            max_parallel_conversions: MAX_PARALLEL_CONVERSIONS,
            log_format: LogFormat::default(),
        }
    }
}

fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool_or(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|s| match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Saturates instead of overflowing on absurd settings.
fn megabytes_to_bytes(megabytes: usize) -> usize {
    megabytes.saturating_mul(1024 * 1024)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let server_port = match env::var("PORT") {
            Ok(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            Err(_) => SERVER_PORT,
        };

        let batch_policy = match env::var("BATCH_POLICY") {
            Ok(policy) => policy.parse()?,
            Err(_) => defaults.batch_policy,
        };

        let log_format = match env::var("LOG_FORMAT").map(|s| s.to_lowercase()) {
            Ok(format) if format == "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let max_file_size_mb = env_parse_or("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB);

        Ok(Config {
            server_port,
            environment,
            results_dir: env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            public_dir: env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            public_path_prefix: env::var("PUBLIC_PATH_PREFIX")
                .unwrap_or(defaults.public_path_prefix),
            archive_filename: env::var("ARCHIVE_FILENAME").unwrap_or(defaults.archive_filename),
            max_files_per_batch: env_parse_or("MAX_FILES_PER_BATCH", MAX_FILES_PER_BATCH),
            max_file_size_bytes: megabytes_to_bytes(max_file_size_mb),
            strict_format_validation: env_bool_or("STRICT_FORMAT_VALIDATION", true),
            batch_policy,
            max_parallel_conversions: env_parse_or(
                "MAX_PARALLEL_CONVERSIONS",
                MAX_PARALLEL_CONVERSIONS,
            ),
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_files_per_batch == 0 {
            return Err(anyhow::anyhow!("MAX_FILES_PER_BATCH must be at least 1"));
        }
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be at least 1"));
        }
        if self.max_parallel_conversions == 0 {
            return Err(anyhow::anyhow!("MAX_PARALLEL_CONVERSIONS must be at least 1"));
        }
        if !self.public_path_prefix.starts_with('/')
            || self.public_path_prefix.trim_matches('/').is_empty()
        {
            return Err(anyhow::anyhow!(
                "PUBLIC_PATH_PREFIX must be an absolute, non-root path (e.g. /uploads)"
            ));
        }
        if self.archive_filename.is_empty()
            || !self
                .archive_filename
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(anyhow::anyhow!(
                "ARCHIVE_FILENAME may only contain ASCII letters, digits, '.', '-' and '_'"
            ));
        }
        if self.results_dir == self.staging_dir {
            return Err(anyhow::anyhow!(
                "STAGING_DIR must differ from RESULTS_DIR so raw uploads never enter the archive"
            ));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Upper bound for one upload request body
    pub fn max_request_body_bytes(&self) -> usize {
        const FORM_OVERHEAD_BYTES: usize = 64 * 1024;
        self.max_files_per_batch
            .saturating_mul(self.max_file_size_bytes)
            .saturating_add(FORM_OVERHEAD_BYTES)
    }
}
