use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::services::chunker::ChunkerConfig;

/// Program configuration
///
/// Loaded from defaults, then an optional TOML file, then environment
/// variables (upper-case field names), each layer overriding the previous one.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- Chunking ---
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    // --- Concurrency ---
    /// Summarization calls in flight per document
    pub max_concurrent_chunks: usize,
    /// Documents processed at the same time by the batch app
    pub max_concurrent_documents: usize,
    /// Upper bound for a single chunk summarization call
    pub chunk_timeout_secs: u64,
    /// Wall-clock budget of one document run
    pub job_timeout_secs: u64,
    // --- Storage ---
    /// Folder scanned by the batch app for documents to process
    pub input_folder: String,
    /// Root directory of the local blob store
    pub storage_root: String,
    /// Bucket name used in object locations
    pub storage_bucket: String,
    /// Directory holding one JSON file per job record
    pub db_dir: String,
    // --- Logging ---
    /// Enable debug-level logs
    pub verbose_logging: bool,
    /// Run log file written by the batch app
    pub output_log_file: String,
    // --- LLM ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 25_000,
            chunk_overlap: 500,
            max_concurrent_chunks: 10,
            max_concurrent_documents: 2,
            chunk_timeout_secs: 300,
            job_timeout_secs: 30 * 60,
            input_folder: "input".to_string(),
            storage_root: "storage".to_string(),
            storage_bucket: "document-processing-bucket".to_string(),
            db_dir: "db".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.3,
            llm_max_tokens: 4096,
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// TOML file (missing fields use defaults) overridden by environment variables
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            })?;
        config.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any name → value lookup, then validate
    pub fn with_overrides<F>(self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            chunk_size: parse_var(&lookup, "CHUNK_SIZE", self.chunk_size)?,
            chunk_overlap: parse_var(&lookup, "CHUNK_OVERLAP", self.chunk_overlap)?,
            max_concurrent_chunks: parse_var(
                &lookup,
                "MAX_CONCURRENT_CHUNKS",
                self.max_concurrent_chunks,
            )?,
            max_concurrent_documents: parse_var(
                &lookup,
                "MAX_CONCURRENT_DOCUMENTS",
                self.max_concurrent_documents,
            )?,
            chunk_timeout_secs: parse_var(&lookup, "CHUNK_TIMEOUT_SECS", self.chunk_timeout_secs)?,
            job_timeout_secs: parse_var(&lookup, "JOB_TIMEOUT_SECS", self.job_timeout_secs)?,
            input_folder: lookup("INPUT_FOLDER").unwrap_or(self.input_folder),
            storage_root: lookup("STORAGE_ROOT").unwrap_or(self.storage_root),
            storage_bucket: lookup("STORAGE_BUCKET").unwrap_or(self.storage_bucket),
            db_dir: lookup("DB_DIR").unwrap_or(self.db_dir),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", self.verbose_logging)?,
            output_log_file: lookup("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            llm_api_key: lookup("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: parse_var(&lookup, "LLM_TEMPERATURE", self.llm_temperature)?,
            llm_max_tokens: parse_var(&lookup, "LLM_MAX_TOKENS", self.llm_max_tokens)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker_config()?;
        if self.max_concurrent_chunks == 0 {
            return Err(ConfigError::InvalidConcurrency {
                name: "max_concurrent_chunks",
            });
        }
        if self.max_concurrent_documents == 0 {
            return Err(ConfigError::InvalidConcurrency {
                name: "max_concurrent_documents",
            });
        }
        Ok(())
    }

    /// Validated chunker parameters
    pub fn chunker_config(&self) -> Result<ChunkerConfig, ConfigError> {
        ChunkerConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                expected_type: std::any::type_name::<T>().to_string(),
                value,
            }),
        None => Ok(default),
    }
}
