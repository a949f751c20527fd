//! Configuration management for a batch run.
//!
//! Configuration can be set via environment variables:
//! - `GENERATE_URL` - Optional. Generation endpoint. Defaults to `http://localhost:4407/api/generate`.
//! - `ROOT_DIR` - Optional. Project root to scan. Defaults to current directory.
//! - `OUTPUT_PATH` - Optional. Result store file. Defaults to `execution_log.sqlite`.
//! - `SOURCE_EXTENSION` - Optional. Extension of candidate files. Defaults to `py`.
//! - `EXCLUDED_DIRS` - Optional. Comma-separated directory names to skip. Defaults to `venv,migrations,__pycache__`.
//! - `ADDITIONAL_PROMPT` - Optional. Extra instructions sent with every request.
//! - `MAX_ITERATIONS` - Optional. Iteration budget per file. Defaults to `0` (service default).
//! - `FLAKINESS` - Optional. Ask the service to check generated tests for flakiness. Defaults to `false`.
//! - `FUNCTION_UNDER_TEST` - Optional. Restrict generation to one function.
//! - `EXPECTED_COVERAGE` - Optional. Target coverage percentage. Defaults to `0.0` (unset).

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::candidates::CandidateFilter;
use crate::request::RequestDefaults;

pub const DEFAULT_GENERATE_URL: &str = "http://localhost:4407/api/generate";
pub const DEFAULT_OUTPUT_PATH: &str = "execution_log.sqlite";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generation endpoint
    pub generate_url: Url,

    /// Project root; requests carry it as `rootDir`
    pub root_dir: PathBuf,

    /// Result store location
    pub output_path: PathBuf,

    /// Which files become work items
    pub candidates: CandidateFilter,

    /// Per-request settings
    pub request: RequestDefaults,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but cannot be
    /// parsed, or if the project root does not exist.
    pub fn from_env() -> Result<Self, ConfigError> {
        let generate_url = std::env::var("GENERATE_URL")
            .unwrap_or_else(|_| DEFAULT_GENERATE_URL.to_string());
        let generate_url = Url::parse(&generate_url)
            .map_err(|e| ConfigError::InvalidValue("GENERATE_URL".to_string(), format!("{}", e)))?;

        let root_dir = match std::env::var("ROOT_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir().map_err(|_| {
                ConfigError::MissingEnvVar("ROOT_DIR".to_string())
            })?,
        };
        let root_dir = root_dir.canonicalize().map_err(|e| {
            ConfigError::InvalidValue("ROOT_DIR".to_string(), format!("{}: {}", root_dir.display(), e))
        })?;

        let output_path = std::env::var("OUTPUT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_PATH));

        let mut candidates = CandidateFilter::default();
        if let Ok(ext) = std::env::var("SOURCE_EXTENSION") {
            candidates.extension = ext.trim().trim_start_matches('.').to_string();
        }
        if let Ok(dirs) = std::env::var("EXCLUDED_DIRS") {
            candidates.excluded_dirs = parse_list(&dirs);
        }

        let request = RequestDefaults {
            additional_prompt: std::env::var("ADDITIONAL_PROMPT").unwrap_or_default(),
            max_iterations: std::env::var("MAX_ITERATIONS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|e| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e)))?,
            flakiness: std::env::var("FLAKINESS")
                .ok()
                .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue("FLAKINESS".to_string(), e)))
                .transpose()?
                .unwrap_or(false),
            function_under_test: std::env::var("FUNCTION_UNDER_TEST").unwrap_or_default(),
            expected_coverage: std::env::var("EXPECTED_COVERAGE")
                .ok()
                .map(|v| {
                    v.trim().parse::<f64>().map_err(|e| {
                        ConfigError::InvalidValue("EXPECTED_COVERAGE".to_string(), format!("{}", e))
                    })
                })
                .transpose()?
                .unwrap_or(0.0),
        };

        Ok(Self {
            generate_url,
            root_dir,
            output_path,
            candidates,
            request,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(root_dir: PathBuf, output_path: PathBuf) -> Self {
        Self {
            generate_url: Url::parse(DEFAULT_GENERATE_URL).expect("default URL is valid"),
            root_dir,
            output_path,
            candidates: CandidateFilter::default(),
            request: RequestDefaults::default(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
