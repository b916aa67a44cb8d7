use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub judge: JudgeConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Judge service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    /// Evals endpoint URL.
    pub endpoint: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Judging model; None lets the service pick its default.
    #[serde(default)]
    pub model: Option<String>,
    /// Hit fields the judge evaluates.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    /// Ask the service for per-hit justifications.
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total judge attempts per query, including the first call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Maximum in-flight judge calls (respect the service's rate limits).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// NDCG cutoff; omit to evaluate the full hit list.
    #[serde(default)]
    pub ndcg_k: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            concurrency: default_concurrency(),
            ndcg_k: None,
        }
    }
}

fn default_api_key_env() -> String {
    "JUDGE_API_KEY".to_string()
}

fn default_fields() -> Vec<String> {
    vec!["text".to_string()]
}

fn default_debug() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in SEARCHEVAL_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("SEARCHEVAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.judge.endpoint.is_empty() {
            anyhow::bail!("judge.endpoint must not be empty");
        }

        if self.judge.fields.is_empty() {
            anyhow::bail!("judge.fields must name at least one field to evaluate");
        }

        if self.judge.max_retries == 0 {
            anyhow::bail!("judge.max_retries must be at least 1 (the first attempt counts)");
        }

        if self.run.concurrency == 0 {
            anyhow::bail!("run.concurrency must be greater than 0");
        }

        // Check both environment variable and .env file (dotenv already loaded in Config::load)
        std::env::var(&self.judge.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your judge API key.",
                self.judge.api_key_env
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[judge]
endpoint = "https://api.example.com/evals"
api_key_env = "JUDGE_API_KEY"
model = "judge-large"
fields = ["text", "title"]
debug = true
max_retries = 4
backoff_ms = 250

[run]
concurrency = 8
ndcg_k = 10
"#;

    fn with_config_env(config_path: &std::path::Path, api_key: Option<&str>, f: impl FnOnce()) {
        let original_config = std::env::var("SEARCHEVAL_CONFIG").ok();
        let original_key = std::env::var("JUDGE_API_KEY").ok();
        std::env::set_var("SEARCHEVAL_CONFIG", config_path.to_str().unwrap());
        match api_key {
            Some(k) => std::env::set_var("JUDGE_API_KEY", k),
            None => std::env::remove_var("JUDGE_API_KEY"),
        }
        f();
        std::env::remove_var("SEARCHEVAL_CONFIG");
        std::env::remove_var("JUDGE_API_KEY");
        if let Some(val) = original_config {
            std::env::set_var("SEARCHEVAL_CONFIG", val);
        }
        if let Some(val) = original_key {
            std::env::set_var("JUDGE_API_KEY", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.judge.endpoint, "https://api.example.com/evals");
            assert_eq!(config.judge.model.as_deref(), Some("judge-large"));
            assert_eq!(config.judge.fields, ["text", "title"]);
            assert_eq!(config.judge.max_retries, 4);
            assert_eq!(config.run.concurrency, 8);
            assert_eq!(config.run.ndcg_k, Some(10));
        });
    }

    #[test]
    fn test_config_defaults() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[judge]\nendpoint = \"https://api.example.com/evals\"\n",
        )
        .unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let config = Config::load().unwrap();
            assert_eq!(config.judge.fields, ["text"]);
            assert!(config.judge.debug);
            assert_eq!(config.judge.timeout_secs, 30);
            assert_eq!(config.judge.max_retries, 3);
            assert_eq!(config.run.concurrency, 4);
            assert_eq!(config.run.ndcg_k, None);
        });
    }

    #[test]
    fn test_config_missing_api_key() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, None, || {
            let config = Config::load();
            assert!(config.is_err(), "Expected missing API key error");
            assert!(config.unwrap_err().to_string().contains("JUDGE_API_KEY"));
        });
    }

    #[test]
    fn test_config_rejects_zero_concurrency() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[judge]\nendpoint = \"https://api.example.com/evals\"\n\n[run]\nconcurrency = 0\n",
        )
        .unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("concurrency"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("SEARCHEVAL_CONFIG").ok();
        std::env::set_var("SEARCHEVAL_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("SEARCHEVAL_CONFIG");
        if let Some(v) = original {
            std::env::set_var("SEARCHEVAL_CONFIG", v);
        }
    }
}
