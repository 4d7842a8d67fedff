use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gazelock_core::SessionConfig;
use serde::Serialize;

/// CLI configuration: an optional TOML file, then `GAZELOCK_*` environment
/// overrides.
#[derive(Debug, Serialize)]
pub struct Config {
    /// TOML file holding enrolled patterns.
    pub enrollment_path: PathBuf,
    pub session: SessionConfig,
}

impl Config {
    /// Load from `config_file` (or `GAZELOCK_CONFIG`) and the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let path = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("GAZELOCK_CONFIG").ok().map(PathBuf::from));

        let contents = match &path {
            Some(p) => Some(
                std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?,
            ),
            None => None,
        };

        Self::from_parts(contents.as_deref(), |key| std::env::var(key).ok())
    }

    fn from_parts(toml_text: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut session: SessionConfig = match toml_text {
            Some(text) => toml::from_str(text).context("invalid session config")?,
            None => SessionConfig::default(),
        };

        if let Some(v) = env_parse(&env, "GAZELOCK_PACING_MS") {
            session.pacing_ms = v;
        }
        if let Some(v) = env_parse(&env, "GAZELOCK_PATTERN_LEN") {
            session.pattern_len = v;
        }
        if let Some(v) = env("GAZELOCK_RECORD_TRACE") {
            session.record_trace = v != "0";
        }
        session.validate().context("invalid session config")?;

        let enrollment_path = env("GAZELOCK_ENROLLMENT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(&env).join("enrollment.toml"));

        Ok(Self {
            enrollment_path,
            session,
        })
    }
}

fn default_data_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("gazelock")
}

fn env_parse<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
