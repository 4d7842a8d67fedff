//! Enrollment file: users' patterns as TOML.
//!
//! ```toml
//! [users.alice]
//! pattern = ["left", "center", "right", "blink"]
//! ```
//!
//! Tokens are kept as written; the session validates them when it starts.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use gazelock_core::{PatternStore, StoreError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UserEntry {
    pattern: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollmentFile {
    #[serde(default)]
    users: BTreeMap<String, UserEntry>,
}

impl EnrollmentFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read enrollment file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid enrollment file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl PatternStore for EnrollmentFile {
    fn enrolled_pattern(&self, user: &str) -> Result<Vec<String>, StoreError> {
        self.users
            .get(user)
            .map(|entry| entry.pattern.clone())
            .ok_or_else(|| StoreError::UnknownUser(user.to_string()))
    }
}
