use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no enrolled pattern for user '{0}'")]
    UnknownUser(String),
    #[error("pattern store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to users' enrolled patterns.
///
/// Patterns come back as the raw stored tokens; validation happens when a
/// session starts so that malformed enrollments are reported before any frame
/// is read.
pub trait PatternStore {
    fn enrolled_pattern(&self, user: &str) -> Result<Vec<String>, StoreError>;
}

impl<T: PatternStore + ?Sized> PatternStore for &T {
    fn enrolled_pattern(&self, user: &str) -> Result<Vec<String>, StoreError> {
        (**self).enrolled_pattern(user)
    }
}

/// In-memory store, keyed by user name.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatternStore {
    patterns: HashMap<String, Vec<String>>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, user: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .insert(user.to_string(), tokens.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PatternStore for MemoryPatternStore {
    fn enrolled_pattern(&self, user: &str) -> Result<Vec<String>, StoreError> {
        self.patterns
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::UnknownUser(user.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_user() {
        let mut store = MemoryPatternStore::new();
        store.insert("alice", ["left", "right", "center", "blink"]);
        assert_eq!(
            store.enrolled_pattern("alice").unwrap(),
            vec!["left", "right", "center", "blink"]
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_user() {
        let store = MemoryPatternStore::new();
        let err = store.enrolled_pattern("bob").unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser(u) if u == "bob"));
    }
}
