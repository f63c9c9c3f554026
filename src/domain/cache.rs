//! Build-layer cache keys and restore outcomes.

use serde::{Deserialize, Serialize};

/// Namespace shared by every cache key
pub const CACHE_KEY_NAMESPACE: &str = "datateer-docker-pipeline";

/// Composite cache key with fallback restore prefixes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    /// Exact key: `{namespace}-{client}-{env}-{hash}`
    pub primary: String,

    /// Prefixes from most to least specific
    pub restore_prefixes: Vec<String>,
}

impl CacheKey {
    pub fn new(client_code: &str, environment: &str, content_hash: &str) -> Self {
        let client_env = format!("{}-{}-{}-", CACHE_KEY_NAMESPACE, client_code, environment);
        let client = format!("{}-{}-", CACHE_KEY_NAMESPACE, client_code);
        let unscoped = format!("{}-", CACHE_KEY_NAMESPACE);

        Self {
            primary: format!("{}{}", client_env, content_hash),
            restore_prefixes: vec![client_env, client, unscoped],
        }
    }
}

/// Result of attempting a cache restore.
///
/// None of these outcomes fail a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CacheOutcome {
    /// An archive was loaded; `key` is the key that matched
    Restored { key: String },

    /// No archive matched any key
    Miss,

    /// Restore was attempted and failed
    Error { message: String },
}

impl CacheOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }

    /// One-line summary for the run journal
    pub fn summary(&self) -> String {
        match self {
            Self::Restored { key } => format!("Layer cache restored from '{}'", key),
            Self::Miss => "No layer cache found, building cold".to_string(),
            Self::Error { message } => format!("Layer cache restore failed: {}", message),
        }
    }
}
