//! Declaration Context
//!
//! The key/value object a stack reads its runtime parameters from. Entries
//! are merged from the config file's `[context]` table, the on-disk context
//! cache and `-c key=value` flags, in increasing precedence.
//!
//! Lookups the pass could not answer are recorded as [`MissingContext`] so
//! the caller can resolve them and run the pass again.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::constructs::ImageQuery;
use crate::error::{Error, Result};

/// File name of the context cache in the project directory
pub const CONTEXT_FILE: &str = "stack.context.json";

/// Provider that answers a missing lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextProviderKind {
    /// Newest machine image matching a filter
    AmiProvider,
}

/// A lookup the declaration pass needed but could not answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingContext {
    pub key: String,
    pub provider: ContextProviderKind,
    pub query: ImageQuery,
    pub account: String,
    pub region: String,
}

/// Key/value context for one declaration pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationContext {
    values: IndexMap<String, Value>,
}

impl DeclarationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for `key`. Numbers and booleans are rendered as text;
    /// null, arrays and objects count as absent.
    pub fn try_get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Overlay `other`; its entries win.
    pub fn merge(&mut self, other: DeclarationContext) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    /// Parse a `key=value` assignment as given to `-c`.
    ///
    /// Only the first `=` separates; the value may itself contain `=`.
    pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            Error::invalid_config(
                "context",
                format!("expected KEY=VALUE, got '{}'", assignment),
            )
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::invalid_config(
                "context",
                format!("empty key in '{}'", assignment),
            ));
        }
        Ok((key.to_string(), value.to_string()))
    }

    /// Build a context from `key=value` assignments, later ones winning.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut context = Self::new();
        for assignment in assignments {
            let (key, value) = Self::parse_assignment(assignment.as_ref())?;
            context.set(key, value);
        }
        Ok(context)
    }

    /// Read the context cache in `project_dir`; a missing file is empty.
    pub fn load_cache(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONTEXT_FILE);
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(&path)?;
        let context: Self = serde_json::from_str(&content)?;
        debug!(path = %path.display(), entries = context.len(), "Loaded context cache");
        Ok(context)
    }

    /// Write `entries` into the context cache in `project_dir`, keeping what
    /// is already there.
    pub fn save_cache(project_dir: &Path, entries: &DeclarationContext) -> Result<()> {
        let mut cached = Self::load_cache(project_dir)?;
        cached.merge(entries.clone());
        cached.values.sort_keys();

        let path = project_dir.join(CONTEXT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&cached)? + "\n")?;
        debug!(path = %path.display(), entries = cached.len(), "Saved context cache");
        Ok(())
    }
}

impl FromIterator<(String, Value)> for DeclarationContext {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
