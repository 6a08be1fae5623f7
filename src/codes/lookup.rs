//! Reference data used to resolve code display terms

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::CodeSystem;
use crate::error::Result;

/// Read-only resolution of a code to its canonical term
pub trait CodeLookup: Send + Sync {
    /// Canonical display term of `code` in `system`, if known
    fn lookup(&self, system: CodeSystem, code: &str) -> Option<String>;
}

/// Lookup that knows no terms
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCodeLookup;

impl CodeLookup for NoCodeLookup {
    fn lookup(&self, _system: CodeSystem, _code: &str) -> Option<String> {
        None
    }
}

/// One row of a code table file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTableEntry {
    pub system: CodeSystem,
    pub code: String,
    pub display: String,
}

/// In-memory code table
#[derive(Debug, Default, Clone)]
pub struct CodeTable {
    terms: FxHashMap<(CodeSystem, String), String>,
}

impl CodeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of `{ "system", "code", "display" }` entries
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let entries: Vec<CodeTableEntry> = serde_json::from_str(&text)?;
        let table: Self = entries.into_iter().collect();
        log::info!("Loaded {} code terms from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn insert(&mut self, system: CodeSystem, code: impl Into<String>, display: impl Into<String>) {
        self.terms.insert((system, code.into()), display.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl FromIterator<CodeTableEntry> for CodeTable {
    fn from_iter<I: IntoIterator<Item = CodeTableEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry.system, entry.code, entry.display);
        }
        table
    }
}

impl CodeLookup for CodeTable {
    fn lookup(&self, system: CodeSystem, code: &str) -> Option<String> {
        self.terms.get(&(system, code.to_string())).cloned()
    }
}
