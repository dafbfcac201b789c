//! Codelists: curated sets of clinical codes with optional category labels
//!
//! Codelists are supplied in memory by the caller; reading them from CSV or any
//! other source happens outside the engine.

use cohort_diagnostics::{CohortError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category reported for a matched code that carries no category label
pub const UNCLASSIFIED: &str = "unclassified";

/// Coding system a codelist is drawn from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeSystem {
    Snomed,
    Icd10,
    Ctv3,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSystem::Snomed => f.write_str("snomed"),
            CodeSystem::Icd10 => f.write_str("icd10"),
            CodeSystem::Ctv3 => f.write_str("ctv3"),
            CodeSystem::Other(name) => f.write_str(name),
        }
    }
}

/// An ordered set of codes of one system, each optionally mapped to a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codelist {
    system: CodeSystem,
    entries: IndexMap<String, Option<String>>,
}

impl Codelist {
    /// Build a codelist from `(code, category)` pairs. Codes must be unique.
    pub fn new<C, L>(
        system: CodeSystem,
        entries: impl IntoIterator<Item = (C, Option<L>)>,
    ) -> Result<Self>
    where
        C: Into<String>,
        L: Into<String>,
    {
        let mut map = IndexMap::new();
        for (code, category) in entries {
            let code = code.into();
            if map.contains_key(&code) {
                return Err(CohortError::invalid_codelist(format!(
                    "code '{}' appears more than once in {} codelist",
                    code, system
                )));
            }
            map.insert(code, category.map(Into::into));
        }
        Ok(Self {
            system,
            entries: map,
        })
    }

    /// Build an uncategorised codelist
    pub fn from_codes<C: Into<String>>(
        system: CodeSystem,
        codes: impl IntoIterator<Item = C>,
    ) -> Result<Self> {
        Self::new(system, codes.into_iter().map(|c| (c, None::<String>)))
    }

    pub fn system(&self) -> &CodeSystem {
        &self.system
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Category label of a member code; `None` for non-members and uncategorised codes
    pub fn category_of(&self, code: &str) -> Option<&str> {
        self.entries.get(code).and_then(|c| c.as_deref())
    }

    /// Category of a matched code, falling back to [`UNCLASSIFIED`]
    pub fn category_or_unclassified(&self, code: &str) -> &str {
        self.category_of(code).unwrap_or(UNCLASSIFIED)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn has_categories(&self) -> bool {
        self.entries.values().any(Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named codelists available to a study
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodelistSet {
    lists: IndexMap<String, Codelist>,
}

impl CodelistSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codelist under a name; names are unique
    pub fn insert(&mut self, name: impl Into<String>, codelist: Codelist) -> Result<()> {
        let name = name.into();
        if self.lists.contains_key(&name) {
            return Err(CohortError::invalid_codelist(format!(
                "codelist '{}' is registered twice",
                name
            )));
        }
        self.lists.insert(name, codelist);
        Ok(())
    }

    pub fn with(mut self, name: impl Into<String>, codelist: Codelist) -> Result<Self> {
        self.insert(name, codelist)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Codelist> {
        self.lists.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }
}
