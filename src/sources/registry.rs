//! The set of sources a build sweeps
//!
//! A registry is configured once and read-only afterwards. The standard
//! registry is process-wide and built on first use.

use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashSet;

use super::factory::{STANDARD_CATEGORIES, category_from_name};
use super::patient::PatientSource;
use super::{CategorySource, SubjectSource};
use crate::error::{Error, Result};
use crate::query::QuerySpec;
use crate::request::RequestContext;

static STANDARD: LazyLock<Arc<SourceRegistry>> = LazyLock::new(|| {
    Arc::new(SourceRegistry::with_categories_of(
        PatientSource,
        &STANDARD_CATEGORIES,
    ))
});

/// Subject source plus category sources in declared sweep order
pub struct SourceRegistry {
    subject: Box<dyn SubjectSource>,
    categories: Vec<Box<dyn CategorySource>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("subject", &self.subject.name())
            .field("categories", &self.category_names())
            .finish()
    }
}

impl SourceRegistry {
    /// Empty registry enumerating subjects with `subject`
    pub fn new(subject: impl SubjectSource + 'static) -> Self {
        Self {
            subject: Box::new(subject),
            categories: Vec::new(),
        }
    }

    /// All bundled categories over the `patient` table
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD)
    }

    /// Bundled categories restricted to `names`, in sweep order
    pub fn standard_subset<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut registry = Self::new(PatientSource);
        for name in names {
            let name = name.as_ref();
            let source = category_from_name(name)
                .ok_or_else(|| Error::Config(format!("Unknown category: {name}")))?;
            registry.register(source);
        }
        Ok(registry)
    }

    fn with_categories_of(subject: impl SubjectSource + 'static, names: &[&str]) -> Self {
        let mut registry = Self::new(subject);
        registry
            .categories
            .extend(names.iter().filter_map(|name| category_from_name(name)));
        registry
    }

    /// Add a category at the end of the sweep order
    #[must_use]
    pub fn with_category(mut self, source: impl CategorySource + 'static) -> Self {
        self.categories.push(Box::new(source));
        self
    }

    pub fn register(&mut self, source: Box<dyn CategorySource>) {
        self.categories.push(source);
    }

    #[must_use]
    pub fn subject(&self) -> &dyn SubjectSource {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn categories(&self) -> &[Box<dyn CategorySource>] {
        &self.categories
    }

    #[must_use]
    pub fn category_names(&self) -> Vec<&'static str> {
        self.categories.iter().map(|source| source.name()).collect()
    }

    /// Check every source against the source contract
    ///
    /// Names must be non-empty and unique, and every query must name a table
    /// and a subject column that its projection selects.
    pub fn validate(&self) -> Result<()> {
        let probe = RequestContext::all();
        check_query(self.subject.name(), &self.subject.query_spec(&probe))?;

        let mut seen = FxHashSet::default();
        for source in &self.categories {
            let name = source.name();
            if !seen.insert(name) {
                return Err(non_conforming(name, "category name is registered twice"));
            }
            if name == self.subject.name() {
                return Err(non_conforming(name, "category name shadows the subject source"));
            }
            check_query(name, &source.query_spec(&probe))?;
        }
        Ok(())
    }
}

fn check_query(name: &str, spec: &QuerySpec) -> Result<()> {
    if name.trim().is_empty() {
        return Err(non_conforming(name, "source name is empty"));
    }
    if spec.table.trim().is_empty() {
        return Err(non_conforming(name, "query names no table"));
    }
    if spec.subject_column.trim().is_empty() {
        return Err(non_conforming(name, "query names no subject column"));
    }
    if !spec.columns.is_empty() && !spec.columns.contains(&spec.subject_column) {
        return Err(non_conforming(
            name,
            &format!("projection does not select subject column `{}`", spec.subject_column),
        ));
    }
    Ok(())
}

fn non_conforming(name: &str, reason: &str) -> Error {
    Error::NonConformingSource {
        category: name.to_string(),
        reason: reason.to_string(),
    }
}
