//! Counters describing what a build did with each record

use std::time::Duration;

use serde::Serialize;

/// Record outcomes of one category sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: String,
    /// Records returned by the category query
    pub records: usize,
    /// Data elements attached to a patient
    pub attached: usize,
    /// Records that produced no data element
    pub no_model: usize,
    /// Records whose conversion failed
    pub failed: usize,
    /// Converted records naming a subject that was not enumerated
    pub orphaned: usize,
}

impl CategoryReport {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Records that did not end up in any patient
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.no_model + self.failed + self.orphaned
    }
}

/// Summary of one build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Patients produced
    pub subjects: usize,
    /// Subject records that replaced an already enumerated patient
    pub duplicate_subjects: usize,
    /// One entry per category, in sweep order
    pub categories: Vec<CategoryReport>,
    pub elapsed: Duration,
}

impl BuildReport {
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|report| report.category == name)
    }

    #[must_use]
    pub fn records(&self) -> usize {
        self.categories.iter().map(|report| report.records).sum()
    }

    #[must_use]
    pub fn attached(&self) -> usize {
        self.categories.iter().map(|report| report.attached).sum()
    }

    #[must_use]
    pub fn no_model(&self) -> usize {
        self.categories.iter().map(|report| report.no_model).sum()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.categories.iter().map(|report| report.failed).sum()
    }

    #[must_use]
    pub fn orphaned(&self) -> usize {
        self.categories.iter().map(|report| report.orphaned).sum()
    }
}
