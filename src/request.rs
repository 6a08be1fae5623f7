//! Request parameters shared read-only by every source during a build

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Which subjects a build covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubjectSelection {
    /// Every subject the backing store knows
    #[default]
    All,
    /// Only the listed subject identifiers
    Only(BTreeSet<String>),
}

impl SubjectSelection {
    /// Whether a subject identifier is selected
    #[must_use]
    pub fn includes(&self, subject_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(subject_id),
        }
    }
}

/// Inclusive date window a build reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl MeasurementPeriod {
    /// Create a period; `start` must not be after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::Config(format!(
                "measurement period starts after it ends ({start} > {end})"
            )));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether an event starting at `start` and ending at `end` touches the period
    ///
    /// An open end means the event is still ongoing.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDateTime, end: Option<NaiveDateTime>) -> bool {
        let starts_in_time = start.date() <= self.end;
        let ends_in_time = end.is_none_or(|end| end.date() >= self.start);
        starts_in_time && ends_in_time
    }
}

/// Immutable description of the subjects and time window being assembled
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestContext {
    subjects: SubjectSelection,
    period: Option<MeasurementPeriod>,
}

impl RequestContext {
    /// Request every subject without a time window
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Request only the given subjects
    pub fn for_subjects<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subjects: SubjectSelection::Only(ids.into_iter().map(Into::into).collect()),
            period: None,
        }
    }

    /// Restrict the request to a measurement period
    #[must_use]
    pub const fn with_period(mut self, period: MeasurementPeriod) -> Self {
        self.period = Some(period);
        self
    }

    #[must_use]
    pub const fn subjects(&self) -> &SubjectSelection {
        &self.subjects
    }

    #[must_use]
    pub const fn period(&self) -> Option<&MeasurementPeriod> {
        self.period.as_ref()
    }
}
