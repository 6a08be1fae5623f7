//! The aggregation engine
//!
//! A build runs in two phases. Subject enumeration asks the subject source
//! for every subject of the request and creates one [`QdmPatient`] each; this
//! closes the set of patients records may attach to. The category sweep then
//! runs every registered category source, converts each record and appends
//! the resulting data element to the patient its subject id names.
//!
//! Faults confined to one record (no model, failed conversion, and orphaned
//! records under [`OrphanPolicy::Skip`]) are logged, counted and skipped.
//! Structural faults and query failures abort the whole build.

pub mod report;
pub mod subject_map;

pub use report::{BuildReport, CategoryReport};
pub use subject_map::SubjectMap;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::codes::CodeLookup;
use crate::config::{BuilderConfig, OrphanPolicy};
use crate::error::{Error, Result};
use crate::models::QdmPatient;
use crate::query::{QueryExecutor, RecordEnvelope};
use crate::request::{RequestContext, SubjectSelection};
use crate::sources::{CategorySource, Conversion, ConversionContext, SourceRegistry};
use crate::utils::logging::{
    create_main_progress_bar, finish_progress_bar, log_operation_complete, log_operation_start,
};

/// Log target for records attributed to subjects that were never enumerated
pub const ATTRIBUTION_LOG_TARGET: &str = "qdm_builder::attribution";

/// Patients of a build together with its report
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub patients: Vec<QdmPatient>,
    pub report: BuildReport,
}

/// Builds one QDM patient per subject from the registered sources
pub struct QdmBuilder {
    executor: Arc<dyn QueryExecutor>,
    codes: Arc<dyn CodeLookup>,
    registry: Arc<SourceRegistry>,
    config: BuilderConfig,
}

impl QdmBuilder {
    /// Builder over the standard sources
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        codes: Arc<dyn CodeLookup>,
        config: BuilderConfig,
    ) -> Result<Self> {
        Self::with_registry(executor, codes, SourceRegistry::standard(), config)
    }

    /// Builder over a custom set of sources
    ///
    /// The configuration and every registered source are validated here, so a
    /// non-conforming source never reaches a build.
    pub fn with_registry(
        executor: Arc<dyn QueryExecutor>,
        codes: Arc<dyn CodeLookup>,
        registry: Arc<SourceRegistry>,
        config: BuilderConfig,
    ) -> Result<Self> {
        config.validate()?;
        registry.validate()?;
        Ok(Self {
            executor,
            codes,
            registry,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Build the patients of a request, in subject enumeration order
    pub fn build(&self, ctx: &RequestContext) -> Result<Vec<QdmPatient>> {
        Ok(self.build_with_report(ctx)?.patients)
    }

    /// Build the patients of a request and report what happened to each record
    pub fn build_with_report(&self, ctx: &RequestContext) -> Result<BuildOutput> {
        let start = Instant::now();
        log_operation_start("Building QDM patients for", &describe(ctx));

        let cx = ConversionContext::new(self.codes.as_ref(), &self.config.date_formats);
        let (subjects, duplicate_subjects) = self.enumerate_subjects(ctx, &cx)?;

        let categories = if self.config.parallel {
            self.sweep_parallel(ctx, &cx, &subjects)?
        } else {
            self.sweep_sequential(ctx, &cx, &subjects)?
        };

        let patients = subjects.into_patients()?;
        let report = BuildReport {
            subjects: patients.len(),
            duplicate_subjects,
            categories,
            elapsed: start.elapsed(),
        };

        log_operation_complete("built", "QDM patients", patients.len(), Some(report.elapsed));
        info!(
            "{} data elements attached from {} records ({} without model, {} failed, {} orphaned)",
            report.attached(),
            report.records(),
            report.no_model(),
            report.failed(),
            report.orphaned()
        );

        Ok(BuildOutput { patients, report })
    }

    /// Phase 1: one patient per distinct subject
    fn enumerate_subjects(
        &self,
        ctx: &RequestContext,
        cx: &ConversionContext<'_>,
    ) -> Result<(SubjectMap, usize)> {
        let source = self.registry.subject();
        let spec = source.query_spec(ctx);
        let mut subjects = SubjectMap::new();
        let mut duplicates = 0;

        for record in source.execute_query(ctx, self.executor.as_ref())? {
            let envelope = RecordEnvelope::new(source.name(), &spec.subject_column, record?)?;
            let patient = source
                .make_patient(envelope.subject_id(), envelope.data(), cx)
                .map_err(|err| Error::SubjectConversion {
                    subject_id: envelope.subject_id().to_string(),
                    reason: err.to_string(),
                })?;

            let (subject_id, _) = envelope.into_parts();
            if !subjects.insert(subject_id.clone(), patient) {
                warn!(
                    "{}: duplicate subject {subject_id}, the later record replaces the earlier one",
                    source.name()
                );
                duplicates += 1;
            }
        }

        info!("Enumerated {} subjects", subjects.len());
        Ok((subjects, duplicates))
    }

    fn sweep_sequential(
        &self,
        ctx: &RequestContext,
        cx: &ConversionContext<'_>,
        subjects: &SubjectMap,
    ) -> Result<Vec<CategoryReport>> {
        let progress = self.progress_bar();
        let never_cancelled = AtomicBool::new(false);

        let mut reports = Vec::with_capacity(self.registry.categories().len());
        for source in self.registry.categories() {
            reports.push(self.sweep_category(
                source.as_ref(),
                ctx,
                cx,
                subjects,
                &never_cancelled,
            )?);
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = &progress {
            finish_progress_bar(pb, Some("Category sweep complete"));
        }
        Ok(reports)
    }

    /// Sweep categories concurrently; the first failure cancels the others
    fn sweep_parallel(
        &self,
        ctx: &RequestContext,
        cx: &ConversionContext<'_>,
        subjects: &SubjectMap,
    ) -> Result<Vec<CategoryReport>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_threads)
            .build()
            .map_err(|e| Error::InvalidOperation(format!("Failed to build thread pool: {e}")))?;

        let progress = self.progress_bar();
        let cancel = AtomicBool::new(false);

        let results: Vec<Result<CategoryReport>> = pool.install(|| {
            self.registry
                .categories()
                .par_iter()
                .map(|source| {
                    let result = self.sweep_category(source.as_ref(), ctx, cx, subjects, &cancel);
                    if result.is_err() {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                    result
                })
                .collect()
        });

        if let Some(pb) = &progress {
            finish_progress_bar(pb, Some("Category sweep complete"));
        }

        // Report the error that caused the cancellation, not a cancelled sweep
        let mut cancelled = false;
        let mut reports = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(Error::Cancelled) => cancelled = true,
                Err(err) => return Err(err),
            }
        }
        if cancelled {
            return Err(Error::Cancelled);
        }
        Ok(reports)
    }

    /// Phase 2 for one category
    fn sweep_category(
        &self,
        source: &dyn CategorySource,
        ctx: &RequestContext,
        cx: &ConversionContext<'_>,
        subjects: &SubjectMap,
        cancel: &AtomicBool,
    ) -> Result<CategoryReport> {
        let start = Instant::now();
        let name = source.name();
        let spec = source.query_spec(ctx);
        let mut report = CategoryReport::new(name);
        debug!("Sweeping {name} from table {}", spec.table);

        for record in source.execute_query(ctx, self.executor.as_ref())? {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }

            let envelope = RecordEnvelope::new(name, &spec.subject_column, record?)?;
            report.records += 1;

            match source.make_model(envelope.data(), cx) {
                Conversion::Model(element) => {
                    if subjects.attach(envelope.subject_id(), element)? {
                        report.attached += 1;
                    } else {
                        self.orphaned(name, envelope.subject_id())?;
                        report.orphaned += 1;
                    }
                }
                Conversion::NoModel => {
                    warn!(
                        "{name}: no data element for subject {}",
                        envelope.subject_id()
                    );
                    report.no_model += 1;
                }
                Conversion::Failed(err) => {
                    error!(
                        "{name}: dropped record for subject {}: {err}",
                        envelope.subject_id()
                    );
                    report.failed += 1;
                }
            }
        }

        log_operation_complete("attached", name, report.attached, Some(start.elapsed()));
        Ok(report)
    }

    fn orphaned(&self, category: &str, subject_id: &str) -> Result<()> {
        match self.config.orphan_policy {
            OrphanPolicy::Skip => {
                error!(
                    target: ATTRIBUTION_LOG_TARGET,
                    "{category}: record references subject {subject_id}, which was not enumerated; skipping"
                );
                Ok(())
            }
            OrphanPolicy::Fail => Err(Error::OrphanedRecord {
                category: category.to_string(),
                subject_id: subject_id.to_string(),
            }),
        }
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        self.config.show_progress.then(|| {
            create_main_progress_bar(
                self.registry.categories().len() as u64,
                Some("Sweeping categories"),
            )
        })
    }
}

fn describe(ctx: &RequestContext) -> String {
    let subjects = match ctx.subjects() {
        SubjectSelection::All => "all subjects".to_string(),
        SubjectSelection::Only(ids) => format!("{} selected subjects", ids.len()),
    };
    match ctx.period() {
        Some(period) => format!("{subjects} from {} to {}", period.start(), period.end()),
        None => subjects,
    }
}
