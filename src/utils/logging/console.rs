//! Console output utilities
//!
//! This module provides formatted console summaries of a build.

use crate::builder::BuildReport;

/// Print one line per category plus the totals of a build
pub fn print_build_summary(report: &BuildReport) {
    println!(
        "Built {} patients in {:?}",
        report.subjects, report.elapsed
    );
    if report.duplicate_subjects > 0 {
        println!("Skipped {} duplicate subject records", report.duplicate_subjects);
    }

    println!(
        "{:<24} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "category", "records", "attached", "no model", "failed", "orphaned"
    );
    for category in &report.categories {
        println!(
            "{:<24} {:>9} {:>9} {:>9} {:>9} {:>9}",
            category.category,
            category.records,
            category.attached,
            category.no_model,
            category.failed,
            category.orphaned
        );
    }
    println!(
        "{:<24} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "total",
        report.records(),
        report.attached(),
        report.no_model(),
        report.failed(),
        report.orphaned()
    );
}
