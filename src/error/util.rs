//! Utility functions for error handling
//!
//! Filesystem checks with error messages that name the table being queried.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// Open a file, reporting which table needed it on failure
pub fn safe_open_file(path: &Path, table: &str) -> Result<fs::File> {
    if !path.is_file() {
        return Err(Error::query(
            table,
            format!("path is not a file: {}", path.display()),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let reason = match e.kind() {
            io::ErrorKind::PermissionDenied => "permission denied",
            io::ErrorKind::NotFound => "file removed during query",
            _ => "failed to open file",
        };
        Error::query(table, format!("{reason}: {} ({e})", path.display()))
    })
}

/// Check that a directory exists and can be listed
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "directory not found for {purpose}: {}",
            path.display()
        )));
    }

    if !path.is_dir() {
        return Err(Error::Config(format!(
            "expected a directory for {purpose}: {}",
            path.display()
        )));
    }

    match fs::read_dir(path) {
        Ok(_) => Ok(()),
        Err(e) => Err(Error::Config(format!(
            "cannot read directory for {purpose}: {} ({e})",
            path.display()
        ))),
    }
}
