//! Batch report
//!
//! Aggregated per-file outcomes, rendered for humans or as JSON.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::WeaveError;

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FileOutcome {
    /// New content written (or would be, in a dry run)
    Changed,
    /// Already up to date
    Unchanged,
    /// No entity class in the file
    NotAnEntity,
    /// Processing failed, file untouched
    Failed {
        /// Error category
        kind: String,
        /// Error message
        message: String,
    },
}

impl FileOutcome {
    /// Outcome for an error
    #[must_use]
    pub fn failed(error: &WeaveError) -> Self {
        Self::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Source file
    pub path: PathBuf,
    /// Result
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Per-file outcomes, in discovery order
    pub files: Vec<FileReport>,
    /// Classes marked `@Keep` as a whole
    pub kept_classes: usize,
    /// `@Keep` members encountered
    pub kept_members: usize,
    /// Nothing was written
    pub dry_run: bool,
    /// Batch stopped at the first failure
    pub stopped_early: bool,
}

impl BatchReport {
    /// Create empty report
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Record a file outcome
    pub fn push(&mut self, path: impl Into<PathBuf>, outcome: FileOutcome) {
        self.files.push(FileReport {
            path: path.into(),
            outcome,
        });
    }

    fn count(&self, matches: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| matches(&f.outcome)).count()
    }

    /// Files with new content
    #[must_use]
    pub fn changed(&self) -> usize {
        self.count(|o| *o == FileOutcome::Changed)
    }

    /// Files already up to date
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|o| *o == FileOutcome::Unchanged)
    }

    /// Files without an entity
    #[must_use]
    pub fn not_entities(&self) -> usize {
        self.count(|o| *o == FileOutcome::NotAnEntity)
    }

    /// Failed files
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> + '_ {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
    }

    /// Check if every file was processed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Human readable summary
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let verb = if self.dry_run { "Would change" } else { "Changed" };
        for file in self.files.iter().filter(|f| f.outcome == FileOutcome::Changed) {
            let _ = writeln!(out, "{verb} {}", file.path.display());
        }
        for file in self.failures() {
            if let FileOutcome::Failed { message, .. } = &file.outcome {
                let _ = writeln!(out, "Error in {}: {message}", file.path.display());
            }
        }
        let _ = writeln!(
            out,
            "Processed {} files: {} changed, {} unchanged, {} without entity, {} failed",
            self.files.len(),
            self.changed(),
            self.unchanged(),
            self.not_entities(),
            self.failures().count()
        );
        if self.kept_classes > 0 || self.kept_members > 0 {
            let _ = writeln!(
                out,
                "Kept source for {} classes and {} methods because of @Keep annotation",
                self.kept_classes, self.kept_members
            );
        }
        if self.stopped_early {
            out.push_str("Stopped after the first failure\n");
        }
        out
    }

    /// JSON rendering
    ///
    /// # Errors
    /// Serialization errors from `serde_json`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> BatchReport {
        let mut report = BatchReport::new(false);
        report.push("src/Note.java", FileOutcome::Changed);
        report.push("src/Order.java", FileOutcome::Unchanged);
        report.push("src/Util.java", FileOutcome::NotAnEntity);
        report.push(
            "src/Bad.java",
            FileOutcome::Failed {
                kind: "drift".into(),
                message: "Constructor Bad() has been changed".into(),
            },
        );
        report.kept_members = 2;
        report
    }

    #[test]
    fn counts_by_outcome() {
        let report = sample();
        assert_eq!(report.changed(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.not_entities(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn text_lists_changes_errors_and_keep_summary() {
        let text = sample().render_text();
        assert_eq!(
            text,
            "Changed src/Note.java\n\
             Error in src/Bad.java: Constructor Bad() has been changed\n\
             Processed 4 files: 1 changed, 1 unchanged, 1 without entity, 1 failed\n\
             Kept source for 0 classes and 2 methods because of @Keep annotation\n"
        );
    }

    #[test]
    fn json_flattens_outcomes() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["files"][0]["outcome"], "changed");
        assert_eq!(json["files"][3]["kind"], "drift");
        assert_eq!(json["kept_members"], 2);
    }

    #[test]
    fn empty_batch_is_success() {
        let report = BatchReport::new(true);
        assert!(report.is_success());
        assert_eq!(
            report.render_text(),
            "Processed 0 files: 0 changed, 0 unchanged, 0 without entity, 0 failed\n"
        );
    }
}
