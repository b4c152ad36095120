//! Batch driver
//!
//! Discovers entity sources, extracts every model, then reconciles the
//! files in parallel. Files are independent: a failure aborts only its own
//! file unless `fail_fast` is set, in which case files are processed in
//! order and the batch stops at the first failure.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use daoweave_model::{EntityModel, ModelError, ModelExtractor};
use daoweave_syntax::SourceTree;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::WeaveConfig;
use crate::error::{WeaveError, WeaveResult};
use crate::planner::{EntityIndex, GenerationPlanner, Reconciled};
use crate::report::{BatchReport, FileOutcome};

const ENTITY_MARKER: &str = "@Entity";

/// Runs reconciliation over a set of source files
#[derive(Debug, Clone)]
pub struct BatchDriver {
    config: WeaveConfig,
}

impl BatchDriver {
    /// Create driver
    #[inline]
    #[must_use]
    pub fn new(config: WeaveConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Every `*.java` file under the configured roots, sorted
    ///
    /// A root may also name a single file.
    ///
    /// # Errors
    /// [`WeaveError::Io`] if a root cannot be walked
    pub fn discover(&self) -> WeaveResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for root in &self.config.source_dirs {
            if root.is_file() {
                if is_java(root) {
                    files.push(root.clone());
                }
                continue;
            }
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    WeaveError::io(path, e.into())
                })?;
                if entry.file_type().is_file() && is_java(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }
        files.sort();
        files.dedup();
        tracing::debug!(files = files.len(), "discovered source files");
        Ok(files)
    }

    /// Discover and process every file
    ///
    /// # Errors
    /// [`WeaveError::Io`] if discovery fails; per-file errors end up in the report
    pub fn run(&self) -> WeaveResult<BatchReport> {
        let files = self.discover()?;
        Ok(self.run_files(&files))
    }

    /// Process the given files
    #[must_use]
    pub fn run_files(&self, files: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::new(self.config.dry_run);
        let mut outcomes: Vec<Option<FileOutcome>> = vec![None; files.len()];
        let siblings = siblings_by_directory(files);

        let indexed: Vec<(usize, &PathBuf)> = files.iter().enumerate().collect();
        let loaded = self.process(&indexed, |(_, path)| self.load(path, &siblings));

        let mut models: Vec<(usize, EntityModel)> = Vec::new();
        let mut failed = HashSet::new();
        for ((index, path), result) in indexed.iter().zip(loaded) {
            let result = result.and_then(|model| match model {
                Some(model) if !self.config.has_schema(&model.schema) => Err(LoadError {
                    entity: Some(model.qualified_name()),
                    error: ModelError::validation(&model.name, format!("Undefined schema \"{}\"", model.schema))
                        .into(),
                }),
                other => Ok(other),
            });
            outcomes[*index] = Some(match result {
                Ok(Some(model)) => {
                    models.push((*index, model));
                    continue;
                }
                Ok(None) => FileOutcome::NotAnEntity,
                Err(LoadError { entity, error }) => {
                    tracing::error!(path = %path.display(), %error, "cannot load entity");
                    failed.extend(entity);
                    report.stopped_early = self.config.fail_fast;
                    FileOutcome::failed(&error)
                }
            });
            if report.stopped_early {
                break;
            }
        }

        if !report.stopped_early {
            let index = EntityIndex::new(models.iter().map(|(_, m)| m)).with_failed(failed);
            let planner = GenerationPlanner::new(&self.config, &index);
            let results = self.process(&models, |(_, model)| self.apply(&planner, model));
            for ((file, model), result) in models.iter().zip(results) {
                outcomes[*file] = Some(match result {
                    Ok(reconciled) => {
                        report.kept_members += reconciled.kept_members;
                        report.kept_classes += usize::from(reconciled.kept_class);
                        if reconciled.text.is_some() {
                            FileOutcome::Changed
                        } else {
                            FileOutcome::Unchanged
                        }
                    }
                    Err(error) => {
                        tracing::error!(path = %model.path().display(), %error, "cannot reconcile entity");
                        report.stopped_early = self.config.fail_fast;
                        FileOutcome::failed(&error)
                    }
                });
            }
        }

        for (path, outcome) in files.iter().zip(outcomes) {
            if let Some(outcome) = outcome {
                report.push(path.clone(), outcome);
            }
        }
        tracing::info!(
            files = report.files.len(),
            changed = report.changed(),
            failed = report.failures().count(),
            "batch finished"
        );
        report
    }

    /// Map items in parallel, or in order up to the first error when failing fast
    fn process<T, R, E, F>(&self, items: &[T], f: F) -> Vec<Result<R, E>>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync + Send,
    {
        if !self.config.fail_fast {
            return items.par_iter().map(f).collect();
        }
        let mut results = Vec::new();
        for item in items {
            let result = f(item);
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }
        results
    }

    fn load(&self, path: &Path, siblings: &HashMap<PathBuf, Vec<String>>) -> Result<Option<EntityModel>, LoadError> {
        let text = fs::read_to_string(path).map_err(|e| LoadError::from(WeaveError::io(path, e)))?;
        if !text.contains(ENTITY_MARKER) {
            tracing::debug!(path = %path.display(), "no entity marker");
            return Ok(None);
        }
        let tree = SourceTree::parse(text).map_err(|e| LoadError::from(WeaveError::from(e)))?;
        let entity = tree.class().map(|class| match tree.package_name() {
            "" => class.name.clone(),
            package => format!("{package}.{}", class.name),
        });
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let extractor = ModelExtractor::new(path).with_siblings(siblings.get(&directory).cloned().unwrap_or_default());
        match extractor.extract(tree) {
            Ok(extraction) => Ok(extraction.into_entity()),
            Err(error) => Err(LoadError {
                entity,
                error: error.into(),
            }),
        }
    }

    fn apply(&self, planner: &GenerationPlanner<'_>, model: &EntityModel) -> WeaveResult<Reconciled> {
        let reconciled = planner.reconcile(model)?;
        let path = model.path();
        match &reconciled.text {
            Some(text) => {
                if !self.config.dry_run {
                    fs::write(path, text).map_err(|e| WeaveError::io(path, e))?;
                }
                tracing::info!(path = %path.display(), dry_run = self.config.dry_run, "Change");
            }
            None => tracing::info!(path = %path.display(), "Skip"),
        }
        Ok(reconciled)
    }
}

/// Failed load, with the class it declares when known
struct LoadError {
    entity: Option<String>,
    error: WeaveError,
}

impl From<WeaveError> for LoadError {
    fn from(error: WeaveError) -> Self {
        Self { entity: None, error }
    }
}

/// Reconcile one source text on its own
///
/// Relations can only target the entity itself. Returns `None` when the
/// text is not an entity or needs no change.
///
/// # Errors
/// Parse, model and reconciliation errors of the text
pub fn reconcile_source(
    config: &WeaveConfig,
    path: impl Into<PathBuf>,
    text: &str,
    siblings: impl IntoIterator<Item = String>,
) -> WeaveResult<Option<String>> {
    let tree = SourceTree::parse(text)?;
    let Some(model) = ModelExtractor::new(path).with_siblings(siblings).extract(tree)?.into_entity() else {
        return Ok(None);
    };
    let index = EntityIndex::new([&model]);
    Ok(GenerationPlanner::new(config, &index).reconcile(&model)?.text)
}

fn is_java(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "java")
}

/// Class names visible without import, by directory
fn siblings_by_directory(files: &[PathBuf]) -> HashMap<PathBuf, Vec<String>> {
    let mut siblings: HashMap<PathBuf, Vec<String>> = HashMap::new();
    for file in files {
        let (Some(directory), Some(stem)) = (file.parent(), file.file_stem()) else {
            continue;
        };
        siblings
            .entry(directory.to_path_buf())
            .or_default()
            .push(stem.to_string_lossy().into_owned());
    }
    siblings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_are_grouped_by_directory() {
        let files = [
            PathBuf::from("a/Note.java"),
            PathBuf::from("a/Order.java"),
            PathBuf::from("b/Customer.java"),
        ];
        let siblings = siblings_by_directory(&files);
        assert_eq!(siblings[Path::new("a")], ["Note", "Order"]);
        assert_eq!(siblings[Path::new("b")], ["Customer"]);
    }

    #[test]
    fn only_java_sources_count() {
        assert!(is_java(Path::new("Note.java")));
        assert!(!is_java(Path::new("Note.kt")));
        assert!(!is_java(Path::new("java")));
    }
}
