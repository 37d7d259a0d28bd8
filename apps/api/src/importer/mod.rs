//! CSV importer for the aptitude, practice and content catalogs.
//!
//! Each dataset is a fixed list of files. Every file resolves to either the
//! operator's private copy or the bundled `*_sample.csv`, is validated row by row,
//! and all accepted records are written as one atomic batch.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ImportPaths;
use crate::models::catalog::{CatalogRecord, DatasetKind, RecordTable};
use crate::store::{CatalogStore, ImportBatch, MemoryStore, StoreError, Upserted};

pub mod aptitude;
pub mod content;
pub mod csv_rows;
pub mod practice;
pub mod source;

pub use csv_rows::{RowError, RowSet};
pub use source::{resolve_source, ImportSource, ResolvedSource, SourceOrigin};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(
        "no {dataset} data found: neither {} nor {} is a readable file",
        .private.display(),
        .sample.display()
    )]
    SourceNotFound {
        dataset: DatasetKind,
        private: PathBuf,
        sample: PathBuf,
    },

    #[error("{0}")]
    Row(RowError),

    #[error("{dataset} import aborted: {} invalid row(s) in strict mode", .errors.len())]
    StrictAbort {
        dataset: DatasetKind,
        errors: Vec<RowError>,
    },

    #[error("failed to read CSV {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("cannot use {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One file of a dataset. Only the primary file is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpec {
    pub name: &'static str,
    pub required: bool,
}

/// Turns one resolved file into typed records. Parsers are stateful so that child
/// files can be checked against parents parsed earlier in the same run.
pub trait DatasetParser {
    fn parse_file(&mut self, file: &str, path: &Path) -> Result<RowSet<CatalogRecord>, ImportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Wipe the dataset's tables inside the import transaction.
    pub clear: bool,
    /// Abort on the first file containing an invalid row instead of skipping it.
    pub strict: bool,
    /// Validate and apply against a throwaway in-memory store.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub source: PathBuf,
    pub origin: SourceOrigin,
    /// Data rows read, header excluded.
    pub rows: usize,
    /// Rows that passed validation. Repeated natural keys count here but only the
    /// last occurrence is written.
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: Vec<RowError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportTotals {
    pub rows: usize,
    pub imported: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub dataset: DatasetKind,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    pub totals: ImportTotals,
}

impl ImportReport {
    fn new(dataset: DatasetKind, dry_run: bool, files: Vec<FileReport>) -> Self {
        let totals = files.iter().fold(ImportTotals::default(), |mut t, f| {
            t.rows += f.rows;
            t.imported += f.imported;
            t.skipped += f.skipped.len();
            t.created += f.created;
            t.updated += f.updated;
            t.unchanged += f.unchanged;
            t
        });
        Self {
            dataset,
            dry_run,
            files,
            totals,
        }
    }

    /// Rows were read but not a single one was usable.
    pub fn is_total_failure(&self) -> bool {
        self.totals.rows > 0 && self.totals.imported == 0
    }
}

struct PlannedFile {
    name: String,
    required: bool,
    source: ImportSource,
}

pub struct Importer {
    store: Arc<dyn CatalogStore>,
    paths: ImportPaths,
}

impl Importer {
    pub fn new(store: Arc<dyn CatalogStore>, paths: ImportPaths) -> Self {
        Self { store, paths }
    }

    pub async fn run(
        &self,
        dataset: DatasetKind,
        options: &ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let plan = self.plan(dataset)?;
        let mut parser = parser_for(dataset);

        let mut files: Vec<FileReport> = Vec::new();
        let mut records: Vec<(usize, CatalogRecord)> = Vec::new();
        let mut positions: HashMap<(RecordTable, String), usize> = HashMap::new();

        for planned in &plan {
            let resolved = match resolve_source(&planned.source) {
                Ok(resolved) => resolved,
                Err(ImportError::SourceNotFound { .. }) if !planned.required => {
                    warn!(
                        "Optional {} file {} not found; skipping",
                        dataset,
                        planned.name
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            info!(
                "Reading {} ({} copy at {})",
                planned.name,
                resolved.origin.as_str(),
                resolved.path.display()
            );
            let set = parser.parse_file(&planned.name, &resolved.path)?;
            for error in &set.errors {
                warn!("{}: skipping {}", planned.name, error);
            }

            let file_index = files.len();
            for (row, record) in set.valid.iter().cloned() {
                let key = (record.table(), record.natural_key());
                match positions.get(&key) {
                    Some(&at) => {
                        warn!(
                            "{}: row {} repeats an earlier {:?} key; the later row wins",
                            planned.name,
                            row,
                            key.0
                        );
                        records[at] = (file_index, record);
                    }
                    None => {
                        positions.insert(key, records.len());
                        records.push((file_index, record));
                    }
                }
            }

            files.push(FileReport {
                file: planned.name.clone(),
                source: resolved.path,
                origin: resolved.origin,
                rows: set.rows,
                imported: set.valid.len(),
                created: 0,
                updated: 0,
                unchanged: 0,
                skipped: set.errors,
            });
        }

        if options.strict {
            let errors: Vec<RowError> = files
                .iter()
                .flat_map(|f| f.skipped.iter().cloned())
                .collect();
            if !errors.is_empty() {
                return Err(ImportError::StrictAbort { dataset, errors });
            }
        }

        let (owners, records): (Vec<usize>, Vec<CatalogRecord>) = records.into_iter().unzip();
        let batch = ImportBatch {
            dataset,
            clear: options.clear,
            records,
        };

        let outcomes = if options.dry_run {
            MemoryStore::new().apply(&batch).await?
        } else {
            self.store.apply(&batch).await?
        };

        for (owner, outcome) in owners.into_iter().zip(outcomes) {
            let file = &mut files[owner];
            match outcome {
                Upserted::Created => file.created += 1,
                Upserted::Updated => file.updated += 1,
                Upserted::Unchanged => file.unchanged += 1,
            }
        }

        let report = ImportReport::new(dataset, options.dry_run, files);
        info!(
            "{} import{}: {} imported, {} skipped ({} created, {} updated, {} unchanged)",
            dataset,
            if options.dry_run { " (dry run)" } else { "" },
            report.totals.imported,
            report.totals.skipped,
            report.totals.created,
            report.totals.updated,
            report.totals.unchanged
        );
        Ok(report)
    }

    fn plan(&self, dataset: DatasetKind) -> Result<Vec<PlannedFile>, ImportError> {
        let in_dir = |dir: &Path, files: &[FileSpec]| -> Result<Vec<PlannedFile>, ImportError> {
            check_directory(dir)?;
            Ok(files
                .iter()
                .map(|spec| PlannedFile {
                    name: spec.name.to_string(),
                    required: spec.required,
                    source: ImportSource::new(dataset, dir.join(spec.name)),
                })
                .collect())
        };

        match dataset {
            DatasetKind::Aptitude => in_dir(&self.paths.aptitude_data_dir, aptitude::FILES),
            DatasetKind::Practice => in_dir(&self.paths.practice_data_dir, practice::FILES),
            DatasetKind::Content => {
                let path = self.paths.content_csv.clone();
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "content.csv".to_string());
                Ok(vec![PlannedFile {
                    name,
                    required: true,
                    source: ImportSource::new(dataset, path),
                }])
            }
        }
    }
}

fn parser_for(dataset: DatasetKind) -> Box<dyn DatasetParser + Send> {
    match dataset {
        DatasetKind::Aptitude => Box::new(aptitude::AptitudeParser::default()),
        DatasetKind::Practice => Box::new(practice::PracticeParser::default()),
        DatasetKind::Content => Box::new(content::ContentParser),
    }
}

/// A missing directory is left to source resolution; a path that exists but is
/// not a directory is an operator error.
fn check_directory(dir: &Path) -> Result<(), ImportError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ImportError::Io {
            path: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ImportError::Io {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}
