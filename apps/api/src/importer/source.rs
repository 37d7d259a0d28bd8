use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::ImportError;
use crate::models::catalog::DatasetKind;

/// Where one dataset file may live: the operator's private copy, or the bundled
/// sample next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    pub dataset: DatasetKind,
    pub private_path: PathBuf,
    pub sample_path: PathBuf,
}

impl ImportSource {
    pub fn new(dataset: DatasetKind, private_path: PathBuf) -> Self {
        let sample_path = sample_path_for(&private_path);
        Self {
            dataset,
            private_path,
            sample_path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Private,
    Sample,
}

impl SourceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOrigin::Private => "private",
            SourceOrigin::Sample => "sample",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub origin: SourceOrigin,
}

/// `problems.csv` -> `problems_sample.csv` in the same directory. Paths without a
/// `.csv` extension get `_sample` appended to the file name.
pub fn sample_path_for(private_path: &Path) -> PathBuf {
    let file_name = private_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sample_name = match file_name.strip_suffix(".csv") {
        Some(stem) => format!("{stem}_sample.csv"),
        None => format!("{file_name}_sample"),
    };
    private_path.with_file_name(sample_name)
}

fn is_readable_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => File::open(path).is_ok(),
        _ => false,
    }
}

/// Picks the private file when it is an existing, readable regular file, otherwise
/// the sample. The two are never mixed.
pub fn resolve_source(source: &ImportSource) -> Result<ResolvedSource, ImportError> {
    if is_readable_file(&source.private_path) {
        debug!("Using private CSV {}", source.private_path.display());
        return Ok(ResolvedSource {
            path: source.private_path.clone(),
            origin: SourceOrigin::Private,
        });
    }

    if is_readable_file(&source.sample_path) {
        warn!(
            "{} not found; using sample CSV {}",
            source.private_path.display(),
            source.sample_path.display()
        );
        return Ok(ResolvedSource {
            path: source.sample_path.clone(),
            origin: SourceOrigin::Sample,
        });
    }

    Err(ImportError::SourceNotFound {
        dataset: source.dataset,
        private: source.private_path.clone(),
        sample: source.sample_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sample_path_replaces_extension() {
        assert_eq!(
            sample_path_for(Path::new("data/practice/problems.csv")),
            PathBuf::from("data/practice/problems_sample.csv")
        );
        assert_eq!(
            sample_path_for(Path::new("content/export")),
            PathBuf::from("content/export_sample")
        );
    }

    #[test]
    fn test_private_file_wins_over_sample() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("problems.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("problems_sample.csv"), "a\n2\n").unwrap();

        let source = ImportSource::new(DatasetKind::Practice, dir.path().join("problems.csv"));
        let resolved = resolve_source(&source).unwrap();

        assert_eq!(resolved.origin, SourceOrigin::Private);
        assert_eq!(resolved.path, dir.path().join("problems.csv"));
    }

    #[test]
    fn test_falls_back_to_sample() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("problems_sample.csv"), "a\n2\n").unwrap();

        let source = ImportSource::new(DatasetKind::Practice, dir.path().join("problems.csv"));
        let resolved = resolve_source(&source).unwrap();

        assert_eq!(resolved.origin, SourceOrigin::Sample);
        assert_eq!(resolved.path, dir.path().join("problems_sample.csv"));
    }

    #[test]
    fn test_directory_with_file_name_is_not_a_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("problems.csv")).unwrap();
        fs::write(dir.path().join("problems_sample.csv"), "a\n2\n").unwrap();

        let source = ImportSource::new(DatasetKind::Practice, dir.path().join("problems.csv"));
        assert_eq!(resolve_source(&source).unwrap().origin, SourceOrigin::Sample);
    }

    #[test]
    fn test_neither_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImportSource::new(DatasetKind::Aptitude, dir.path().join("problems.csv"));

        match resolve_source(&source) {
            Err(ImportError::SourceNotFound {
                dataset, private, sample,
            }) => {
                assert_eq!(dataset, DatasetKind::Aptitude);
                assert_eq!(private, dir.path().join("problems.csv"));
                assert_eq!(sample, dir.path().join("problems_sample.csv"));
            }
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
    }
}
