//! `elevo-import` - loads the aptitude, practice and content catalogs from CSV.
//!
//! Each command prefers the private CSV files and falls back to the bundled
//! `*_sample.csv` copies. Exit status is non-zero on a fatal error or when rows
//! were read but none could be imported.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use elevo_api::config::Config;
use elevo_api::db::{create_pool, run_migrations};
use elevo_api::importer::{ImportError, ImportOptions, ImportReport, Importer};
use elevo_api::models::catalog::DatasetKind;
use elevo_api::store::{CatalogStore, MemoryStore, PgStore};

#[derive(Parser)]
#[command(name = "elevo-import")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Import Elevo catalog data from CSV files", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// PostgreSQL connection string (not needed with --dry-run)
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct RunFlags {
    /// Abort without writing anything if any row is invalid
    #[arg(long)]
    strict: bool,

    /// Validate and count without touching the database
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import aptitude categories, topics, problems and practice sets
    ImportAptitudeData {
        /// Directory holding categories.csv, topics.csv, problems.csv and practice_sets.csv
        #[arg(long, env = "APTITUDE_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Delete existing aptitude data first
        #[arg(long)]
        clear_existing: bool,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Import practice problems with their tags, test cases, code templates and editorials
    ImportProblems {
        /// Directory holding problems.csv and the optional topics.csv, companies.csv,
        /// test_cases.csv, code_templates.csv and editorials.csv
        #[arg(long, env = "PRACTICE_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Delete existing practice problems first
        #[arg(long)]
        clear: bool,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Import learning content (topics, lessons, quizzes, snippets, articles)
    ImportCsv {
        /// Content CSV file
        #[arg(long, env = "ELEVO_CONTENT_CSV")]
        csv_file: Option<PathBuf>,

        /// Delete existing lessons first
        #[arg(long)]
        clear: bool,

        #[command(flatten)]
        flags: RunFlags,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let level = if cli.verbose { "debug" } else { config.rust_log.as_str() };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("elevo_api={level},elevo_import={level}"))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let outcome = run(cli, config).await;
    match &outcome {
        Ok(report) => {
            print_report(report);
            if report.is_total_failure() {
                eprintln!(
                    "error: {} row(s) read but none could be imported",
                    report.totals.rows
                );
            }
        }
        Err(e) => {
            error!("Import failed: {e:#}");
            eprintln!("error: {e:#}");
            if let Some(ImportError::StrictAbort { errors, .. }) = e.downcast_ref::<ImportError>() {
                for row_error in errors {
                    eprintln!("  {row_error}");
                }
            }
        }
    }

    if succeeded(&outcome) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Fatal errors fail the process, and so does a run where rows were read but
/// none was usable. Skipped rows alone do not.
fn succeeded(outcome: &Result<ImportReport>) -> bool {
    matches!(outcome, Ok(report) if !report.is_total_failure())
}

async fn run(cli: Cli, mut config: Config) -> Result<ImportReport> {
    let (dataset, clear, flags) = match cli.command {
        Commands::ImportAptitudeData {
            data_dir,
            clear_existing,
            flags,
        } => {
            if let Some(dir) = data_dir {
                config.import.aptitude_data_dir = dir;
            }
            (DatasetKind::Aptitude, clear_existing, flags)
        }
        Commands::ImportProblems {
            data_dir,
            clear,
            flags,
        } => {
            if let Some(dir) = data_dir {
                config.import.practice_data_dir = dir;
            }
            (DatasetKind::Practice, clear, flags)
        }
        Commands::ImportCsv {
            csv_file,
            clear,
            flags,
        } => {
            if let Some(path) = csv_file {
                config.import.content_csv = path;
            }
            (DatasetKind::Content, clear, flags)
        }
    };

    let store: Arc<dyn CatalogStore> = if flags.dry_run {
        info!("Dry run: validating {dataset} data without a database");
        Arc::new(MemoryStore::new())
    } else {
        let database_url = cli
            .database_url
            .or(config.database_url.clone())
            .context("DATABASE_URL is required unless --dry-run is given")?;
        let pool = create_pool(&database_url).await?;
        run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let options = ImportOptions {
        clear,
        strict: flags.strict,
        dry_run: flags.dry_run,
    };
    let report = Importer::new(store, config.import)
        .run(dataset, &options)
        .await?;
    Ok(report)
}

fn print_report(report: &ImportReport) {
    let mode = if report.dry_run { " (dry run, nothing written)" } else { "" };
    println!("{} import{}", report.dataset, mode);

    for file in &report.files {
        println!(
            "  {} [{} {}]: {} imported, {} skipped, {} created, {} updated, {} unchanged",
            file.file,
            file.origin.as_str(),
            file.source.display(),
            file.imported,
            file.skipped.len(),
            file.created,
            file.updated,
            file.unchanged
        );
        for skipped in &file.skipped {
            println!("    skipped {skipped}");
        }
    }

    let totals = &report.totals;
    println!(
        "Total: {} rows, {} imported, {} skipped ({} created, {} updated, {} unchanged)",
        totals.rows,
        totals.imported,
        totals.skipped,
        totals.created,
        totals.updated,
        totals.unchanged
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use elevo_api::importer::{ImportTotals, RowError};

    fn report(rows: usize, imported: usize) -> ImportReport {
        ImportReport {
            dataset: DatasetKind::Practice,
            dry_run: false,
            files: vec![],
            totals: ImportTotals {
                rows,
                imported,
                skipped: rows - imported,
                created: imported,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_partial_import_succeeds() {
        assert!(succeeded(&Ok(report(10, 7))));
    }

    #[test]
    fn test_empty_files_succeed() {
        assert!(succeeded(&Ok(report(0, 0))));
    }

    #[test]
    fn test_no_usable_row_fails() {
        assert!(!succeeded(&Ok(report(4, 0))));
    }

    #[test]
    fn test_missing_source_fails() {
        let err = ImportError::SourceNotFound {
            dataset: DatasetKind::Aptitude,
            private: PathBuf::from("data/aptitude/problems.csv"),
            sample: PathBuf::from("data/aptitude/problems_sample.csv"),
        };
        assert!(!succeeded(&Err(err.into())));
    }

    #[test]
    fn test_strict_abort_fails() {
        let err = ImportError::StrictAbort {
            dataset: DatasetKind::Practice,
            errors: vec![RowError {
                row: 3,
                column: "problem_number".into(),
                message: "missing value".into(),
            }],
        };
        assert!(!succeeded(&Err(err.into())));
    }
}
