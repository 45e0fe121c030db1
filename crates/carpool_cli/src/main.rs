//! `carpool` command-line inspector.
//!
//! Opens the configured backend and prints storage metadata.

mod args;

use args::{Cli, Command};
use carpool_core::db::open_db;
use carpool_core::document::DocumentStores;
use carpool_core::file::{collection_path, CsvFormat, FileFormat, FileStores, XmlFormat};
use carpool_core::model::booking::Booking;
use carpool_core::model::entity::Entity;
use carpool_core::model::rating::Rating;
use carpool_core::model::route::Route;
use carpool_core::model::trip::Trip;
use carpool_core::model::user::User;
use carpool_core::{
    init_logging, BackendKind, StorageConfig, TransactionCoordinator, WorkResult,
};
use clap::Parser;
use log::info;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

const ENTITY_TABLES: [&str; 5] = [
    User::COLLECTION,
    Route::COLLECTION,
    Trip::COLLECTION,
    Booking::COLLECTION,
    Rating::COLLECTION,
];

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = resolve_config(cli)?;
    if let Some(log_dir) = &cli.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }
    info!(
        "event=cli_command module=cli status=start command={:?} backend={}",
        cli.command, config.backend
    );

    let lines = match cli.command {
        Command::Stats => stats(&config)?,
        Command::Tables => tables(&config)?,
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> CliResult<StorageConfig> {
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(path) = &cli.path {
        if config.backend.is_file_based() {
            config.data_dir = path.clone();
        } else {
            config.database_path = path.clone();
        }
    }
    config.validate()?;
    if !config.backend.is_file_based() {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(config)
}

fn stats(config: &StorageConfig) -> CliResult<Vec<String>> {
    let counts: Vec<(&str, u64)> = match config.backend {
        BackendKind::Csv => file_counts::<CsvFormat>(&config.data_dir)?,
        BackendKind::Xml => file_counts::<XmlFormat>(&config.data_dir)?,
        BackendKind::Document => document_counts(&config.database_path)?,
        BackendKind::Sqlite => {
            let coordinator = TransactionCoordinator::open(&config.database_path)?;
            coordinator.run_read_only(|session| {
                ENTITY_TABLES
                    .iter()
                    .map(|table| Ok((*table, session.row_count(table)?)))
                    .collect::<WorkResult<Vec<_>>>()
            })?
        }
    };
    Ok(counts
        .into_iter()
        .map(|(collection, count)| format!("{collection}\t{count}"))
        .collect())
}

fn file_counts<F: FileFormat>(dir: &Path) -> CliResult<Vec<(&'static str, u64)>> {
    Ok(FileStores::<F>::open(dir)?
        .record_counts()?
        .into_iter()
        .map(|(collection, count)| (collection, count as u64))
        .collect())
}

fn document_counts(database_path: &Path) -> CliResult<Vec<(&'static str, u64)>> {
    let conn = open_db(database_path)?;
    let stores = DocumentStores::sqlite(&conn);
    Ok(stores.document_counts()?)
}

fn tables(config: &StorageConfig) -> CliResult<Vec<String>> {
    match config.backend {
        BackendKind::Csv => Ok(file_paths::<CsvFormat>(&config.data_dir)),
        BackendKind::Xml => Ok(file_paths::<XmlFormat>(&config.data_dir)),
        BackendKind::Document | BackendKind::Sqlite => {
            let coordinator = TransactionCoordinator::open(&config.database_path)?;
            Ok(coordinator.run_read_only(|session| Ok(session.table_names()?))?)
        }
    }
}

fn file_paths<F: FileFormat>(dir: &Path) -> Vec<String> {
    [
        collection_path::<User, F>(dir),
        collection_path::<Route, F>(dir),
        collection_path::<Trip, F>(dir),
        collection_path::<Booking, F>(dir),
        collection_path::<Rating, F>(dir),
    ]
    .iter()
    .map(|path| path.display().to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::document_counts;
    use carpool_core::db::open_db;
    use carpool_core::document::DocumentStores;
    use carpool_core::model::route::Route;

    #[test]
    fn document_counts_report_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carpool.sqlite3");
        {
            let conn = open_db(&path).unwrap();
            DocumentStores::sqlite(&conn)
                .routes
                .create(&Route::new("Laval", "Vitré", 36.0, 30))
                .unwrap();
        }

        let counts = document_counts(&path).unwrap();
        assert_eq!(
            counts,
            vec![("users", 0), ("routes", 1), ("trips", 0), ("bookings", 0), ("ratings", 0)]
        );
    }
}
