use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use mco_classifier::{AuthorizationSet, classify, compute_ghm_constraints};
use mco_cli::stays::{StaySet, check_expectations};
use mco_cli::summary::{
    constraints_table, indexes_table, mismatches_table, results_csv, results_json, results_table,
    tables_table,
};
use mco_tables::{TableSetLoad, load_table_set};
use tracing::{info, info_span};

use crate::cli::{ClassifyArgs, ConstraintsArgs, OutputFormatArg, TablesArgs};

fn print_load_errors(load: &TableSetLoad) {
    if load.errors.is_empty() {
        return;
    }
    eprintln!("Table errors:");
    for error in &load.errors {
        eprintln!("- {error}");
    }
}

/// Load tables for classification; at least one index must exist.
fn load_tables(paths: &[PathBuf]) -> Result<TableSetLoad> {
    let span = info_span!("load_tables", paths = paths.len());
    let load = span.in_scope(|| load_table_set(paths));
    print_load_errors(&load);
    if load.set.index_count() == 0 {
        bail!("no usable table index found");
    }
    Ok(load)
}

/// Returns false when some file or table failed to load.
pub fn run_tables(args: &TablesArgs) -> Result<bool> {
    let load = load_table_set(&args.paths);
    println!("{}", tables_table(&load.set));
    println!();
    println!("Indexes (* = changed):");
    println!("{}", indexes_table(&load.set));
    print_load_errors(&load);
    Ok(load.is_complete())
}

/// Returns false when `--test` found unmet expectations.
pub fn run_classify(args: &ClassifyArgs) -> Result<bool> {
    let load = load_tables(&args.tables)?;
    let authorizations = match &args.authorizations {
        Some(path) => AuthorizationSet::from_path(path)
            .with_context(|| format!("load authorizations from {}", path.display()))?,
        None => AuthorizationSet::default(),
    };

    let mut stays = StaySet::new();
    for path in &args.stays {
        stays.append(StaySet::from_path(path)?);
    }

    let span = info_span!("classify", stays = stays.len());
    let start = Instant::now();
    let results = span.in_scope(|| {
        classify(
            &load.set,
            &authorizations,
            &stays.stays,
            args.cluster_mode.into(),
        )
    });
    info!(
        clusters = results.len(),
        failed = results.iter().filter(|result| result.is_error()).count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "classified stays"
    );

    match args.format {
        OutputFormatArg::Table => println!("{}", results_table(&results)),
        OutputFormatArg::Json => println!("{}", results_json(&results)?),
        OutputFormatArg::Csv => print!("{}", results_csv(&results)?),
    }

    if !args.test {
        return Ok(true);
    }
    let mismatches = check_expectations(&stays, &results);
    if mismatches.is_empty() {
        eprintln!("All expectations met ({} clusters).", results.len());
        Ok(true)
    } else {
        eprintln!("Unmet expectations:");
        eprintln!("{}", mismatches_table(&mismatches));
        Ok(false)
    }
}

pub fn run_constraints(args: &ConstraintsArgs) -> Result<bool> {
    let load = load_tables(&args.tables)?;
    let index = match args.date {
        Some(date) => load
            .set
            .find_index(Some(date))
            .with_context(|| format!("no table index valid on {date}"))?,
        None => load.set.find_index(None).context("no table index")?,
    };

    let constraints = compute_ghm_constraints(&index);
    println!("Index: {} to {}", index.start(), index.end());
    println!("{}", constraints_table(&constraints));
    if !constraints.complete {
        eprintln!("warning: some branches could not be followed, durations may be missing");
    }
    Ok(true)
}
