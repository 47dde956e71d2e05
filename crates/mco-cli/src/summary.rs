//! Terminal tables and machine-readable renderings of command results.

use anyhow::{Context, Result, anyhow};
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use mco_classifier::{ClassifyResult, ConstraintSet};
use mco_tables::{TableSet, TableType};

use crate::stays::Mismatch;

/// Length of the SHA-256 prefix shown for table files.
const SHA_PREFIX_LEN: usize = 12;

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

/// Every table header found, one row per table.
pub fn tables_table(set: &TableSet) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("SHA-256"),
        header_cell("Type"),
        header_cell("Version"),
        header_cell("Build date"),
        header_cell("Validity"),
        header_cell("Sections"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 6, CellAlignment::Right);

    for info in set.tables() {
        let sha = set.files().get(info.source).map_or("-", |file| {
            file.sha256.get(..SHA_PREFIX_LEN).unwrap_or(&file.sha256)
        });
        let kind = if info.kind == TableType::Unknown {
            dim_cell(format!("{} (ignored)", info.raw_type))
        } else {
            Cell::new(info.kind.label())
        };
        table.add_row(vec![
            Cell::new(&info.file).fg(Color::Blue),
            dim_cell(sha),
            kind,
            Cell::new(format!("{}.{}", info.version.0, info.version.1)),
            Cell::new(info.build_date),
            Cell::new(format!("{} to {}", info.start, info.end)),
            Cell::new(info.sections.len()),
        ]);
    }
    table
}

/// Committed indexes with the version of each active table; `*` marks the
/// tables that changed from the previous index.
pub fn indexes_table(set: &TableSet) -> Table {
    let mut table = Table::new();
    let mut header = vec![header_cell("Start"), header_cell("End")];
    header.extend(TableType::KNOWN.iter().map(|kind| header_cell(kind.tag())));
    header.push(header_cell("Complete"));
    table.set_header(header);
    apply_summary_table_style(&mut table);

    for index in set.indexes() {
        let mut row = vec![Cell::new(index.start()), Cell::new(index.end())];
        for kind in TableType::KNOWN {
            let cell = match index.table(kind) {
                Some(info) if index.has_changed(kind) => {
                    Cell::new(format!("{}.{}*", info.version.0, info.version.1))
                        .fg(Color::Yellow)
                        .add_attribute(Attribute::Bold)
                }
                Some(info) => Cell::new(format!("{}.{}", info.version.0, info.version.1)),
                None => dim_cell("-"),
            };
            row.push(cell);
        }
        row.push(if index.is_complete() {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red).add_attribute(Attribute::Bold)
        });
        table.add_row(row);
    }
    for column in 2..2 + TableType::KNOWN.len() + 1 {
        align_column(&mut table, column, CellAlignment::Center);
    }
    table
}

fn error_list(result: &ClassifyResult) -> String {
    result
        .errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// One row per cluster, followed by a totals row.
pub fn results_table(results: &[ClassifyResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stay"),
        header_cell("Records"),
        header_cell("GHM"),
        header_cell("GHS"),
        header_cell("Duration"),
        header_cell("Age"),
        header_cell("Errors"),
    ]);
    apply_summary_table_style(&mut table);
    for column in [1, 4, 5] {
        align_column(&mut table, column, CellAlignment::Right);
    }
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);

    for result in results {
        let ghm = if result.is_error() {
            Cell::new(result.ghm)
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(result.ghm).fg(Color::Blue)
        };
        let errors = if result.errors.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(error_list(result)).fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(result.stay_id),
            Cell::new(result.cluster_len),
            ghm,
            Cell::new(result.ghs),
            Cell::new(result.duration),
            Cell::new(result.age),
            errors,
        ]);
    }

    let failed = results.iter().filter(|result| result.is_error()).count();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(results.iter().map(|result| result.cluster_len).sum::<usize>())
            .add_attribute(Attribute::Bold),
        count_cell(failed, Color::Red),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    table
}

pub fn results_json(results: &[ClassifyResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("serialize results")
}

pub fn results_csv(results: &[ClassifyResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "stay_id",
        "cluster_len",
        "ghm",
        "ghs",
        "duration",
        "age",
        "main_error",
        "errors",
        "index_start",
        "index_end",
    ])?;
    for result in results {
        let optional = |value: Option<String>| value.unwrap_or_default();
        writer.write_record([
            result.stay_id.to_string(),
            result.cluster_len.to_string(),
            result.ghm.to_string(),
            result.ghs.to_string(),
            result.duration.to_string(),
            result.age.to_string(),
            optional(result.main_error.map(|error| error.to_string())),
            error_list(result),
            optional(result.index_start.map(|date| date.to_string())),
            optional(result.index_end.map(|date| date.to_string())),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| anyhow!("flush CSV output: {}", error.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Compact list of the durations set in `mask`, such as `0, 3-63`.
pub fn format_durations(mask: u64) -> String {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for bit in (0..64).filter(|&bit| mask & (1u64 << bit) != 0) {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == bit => *end = bit,
            _ => runs.push((bit, bit)),
        }
    }
    runs.iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn constraints_table(constraints: &ConstraintSet) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("GHM"), header_cell("Durations (nights)")]);
    apply_table_style(&mut table);
    for constraint in constraints.constraints.values() {
        table.add_row(vec![
            Cell::new(constraint.ghm).fg(Color::Blue),
            Cell::new(format_durations(constraint.duration_mask)),
        ]);
    }
    table
}

pub fn mismatches_table(mismatches: &[Mismatch]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stay"),
        header_cell("Field"),
        header_cell("Expected"),
        header_cell("Actual"),
    ]);
    apply_table_style(&mut table);
    for mismatch in mismatches {
        table.add_row(vec![
            Cell::new(mismatch.stay_id),
            Cell::new(mismatch.field),
            Cell::new(&mismatch.expected).fg(Color::Green),
            Cell::new(&mismatch.actual).fg(Color::Red),
        ]);
    }
    table
}
