//! Severity grids (`TABCOMBI`).
//!
//! Sections hold 10-byte cells `var1_min, var1_max, var2_min, var2_max, value`
//! with inclusive maxima. Section 0 is the newborn (GNN) grid, sections 1 to 3
//! the childbirth CMA lists.

use crate::bytes::ByteReader;
use crate::error::{Result, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{TableInfo, ValueRange, ValueRangeCell};

use super::{section, truncated};

const CELL_LEN: usize = 10;

fn read_cell(record: &[u8]) -> Option<ValueRangeCell<2>> {
    let mut reader = ByteReader::new(record);
    let mut range = || -> Option<ValueRange> {
        let min = reader.u16()?;
        let max = reader.u16()?;
        Some(ValueRange {
            min: i32::from(min),
            max: i32::from(max) + 1,
        })
    };
    let limits = [range()?, range()?];
    Some(ValueRangeCell {
        limits,
        value: reader.u16()?,
    })
}

/// Decode the cells of section `section_idx`.
pub fn parse_severity_table(
    data: &[u8],
    table: &TableInfo,
    section_idx: usize,
    out: &mut Vec<ValueRangeCell<2>>,
) -> Result<()> {
    let mut cells = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, section_idx < table.sections.len());
    let grid = section(table, section_idx)?;
    ensure_table!(file, grid.stride == CELL_LEN);

    for record in grid.records(data) {
        cells.push(read_cell(record).ok_or_else(|| truncated(table))?);
    }

    cells.commit();
    Ok(())
}
