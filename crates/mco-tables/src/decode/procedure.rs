//! Procedure table (`CCAMCARA`).
//!
//! Three sections:
//!
//! 0. 17576 big-endian `u16` end indices into section 1, one bucket per
//!    3-letter code prefix (`AAA` .. `ZZZ`)
//! 1. 9-byte pointers: `char4 u8, seq_phase u16, s2_idx u16, date_min u16, date_max u16`
//! 2. attribute bytes

use mco_model::Date;

use crate::bytes::ByteReader;
use crate::error::{Result, TableError, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{ProcedureInfo, TableInfo};

use super::{procedure_code, record, section, truncated};

const ROOT_COUNT: usize = 26 * 26 * 26;
const PTR_LEN: usize = 9;
const BYTES_LEN: usize = 55;

struct RawProcedurePtr {
    char4: u8,
    seq_phase: u16,
    bytes_idx: u16,
    date_min: u16,
    date_max: u16,
}

fn read_ptr(record: &[u8]) -> Option<RawProcedurePtr> {
    let mut reader = ByteReader::new(record);
    Some(RawProcedurePtr {
        char4: reader.u8()?,
        seq_phase: reader.u16()?,
        bytes_idx: reader.u16()?,
        date_min: reader.u16()?,
        date_max: reader.u16()?,
    })
}

pub fn parse_procedure_table(
    data: &[u8],
    table: &TableInfo,
    out: &mut Vec<ProcedureInfo>,
) -> Result<()> {
    let mut procedures = AppendGuard::new(out);
    let file = table.file.as_str();
    let invalid_date = || TableError::malformed(file, "invalid procedure validity date");

    ensure_table!(file, table.sections.len() == 3);
    let roots = section(table, 0)?;
    let ptrs = section(table, 1)?;
    let attributes = section(table, 2)?;
    ensure_table!(file, roots.count == ROOT_COUNT && roots.stride == 2);
    ensure_table!(file, ptrs.stride == PTR_LEN);
    ensure_table!(file, attributes.stride > 0 && attributes.stride <= BYTES_LEN);

    let mut block_end = 0usize;
    for (root_idx, end_record) in roots.records(data).enumerate() {
        let block_start = block_end;
        let mut reader = ByteReader::new(end_record);
        block_end = usize::from(reader.u16().ok_or_else(|| truncated(table))?);
        ensure_table!(file, block_end <= ptrs.count);

        for ptr_idx in block_start..block_end {
            let ptr =
                read_ptr(record(data, table, ptrs, ptr_idx)?).ok_or_else(|| truncated(table))?;
            ensure_table!(file, usize::from(ptr.bytes_idx) < attributes.count);

            let code = procedure_code(root_idx, usize::from(ptr.char4), ptr.seq_phase / 10)
                .ok_or_else(|| TableError::malformed(file, "invalid procedure code"))?;
            let start = Date::from_disk_days(ptr.date_min).ok_or_else(invalid_date)?;
            let end = match ptr.date_max {
                u16::MAX => Date::disk_max(),
                max => Date::from_disk_days(max + 1),
            }
            .ok_or_else(invalid_date)?;

            let raw = record(data, table, attributes, usize::from(ptr.bytes_idx))?;
            let mut bytes = [0u8; BYTES_LEN];
            bytes[..raw.len()].copy_from_slice(raw);

            procedures.push(ProcedureInfo {
                code,
                phase: (ptr.seq_phase % 10) as u8,
                start,
                end,
                bytes,
            });
        }
    }

    procedures.commit();
    Ok(())
}
