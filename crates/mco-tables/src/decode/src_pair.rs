//! Supplement pairs (`SRCDGACT`).
//!
//! Each section is a list of 8-byte records
//! `diag_code123 u16, diag_code456 u16, proc_code123 u16, proc_code456 u16`
//! pairing a diagnosis with a procedure.

use crate::bytes::ByteReader;
use crate::error::{Result, TableError, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{SrcPair, TableInfo};

use super::{diagnosis_code, procedure_code, section, truncated};

const PAIR_LEN: usize = 8;

fn read_pair(record: &[u8]) -> Option<[u16; 4]> {
    let mut reader = ByteReader::new(record);
    Some([reader.u16()?, reader.u16()?, reader.u16()?, reader.u16()?])
}

/// Decode the pairs of section `section_idx`.
pub fn parse_src_pair_table(
    data: &[u8],
    table: &TableInfo,
    section_idx: usize,
    out: &mut Vec<SrcPair>,
) -> Result<()> {
    let mut pairs = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, section_idx < table.sections.len());
    let list = section(table, section_idx)?;
    ensure_table!(file, list.stride == PAIR_LEN);

    for record in list.records(data) {
        let [diag123, diag456, proc123, proc456] =
            read_pair(record).ok_or_else(|| truncated(table))?;
        let diagnosis = diagnosis_code(diag123, diag456)
            .ok_or_else(|| TableError::malformed(file, "invalid diagnosis code in pair"))?;
        let procedure = procedure_code(
            usize::from(proc123),
            usize::from(proc456 / 1000),
            proc456 % 1000,
        )
        .ok_or_else(|| TableError::malformed(file, "invalid procedure code in pair"))?;
        pairs.push(SrcPair {
            diagnosis,
            procedure,
        });
    }

    pairs.commit();
    Ok(())
}
