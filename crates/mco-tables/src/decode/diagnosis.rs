//! Diagnosis table (`DIAG10CR`).
//!
//! Five sections:
//!
//! 0. 2600 big-endian `u16` end indices into section 1, one bucket per code
//!    root (`A00` .. `Z99`)
//! 1. 9-byte pointers: `code456 u16, s2_idx u16, s3_idx u8, s4_bit u16, s4_idx u16`
//! 2. attribute pairs, male block then female block
//! 3. warning bytes, one bit per non-zero byte
//! 4. exclusion bitsets

use crate::bytes::ByteReader;
use crate::error::{Result, TableError, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{BitMask, DiagnosisAttributes, DiagnosisInfo, ExclusionInfo, TableInfo};

use super::{diagnosis_code, record, section, truncated};

const ROOT_COUNT: usize = 26 * 100;
const PTR_LEN: usize = 9;
const ATTRIBUTES_LEN: usize = 37;
const WARNINGS_BITS: usize = 16;
const EXCLUSION_LEN: usize = 256;

struct RawDiagnosisPtr {
    code456: u16,
    attributes_idx: u16,
    warnings_idx: u8,
    exclusion_bit: u16,
    exclusion_idx: u16,
}

fn read_ptr(record: &[u8]) -> Option<RawDiagnosisPtr> {
    let mut reader = ByteReader::new(record);
    Some(RawDiagnosisPtr {
        code456: reader.u16()?,
        attributes_idx: reader.u16()?,
        warnings_idx: reader.u8()?,
        exclusion_bit: reader.u16()?,
        exclusion_idx: reader.u16()?,
    })
}

fn read_attributes(raw: &[u8]) -> DiagnosisAttributes {
    let mut block = [0u8; ATTRIBUTES_LEN];
    let len = raw.len().min(ATTRIBUTES_LEN);
    block[..len].copy_from_slice(&raw[..len]);

    let severity = if block[21] & 0x40 != 0 {
        3
    } else if block[21] & 0x80 != 0 {
        2
    } else if block[20] & 0x01 != 0 {
        1
    } else {
        0
    };

    DiagnosisAttributes {
        raw: block,
        cmd: block[0],
        jump: block[1],
        severity,
    }
}

/// Decode the diagnoses of a `DIAG10CR` table.
pub fn parse_diagnosis_table(
    data: &[u8],
    table: &TableInfo,
    out: &mut Vec<DiagnosisInfo>,
) -> Result<()> {
    let mut diagnoses = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, table.sections.len() == 5);
    let roots = section(table, 0)?;
    let ptrs = section(table, 1)?;
    let attribute_pairs = section(table, 2)?;
    let warning_sets = section(table, 3)?;
    let exclusions = section(table, 4)?;
    ensure_table!(file, roots.count == ROOT_COUNT && roots.stride == 2);
    ensure_table!(file, ptrs.stride == PTR_LEN);
    ensure_table!(
        file,
        attribute_pairs.stride > 0
            && attribute_pairs.stride % 2 == 0
            && attribute_pairs.stride / 2 <= ATTRIBUTES_LEN
    );
    ensure_table!(file, warning_sets.stride > 0 && warning_sets.stride <= WARNINGS_BITS);
    ensure_table!(file, exclusions.stride > 0);

    let mut block_end = 0usize;
    for (root_idx, end_record) in roots.records(data).enumerate() {
        let block_start = block_end;
        let mut reader = ByteReader::new(end_record);
        block_end = usize::from(reader.u16().ok_or_else(|| truncated(table))?);
        ensure_table!(file, block_end <= ptrs.count);

        for ptr_idx in block_start..block_end {
            let ptr =
                read_ptr(record(data, table, ptrs, ptr_idx)?).ok_or_else(|| truncated(table))?;
            ensure_table!(file, usize::from(ptr.attributes_idx) < attribute_pairs.count);
            ensure_table!(file, usize::from(ptr.warnings_idx) < warning_sets.count);
            ensure_table!(file, usize::from(ptr.exclusion_idx) < exclusions.count);

            let code = diagnosis_code(root_idx as u16, ptr.code456).ok_or_else(|| {
                TableError::malformed(file, format!("invalid diagnosis code in bucket {root_idx}"))
            })?;

            let pair = record(data, table, attribute_pairs, usize::from(ptr.attributes_idx))?;
            let (male, female) = pair.split_at(pair.len() / 2);
            let attributes = [read_attributes(male), read_attributes(female)];

            let warning_bytes = record(data, table, warning_sets, usize::from(ptr.warnings_idx))?;
            let warnings = warning_bytes
                .iter()
                .enumerate()
                .filter(|&(_, &byte)| byte != 0)
                .fold(0u16, |acc, (bit, _)| acc | (1 << bit));

            diagnoses.push(DiagnosisInfo {
                code,
                sex_difference: attributes[0].raw != attributes[1].raw,
                attributes,
                warnings,
                exclusion_set_idx: usize::from(ptr.exclusion_idx),
                cma_exclusion: BitMask::new(
                    usize::from(ptr.exclusion_bit >> 3),
                    0x80 >> (ptr.exclusion_bit & 0x7),
                ),
            });
        }
    }

    diagnoses.commit();
    Ok(())
}

/// Decode the exclusion bitsets (section 4) of a `DIAG10CR` table.
pub fn parse_exclusion_table(
    data: &[u8],
    table: &TableInfo,
    out: &mut Vec<ExclusionInfo>,
) -> Result<()> {
    let mut exclusions = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, table.sections.len() == 5);
    let sets = section(table, 4)?;
    ensure_table!(file, sets.stride > 0 && sets.stride <= EXCLUSION_LEN);

    for set in sets.records(data) {
        let mut raw = [0u8; EXCLUSION_LEN];
        raw[..set.len()].copy_from_slice(set);
        exclusions.push(ExclusionInfo { raw });
    }

    exclusions.commit();
    Ok(())
}
