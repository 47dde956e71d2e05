//! GHM root table (`RGHMINFO`).
//!
//! | Offset | Field            | Type |
//! |--------|------------------|------|
//! | 0      | cmd              | u8   |
//! | 1-2    | type_seq         | u16  |
//! | 3      | young_mode       | u8   |
//! | 4      | old_mode         | u8   |
//! | 5      | duration_mode    | u8   |
//! | 6-7    | pad              |      |
//! | 8      | cma_excl_offset  | u8   |
//! | 9      | cma_excl_mask    | u8   |
//! | 10     | confirm_duration | u8   |
//! | 11     | childbirth_mode  | u8   |
//!
//! Versions before 11.15 stop after `confirm_duration` (11 bytes). Later
//! versions may append fields this decoder does not use.

use mco_model::GhmRootCode;

use crate::bytes::ByteReader;
use crate::error::{Result, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{BitMask, GhmRootInfo, TableInfo};

use super::{section, truncated};

const ROOT_TYPE_CHARS: [u8; 10] = [0, b'C', b'H', b'K', b'M', b'Z', b' ', b' ', b' ', b' '];

/// Record strides accepted for a format version.
fn stride_allowed(version: (u16, u16), stride: usize) -> bool {
    if version < (11, 15) {
        stride == 11
    } else {
        stride == 12 || (version >= (11, 28) && stride == 13) || (version >= (11, 29) && stride == 14)
    }
}

struct RawGhmRoot {
    cmd: u8,
    type_seq: u16,
    young_mode: u8,
    old_mode: u8,
    duration_mode: u8,
    cma_exclusion_offset: u8,
    cma_exclusion_mask: u8,
    confirm_duration: u8,
    childbirth_mode: u8,
}

fn read_root(record: &[u8]) -> Option<RawGhmRoot> {
    let mut reader = ByteReader::new(record);
    let cmd = reader.u8()?;
    let type_seq = reader.u16()?;
    let young_mode = reader.u8()?;
    let old_mode = reader.u8()?;
    let duration_mode = reader.u8()?;
    reader.skip(2)?;
    Some(RawGhmRoot {
        cmd,
        type_seq,
        young_mode,
        old_mode,
        duration_mode,
        cma_exclusion_offset: reader.u8()?,
        cma_exclusion_mask: reader.u8()?,
        confirm_duration: reader.u8()?,
        childbirth_mode: reader.u8().unwrap_or(0),
    })
}

pub fn parse_ghm_root_table(
    data: &[u8],
    table: &TableInfo,
    out: &mut Vec<GhmRootInfo>,
) -> Result<()> {
    let mut roots = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, table.sections.len() == 1);
    let records = section(table, 0)?;
    ensure_table!(file, stride_allowed(table.version, records.stride));

    for record in records.records(data) {
        let raw = read_root(record).ok_or_else(|| truncated(table))?;

        let mut root = GhmRootInfo {
            code: GhmRootCode::new(
                raw.cmd,
                ROOT_TYPE_CHARS[usize::from(raw.type_seq / 100 % 10)],
                (raw.type_seq % 100) as u8,
            ),
            allow_ambulatory: false,
            short_duration_threshold: 0,
            confirm_duration_threshold: raw.confirm_duration,
            young_age_threshold: 0,
            young_severity_limit: 0,
            old_age_threshold: 0,
            old_severity_limit: 0,
            childbirth_severity_list: 0,
            cma_exclusion: BitMask::new(
                usize::from(raw.cma_exclusion_offset),
                raw.cma_exclusion_mask,
            ),
        };

        match raw.duration_mode {
            1 => root.allow_ambulatory = true,
            mode @ 2..=4 => root.short_duration_threshold = mode - 1,
            _ => {}
        }
        if raw.young_mode == 1 {
            root.young_age_threshold = 2;
            root.young_severity_limit = 1;
        }
        if let mode @ 1..=6 = raw.old_mode {
            root.old_age_threshold = if mode % 2 == 1 { 70 } else { 80 };
            root.old_severity_limit = (mode + 1) / 2;
        }
        if raw.childbirth_mode != 0 {
            ensure_table!(file, (2..=4).contains(&raw.childbirth_mode));
            root.childbirth_severity_list = raw.childbirth_mode - 1;
        }

        roots.push(root);
    }

    roots.commit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_by_version() {
        assert!(stride_allowed((11, 11), 11));
        assert!(!stride_allowed((11, 11), 12));
        assert!(stride_allowed((11, 15), 12));
        assert!(!stride_allowed((11, 27), 13));
        assert!(stride_allowed((11, 28), 13));
        assert!(!stride_allowed((11, 28), 14));
        assert!(stride_allowed((12, 1), 14));
    }

    #[test]
    fn test_short_record_has_no_childbirth_mode() {
        let record = [4, 0x01, 0x92, 0, 3, 2, 0, 0, 1, 0x40, 0];
        let raw = read_root(&record).expect("11-byte record");
        assert_eq!(raw.childbirth_mode, 0);
        assert_eq!(raw.type_seq, 402);
        assert_eq!(raw.old_mode, 3);
    }
}
