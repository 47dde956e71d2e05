//! GHM to GHS table (`GHSINFO`).
//!
//! One section of 22-byte records. Consecutive records form a group: each
//! adds one condition, and a record with `valid_ghs` set closes the group
//! with the GHS of both sectors.
//!
//! | Offset | Field              | Type  |
//! |--------|--------------------|-------|
//! | 0      | cmd                | u8    |
//! | 1-2    | type_seq           | u16   |
//! | 3      | low_duration_mode  | u8    |
//! | 4      | function           | u8    |
//! | 5-6    | params             | u8[2] |
//! | 7      | skip_after_failure | u8    |
//! | 8      | valid_ghs          | u8    |
//! | 9-14   | public sector      | 3×u16 |
//! | 15-20  | private sector     | 3×u16 |
//!
//! Only the GHS number of each sector is kept; the duration thresholds come
//! from the pricing tables.

use std::cmp::Ordering;

use mco_model::{GhmCode, GhsCode};

use crate::bytes::ByteReader;
use crate::error::{Result, TableError, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{BitMask, GhsInfo, TableInfo};

use super::{section, truncated};

const NODE_LEN: usize = 22;
/// Procedure conditions a single group can hold.
pub const MAX_PROCEDURE_MASKS: usize = 4;

const GHM_TYPE_CHARS: [u8; 6] = [0, b'C', b'H', b'K', b'M', b'Z'];
const GHM_MODE_CHARS: [u8; 13] = [
    0, b'A', b'B', b'C', b'D', b'E', b'J', b'Z', b'T', b'1', b'2', b'3', b'4',
];

struct RawGhsNode {
    cmd: u8,
    type_seq: u16,
    function: u8,
    params: [u8; 2],
    valid_ghs: bool,
    ghs: [u16; 2],
}

fn read_node(record: &[u8]) -> Option<RawGhsNode> {
    let mut reader = ByteReader::new(record);
    let cmd = reader.u8()?;
    let type_seq = reader.u16()?;
    reader.skip(1)?;
    let function = reader.u8()?;
    let params = reader.array()?;
    reader.skip(1)?;
    let valid_ghs = reader.u8()? != 0;
    let mut ghs = [0u16; 2];
    for sector in &mut ghs {
        *sector = reader.u16()?;
        reader.skip(4)?;
    }
    Some(RawGhsNode {
        cmd,
        type_seq,
        function,
        params,
        valid_ghs,
        ghs,
    })
}

fn group_ghm(node: &RawGhsNode) -> GhmCode {
    let type_seq = usize::from(node.type_seq);
    GhmCode::new(
        node.cmd,
        GHM_TYPE_CHARS[type_seq / 10000 % 6],
        (type_seq / 100 % 100) as u8,
        GHM_MODE_CHARS[type_seq % 100 % 13],
    )
}

fn empty_group(ghm: GhmCode) -> GhsInfo {
    GhsInfo {
        ghm,
        ghs: [GhsCode::NONE; 2],
        bed_authorization: 0,
        unit_authorization: 0,
        minimal_duration: 0,
        minimal_age: 0,
        main_diagnosis_mask: None,
        diagnosis_mask: None,
        procedure_masks: Vec::new(),
    }
}

/// Group order: by root, then modes `J` and later first, then by mode.
fn compare_groups(a: &GhsInfo, b: &GhsInfo) -> Ordering {
    a.ghm.root.cmp(&b.ghm.root).then_with(|| {
        let late_a = a.ghm.mode >= b'J';
        let late_b = b.ghm.mode >= b'J';
        late_b.cmp(&late_a).then(a.ghm.mode.cmp(&b.ghm.mode))
    })
}

pub fn parse_ghs_table(data: &[u8], table: &TableInfo, out: &mut Vec<GhsInfo>) -> Result<()> {
    let mut groups = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, table.sections.len() == 1);
    let nodes = section(table, 0)?;
    ensure_table!(file, nodes.stride == NODE_LEN);

    let mut current: Option<GhsInfo> = None;
    for record in nodes.records(data) {
        let node = read_node(record).ok_or_else(|| truncated(table))?;
        let group = current.get_or_insert_with(|| empty_group(group_ghm(&node)));
        let [p0, p1] = node.params;

        match node.function {
            0 => ensure_table!(file, node.valid_ghs),
            1 => {
                ensure_table!(file, group.procedure_masks.len() < MAX_PROCEDURE_MASKS);
                group.procedure_masks.push(BitMask::new(usize::from(p0), p1));
            }
            2 => {
                ensure_table!(file, p0 == 0 && group.unit_authorization == 0);
                group.unit_authorization = p1;
            }
            3 => {
                ensure_table!(file, p0 == 0 && group.bed_authorization == 0);
                group.bed_authorization = p1;
            }
            5 => {
                ensure_table!(file, group.main_diagnosis_mask.is_none());
                group.main_diagnosis_mask = Some(BitMask::new(usize::from(p0), p1));
            }
            6 => {
                ensure_table!(file, p0 == 0 && group.minimal_duration == 0);
                group.minimal_duration = p1.saturating_add(1);
            }
            7 => {
                ensure_table!(file, group.diagnosis_mask.is_none());
                group.diagnosis_mask = Some(BitMask::new(usize::from(p0), p1));
            }
            8 => {
                ensure_table!(file, p0 == 0 && group.minimal_age == 0);
                group.minimal_age = p1;
            }
            function => {
                return Err(TableError::malformed(
                    file,
                    format!("unknown GHS condition function {function}"),
                ));
            }
        }

        if node.valid_ghs
            && let Some(mut group) = current.take()
        {
            group.ghs = node.ghs.map(GhsCode);
            groups.push(group);
        }
    }

    groups.appended_mut().sort_by(compare_groups);

    groups.commit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_ghm_decoding() {
        let node = RawGhsNode {
            cmd: 4,
            type_seq: 10_000 + 2 * 100 + 9,
            function: 0,
            params: [0, 0],
            valid_ghs: true,
            ghs: [1234, 1235],
        };
        assert_eq!(group_ghm(&node).to_string(), "04C021");
    }

    #[test]
    fn test_late_modes_sort_first() {
        let ghm = |s: &str| empty_group(GhmCode::parse(s).expect("valid GHM"));
        let mut groups = vec![ghm("04C021"), ghm("04C02J"), ghm("03C021"), ghm("04C02T")];
        groups.sort_by(compare_groups);
        let order: Vec<_> = groups.iter().map(|g| g.ghm.to_string()).collect();
        assert_eq!(order, ["03C021", "04C02J", "04C02T", "04C021"]);
    }
}
