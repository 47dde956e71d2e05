//! Table file writer.
//!
//! Encodes tables in the on-disk format read by [`crate::header`] and the
//! decoders: a main header, one section of table pointers, then each table
//! header with its section descriptors and raw records.
//!
//! The per-type `encode_*` functions turn decoded records back into raw
//! sections, which is how test fixtures are produced.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use mco_model::{Date, DiagnosisCode, GhmCode, GhmRootCode, ProcedureCode};

use crate::error::{Result, TableError};
use crate::header::{HEADER_LEN, MAX_SECTIONS, SECTION_LEN, TABLE_PTR_LEN};
use crate::types::{
    AuthorizationInfo, AuthorizationScope, BitMask, DiagnosisInfo, ExclusionInfo,
    GhmDecisionNode, GhmRootInfo, GhsInfo, ProcedureInfo, SrcPair, TableType, ValueRangeCell,
};

/// Format version written when none is given.
pub const DEFAULT_VERSION: (u16, u16) = (11, 15);

const SIGNATURE: &str = "MCOTABLE";
const MAIN_NAME: &str = "TABLES";

/// Raw records of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionData {
    pub stride: usize,
    pub bytes: Vec<u8>,
}

impl SectionData {
    pub fn new(stride: usize, bytes: Vec<u8>) -> Self {
        Self { stride, bytes }
    }

    /// Number of whole records.
    pub fn count(&self) -> usize {
        self.bytes.len().checked_div(self.stride).unwrap_or(0)
    }
}

/// One table to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    pub tag: String,
    pub version: (u16, u16),
    pub start: Date,
    pub end: Date,
    pub sections: Vec<SectionData>,
}

impl TableData {
    pub fn new(kind: TableType, start: Date, end: Date) -> Self {
        Self::with_tag(kind.tag(), start, end)
    }

    /// Table with an arbitrary type tag.
    pub fn with_tag(tag: &str, start: Date, end: Date) -> Self {
        Self {
            tag: tag.to_string(),
            version: DEFAULT_VERSION,
            start,
            end,
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn version(mut self, version: (u16, u16)) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn section(mut self, section: SectionData) -> Self {
        self.sections.push(section);
        self
    }

    #[must_use]
    pub fn sections(mut self, sections: impl IntoIterator<Item = SectionData>) -> Self {
        self.sections.extend(sections);
        self
    }
}

/// Builder for a complete `.tab` file.
#[derive(Debug, Clone)]
pub struct TableFileBuilder {
    build_date: Date,
    version: (u16, u16),
    tables: Vec<TableData>,
}

impl TableFileBuilder {
    pub fn new(build_date: Date) -> Self {
        Self {
            build_date,
            version: DEFAULT_VERSION,
            tables: Vec::new(),
        }
    }

    /// Version of the main header.
    #[must_use]
    pub fn version(mut self, version: (u16, u16)) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn table(mut self, table: TableData) -> Self {
        self.tables.push(table);
        self
    }

    /// Encode the file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let pointers_len = self.tables.len() * TABLE_PTR_LEN;
        let mut out = Vec::new();

        out.extend(encode_header(
            self.version,
            self.build_date,
            MAIN_NAME,
            1,
        )?);
        out.extend(encode_section_descriptor(
            self.tables.len(),
            TABLE_PTR_LEN,
            HEADER_LEN + SECTION_LEN,
        )?);

        let mut body = Vec::new();
        let mut pointers = Vec::with_capacity(pointers_len);
        let body_offset = HEADER_LEN + SECTION_LEN + pointers_len;

        for table in &self.tables {
            if table.sections.len() > MAX_SECTIONS {
                return Err(TableError::encode(format!(
                    "table {} has {} sections",
                    table.tag,
                    table.sections.len()
                )));
            }
            let table_offset = body_offset + body.len();
            pointers.extend_from_slice(&disk_days(table.start)?.to_be_bytes());
            pointers.extend_from_slice(&disk_days(table.end)?.to_be_bytes());
            pointers.extend_from_slice(&[0, 0]);
            pointers.extend_from_slice(&to_u32(table_offset)?.to_be_bytes());

            body.extend(encode_header(
                table.version,
                self.build_date,
                &table.tag,
                table.sections.len(),
            )?);
            let mut raw_offset = HEADER_LEN + table.sections.len() * SECTION_LEN;
            for section in &table.sections {
                if section.stride == 0 || section.bytes.len() % section.stride != 0 {
                    return Err(TableError::encode(format!(
                        "section of {} bytes does not hold records of {} bytes",
                        section.bytes.len(),
                        section.stride
                    )));
                }
                body.extend(encode_section_descriptor(
                    section.count(),
                    section.stride,
                    raw_offset,
                )?);
                raw_offset += section.bytes.len();
            }
            for section in &table.sections {
                body.extend_from_slice(&section.bytes);
            }
        }

        out.extend(pointers);
        out.extend(body);
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    /// Create `path` and write the file to it.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        self.write_to(File::create(path)?)
    }
}

fn to_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| TableError::encode(format!("{what} {value} exceeds u16")))
}

fn to_u8(value: usize, what: &str) -> Result<u8> {
    u8::try_from(value).map_err(|_| TableError::encode(format!("{what} {value} exceeds u8")))
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| TableError::encode(format!("offset {value} exceeds u32")))
}

/// On-disk day count of `date`.
pub fn disk_days(date: Date) -> Result<u16> {
    u16::try_from(date.days_since_epoch())
        .map_err(|_| TableError::encode(format!("date {date} is outside the disk range")))
}

/// Blank-padded fixed-width text.
fn padded<const N: usize>(text: &str) -> Result<[u8; N]> {
    let bytes = text.as_bytes();
    if bytes.len() > N || !text.is_ascii() {
        return Err(TableError::encode(format!("'{text}' does not fit in {N} bytes")));
    }
    let mut out = [b' '; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn encode_header(
    version: (u16, u16),
    build_date: Date,
    name: &str,
    sections_count: usize,
) -> Result<[u8; HEADER_LEN]> {
    let (major, minor) = version;
    if major > 99 || minor > 99 {
        return Err(TableError::encode(format!("version {major}.{minor}")));
    }
    if !(2000..2100).contains(&build_date.year()) {
        return Err(TableError::encode(format!("build date {build_date}")));
    }

    let mut header = [0u8; HEADER_LEN];
    header[0..8].copy_from_slice(&padded::<8>(SIGNATURE)?);
    header[8..12].copy_from_slice(&padded::<4>(&format!("{major:2}{minor:2}"))?);
    let date = format!(
        "{:02}{:02}{:02}",
        build_date.day(),
        build_date.month(),
        build_date.year() % 100
    );
    header[12..18].copy_from_slice(&padded::<6>(&date)?);
    header[18..26].copy_from_slice(&padded::<8>(name)?);
    header[27] = to_u8(sections_count, "section count")?;
    Ok(header)
}

fn encode_section_descriptor(
    count: usize,
    stride: usize,
    raw_offset: usize,
) -> Result<[u8; SECTION_LEN]> {
    let mut descriptor = [0u8; SECTION_LEN];
    descriptor[18..20].copy_from_slice(&to_u16(count, "record count")?.to_be_bytes());
    descriptor[20..22].copy_from_slice(&to_u16(stride, "record stride")?.to_be_bytes());
    descriptor[22..26].copy_from_slice(&to_u32(count * stride)?.to_be_bytes());
    descriptor[26..30].copy_from_slice(&to_u32(raw_offset)?.to_be_bytes());
    Ok(descriptor)
}

const GHM_TYPE_CHARS: &[u8] = b"\0CHKMZ";
const LEAF_MODE_CHARS: &[u8] = b"\0ABCDEJZ";
const GHS_MODE_CHARS: &[u8] = b"\0ABCDEJZT1234";
const DIAGNOSIS_SUFFIX_CHARS: &[u8] = b" 0123456789+";

fn char_index(chars: &[u8], value: u8, what: &str) -> Result<usize> {
    chars
        .iter()
        .position(|&c| c == value)
        .ok_or_else(|| TableError::encode(format!("{what} '{}'", char::from(value))))
}

fn root_type_seq(root: GhmRootCode) -> Result<usize> {
    if root.seq > 99 {
        return Err(TableError::encode(format!("GHM root {root}")));
    }
    Ok(char_index(GHM_TYPE_CHARS, root.kind, "GHM type")? * 100 + usize::from(root.seq))
}

/// Decision tree nodes (one section).
pub fn encode_ghm_decision_tree(nodes: &[GhmDecisionNode]) -> Result<SectionData> {
    let mut bytes = Vec::with_capacity(nodes.len() * 6);
    for node in nodes {
        let (function, params, count, idx) = match *node {
            GhmDecisionNode::Leaf { ghm, error } => {
                let idx = root_type_seq(ghm.root)? / 100 * 1000
                    + usize::from(ghm.root.seq) * 10
                    + char_index(LEAF_MODE_CHARS, ghm.mode, "leaf mode")?;
                (12, [error, ghm.root.cmd], 0, idx)
            }
            GhmDecisionNode::Test {
                function: 20,
                params,
                children_idx,
                ..
            } => {
                let offset = (usize::from(params[0]) << 8) + usize::from(params[1]);
                let idx = children_idx
                    .checked_sub(offset)
                    .ok_or_else(|| TableError::encode("jump target before its offset"))?;
                (20, params, 1, idx)
            }
            GhmDecisionNode::Test {
                function,
                params,
                children_idx,
                children_count,
            } => (
                function,
                params,
                to_u8(children_count, "children count")?,
                children_idx,
            ),
        };
        bytes.push(function);
        bytes.extend_from_slice(&params);
        bytes.push(count);
        bytes.extend_from_slice(&to_u16(idx, "children index")?.to_be_bytes());
    }
    Ok(SectionData::new(6, bytes))
}

/// Packed `(code123, code456)` of a diagnosis.
fn diagnosis_key(code: DiagnosisCode) -> Result<(u16, u16)> {
    let invalid = || TableError::encode(format!("diagnosis code {code}"));
    let text = code.as_str().as_bytes();
    let [letter, d1, d2, rest @ ..] = text else {
        return Err(invalid());
    };
    if !letter.is_ascii_uppercase() || !d1.is_ascii_digit() || !d2.is_ascii_digit() {
        return Err(invalid());
    }
    let root = u16::from(letter - b'A') * 100 + u16::from(d1 - b'0') * 10 + u16::from(d2 - b'0');

    let mut suffix = [0u16; 3];
    for (slot, &ch) in suffix.iter_mut().zip(rest) {
        *slot = DIAGNOSIS_SUFFIX_CHARS
            .iter()
            .position(|&c| c == ch)
            .ok_or_else(invalid)? as u16;
    }
    if suffix[2] > 10 {
        return Err(invalid());
    }
    Ok((root, suffix[0] * 132 + suffix[1] * 11 + suffix[2]))
}

/// Diagnosis table (five sections). Each diagnosis gets its own attribute
/// and warning records; `exclusions` become section 4.
pub fn encode_diagnosis_table(
    diagnoses: &[DiagnosisInfo],
    exclusions: &[ExclusionInfo],
) -> Result<Vec<SectionData>> {
    let mut keyed = diagnoses
        .iter()
        .map(|info| Ok((diagnosis_key(info.code)?, info)))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by_key(|&(key, _)| key);

    let mut roots = Vec::with_capacity(2600 * 2);
    let mut ptrs = Vec::new();
    let mut pairs = Vec::new();
    let mut warning_sets: Vec<u16> = Vec::new();
    let mut next = 0usize;

    for root in 0..2600u16 {
        while let Some(&((code123, code456), info)) = keyed.get(next) {
            if code123 != root {
                break;
            }
            if info.exclusion_set_idx >= exclusions.len() {
                return Err(TableError::encode(format!(
                    "exclusion set {} of {} does not exist",
                    info.exclusion_set_idx, info.code
                )));
            }
            if info.cma_exclusion.mask.count_ones() != 1 {
                return Err(TableError::encode(format!(
                    "exclusion mask {:#04x} of {} is not a single bit",
                    info.cma_exclusion.mask, info.code
                )));
            }
            let bit =
                info.cma_exclusion.offset * 8 + info.cma_exclusion.mask.leading_zeros() as usize;
            let warnings_idx = match warning_sets.iter().position(|&w| w == info.warnings) {
                Some(idx) => idx,
                None => {
                    warning_sets.push(info.warnings);
                    warning_sets.len() - 1
                }
            };

            ptrs.extend_from_slice(&code456.to_be_bytes());
            ptrs.extend_from_slice(&to_u16(next, "attribute index")?.to_be_bytes());
            ptrs.push(to_u8(warnings_idx, "warning index")?);
            ptrs.extend_from_slice(&to_u16(bit, "exclusion bit")?.to_be_bytes());
            ptrs.extend_from_slice(&to_u16(info.exclusion_set_idx, "exclusion index")?.to_be_bytes());

            pairs.extend_from_slice(&info.attributes[0].raw);
            pairs.extend_from_slice(&info.attributes[1].raw);
            next += 1;
        }
        roots.extend_from_slice(&to_u16(next, "diagnosis count")?.to_be_bytes());
    }

    let warnings: Vec<u8> = warning_sets
        .iter()
        .flat_map(|&set| (0..16).map(move |bit| u8::from(set & (1 << bit) != 0)))
        .collect();
    let sets: Vec<u8> = exclusions.iter().flat_map(|set| set.raw).collect();
    Ok(vec![
        SectionData::new(2, roots),
        SectionData::new(9, ptrs),
        SectionData::new(74, pairs),
        SectionData::new(16, warnings),
        SectionData::new(256, sets),
    ])
}

/// Packed `(root, char4, seq)` of a procedure.
fn procedure_key(code: ProcedureCode) -> Result<(usize, u8, u16)> {
    let invalid = || TableError::encode(format!("procedure code {code}"));
    let text = code.as_str().as_bytes();
    let [l0, l1, l2, l3, digits @ ..] = text else {
        return Err(invalid());
    };
    let letter = |b: u8| {
        b.is_ascii_uppercase()
            .then(|| usize::from(b - b'A'))
            .ok_or_else(invalid)
    };
    let root = letter(*l0)? * 676 + letter(*l1)? * 26 + letter(*l2)?;
    let seq = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)?;
    Ok((root, letter(*l3)? as u8, seq))
}

/// Procedure table (three sections).
pub fn encode_procedure_table(procedures: &[ProcedureInfo]) -> Result<Vec<SectionData>> {
    let mut keyed = procedures
        .iter()
        .map(|info| Ok((procedure_key(info.code)?, info)))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by_key(|&((root, char4, seq), info)| (root, char4, seq, info.phase, info.start));

    let mut roots = Vec::with_capacity(17576 * 2);
    let mut ptrs = Vec::new();
    let mut attributes = Vec::new();
    let mut next = 0usize;

    for root in 0..17576usize {
        while let Some(&((code_root, char4, seq), info)) = keyed.get(next) {
            if code_root != root {
                break;
            }
            let date_max = if Some(info.end) == Date::disk_max() {
                u16::MAX
            } else {
                disk_days(info.end)?.saturating_sub(1)
            };
            ptrs.push(char4);
            ptrs.extend_from_slice(&(seq * 10 + u16::from(info.phase % 10)).to_be_bytes());
            ptrs.extend_from_slice(&to_u16(next, "attribute index")?.to_be_bytes());
            ptrs.extend_from_slice(&disk_days(info.start)?.to_be_bytes());
            ptrs.extend_from_slice(&date_max.to_be_bytes());
            attributes.extend_from_slice(&info.bytes);
            next += 1;
        }
        roots.extend_from_slice(&to_u16(next, "procedure count")?.to_be_bytes());
    }

    Ok(vec![
        SectionData::new(2, roots),
        SectionData::new(9, ptrs),
        SectionData::new(55, attributes),
    ])
}

/// GHM root table; the stride follows `version`.
pub fn encode_ghm_root_table(roots: &[GhmRootInfo], version: (u16, u16)) -> Result<SectionData> {
    let stride = if version < (11, 15) { 11 } else { 12 };
    let mut bytes = Vec::with_capacity(roots.len() * stride);

    for root in roots {
        let duration_mode = if root.allow_ambulatory {
            1
        } else if root.short_duration_threshold > 0 {
            root.short_duration_threshold + 1
        } else {
            0
        };
        let young_mode = u8::from(root.young_age_threshold > 0);
        let old_mode = match (root.old_age_threshold, root.old_severity_limit) {
            (0, _) => 0,
            (70, limit @ 1..=3) => limit * 2 - 1,
            (80, limit @ 1..=3) => limit * 2,
            (age, limit) => {
                return Err(TableError::encode(format!(
                    "old age policy ({age}, {limit}) of {}",
                    root.code
                )));
            }
        };
        let childbirth_mode = match root.childbirth_severity_list {
            0 => 0,
            list => list + 1,
        };

        bytes.push(root.code.cmd);
        bytes.extend_from_slice(&to_u16(root_type_seq(root.code)?, "type_seq")?.to_be_bytes());
        bytes.extend_from_slice(&[young_mode, old_mode, duration_mode, 0, 0]);
        bytes.push(to_u8(root.cma_exclusion.offset, "exclusion offset")?);
        bytes.push(root.cma_exclusion.mask);
        bytes.push(root.confirm_duration_threshold);
        if stride == 12 {
            bytes.push(childbirth_mode);
        }
    }

    Ok(SectionData::new(stride, bytes))
}

/// Severity grid cells; exclusive maxima are written back as inclusive.
pub fn encode_severity_cells(cells: &[ValueRangeCell<2>]) -> Result<SectionData> {
    let mut bytes = Vec::with_capacity(cells.len() * 10);
    for cell in cells {
        for limit in cell.limits {
            let min = u16::try_from(limit.min);
            let max = u16::try_from(limit.max - 1);
            let (Ok(min), Ok(max)) = (min, max) else {
                return Err(TableError::encode(format!(
                    "range [{}, {}) does not fit in u16",
                    limit.min, limit.max
                )));
            };
            bytes.extend_from_slice(&min.to_be_bytes());
            bytes.extend_from_slice(&max.to_be_bytes());
        }
        bytes.extend_from_slice(&cell.value.to_be_bytes());
    }
    Ok(SectionData::new(10, bytes))
}

fn ghs_type_seq(ghm: GhmCode) -> Result<u16> {
    let type_idx = char_index(GHM_TYPE_CHARS, ghm.root.kind, "GHM type")?;
    let mode_idx = char_index(GHS_MODE_CHARS, ghm.mode, "GHM mode")?;
    to_u16(
        type_idx * 10000 + usize::from(ghm.root.seq) * 100 + mode_idx,
        "type_seq",
    )
}

fn mask_params(mask: BitMask) -> Result<[u8; 2]> {
    Ok([to_u8(mask.offset, "mask offset")?, mask.mask])
}

/// GHS groups (one section). Each condition becomes a record; the last
/// record of a group carries the GHS codes.
pub fn encode_ghs_table(groups: &[GhsInfo]) -> Result<SectionData> {
    let mut bytes = Vec::new();

    for group in groups {
        let mut conditions: Vec<(u8, [u8; 2])> = Vec::new();
        for mask in &group.procedure_masks {
            conditions.push((1, mask_params(*mask)?));
        }
        if group.unit_authorization != 0 {
            conditions.push((2, [0, group.unit_authorization]));
        }
        if group.bed_authorization != 0 {
            conditions.push((3, [0, group.bed_authorization]));
        }
        if let Some(mask) = group.main_diagnosis_mask {
            conditions.push((5, mask_params(mask)?));
        }
        if group.minimal_duration != 0 {
            conditions.push((6, [0, group.minimal_duration - 1]));
        }
        if let Some(mask) = group.diagnosis_mask {
            conditions.push((7, mask_params(mask)?));
        }
        if group.minimal_age != 0 {
            conditions.push((8, [0, group.minimal_age]));
        }
        if conditions.is_empty() {
            conditions.push((0, [0, 0]));
        }

        let type_seq = ghs_type_seq(group.ghm)?;
        let last = conditions.len() - 1;
        for (idx, (function, params)) in conditions.into_iter().enumerate() {
            bytes.push(group.ghm.root.cmd);
            bytes.extend_from_slice(&type_seq.to_be_bytes());
            bytes.push(0);
            bytes.push(function);
            bytes.extend_from_slice(&params);
            bytes.push(0);
            bytes.push(u8::from(idx == last));
            for ghs in group.ghs {
                bytes.extend_from_slice(&ghs.0.to_be_bytes());
                bytes.extend_from_slice(&[0; 4]);
            }
            bytes.push(0);
        }
    }

    Ok(SectionData::new(22, bytes))
}

/// Authorization table: bed records, then unit and facility records.
pub fn encode_authorization_table(authorizations: &[AuthorizationInfo]) -> Vec<SectionData> {
    let mut beds = Vec::new();
    let mut units = Vec::new();
    for auth in authorizations {
        match auth.scope {
            AuthorizationScope::Bed => beds.extend_from_slice(&[auth.code, auth.function, 0]),
            AuthorizationScope::Unit => units.extend_from_slice(&[auth.code, auth.function, 0]),
            AuthorizationScope::Facility => {
                units.extend_from_slice(&[auth.code, auth.function, 1]);
            }
        }
    }
    vec![SectionData::new(3, beds), SectionData::new(3, units)]
}

/// One supplement pair list.
pub fn encode_src_pairs(pairs: &[SrcPair]) -> Result<SectionData> {
    let mut bytes = Vec::with_capacity(pairs.len() * 8);
    for pair in pairs {
        let (diag123, diag456) = diagnosis_key(pair.diagnosis)?;
        let (root, char4, seq) = procedure_key(pair.procedure)?;
        bytes.extend_from_slice(&diag123.to_be_bytes());
        bytes.extend_from_slice(&diag456.to_be_bytes());
        bytes.extend_from_slice(&to_u16(root, "procedure root")?.to_be_bytes());
        bytes.extend_from_slice(&(u16::from(char4) * 1000 + seq).to_be_bytes());
    }
    Ok(SectionData::new(8, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded() {
        assert_eq!(padded::<8>("GHSINFO").expect("fits"), *b"GHSINFO ");
        assert!(padded::<4>("TOOLONG").is_err());
    }

    #[test]
    fn test_encode_header_fields() {
        let date = Date::from_ymd(2016, 3, 1).expect("valid date");
        let header = encode_header((11, 9), date, "ARBREDEC", 1).expect("header");
        assert_eq!(&header[8..12], b"11 9");
        assert_eq!(&header[12..18], b"010316");
        assert_eq!(&header[18..26], b"ARBREDEC");
        assert_eq!(header[27], 1);

        let old = Date::from_ymd(1999, 3, 1).expect("valid date");
        assert!(encode_header((11, 9), old, "ARBREDEC", 1).is_err());
    }

    #[test]
    fn test_diagnosis_key() {
        let key = |s: &str| diagnosis_key(DiagnosisCode::parse(s).expect("valid code"));
        assert_eq!(key("A00").expect("key"), (0, 0));
        assert_eq!(key("K359").expect("key"), (1035, 10 * 132));
        assert_eq!(key("X51+1").expect("key"), (2351, 11 * 132 + 2 * 11));
    }

    #[test]
    fn test_procedure_key() {
        let code = ProcedureCode::parse("ZCQK002").expect("valid code");
        assert_eq!(
            procedure_key(code).expect("key"),
            (25 * 676 + 2 * 26 + 16, 10, 2)
        );
    }

    #[test]
    fn test_rejects_ragged_section() {
        let date = Date::from_ymd(2016, 3, 1).expect("valid date");
        let builder = TableFileBuilder::new(date).table(
            TableData::new(TableType::GhmDecisionTree, date, date).section(SectionData::new(
                6,
                vec![0; 7],
            )),
        );
        assert!(matches!(builder.to_bytes(), Err(TableError::Encode { .. })));
    }
}
