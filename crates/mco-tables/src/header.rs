//! Table file headers.
//!
//! A `.tab` file starts with a main header describing one section of table
//! pointers. Each pointer gives the validity dates of one table and the
//! offset of its own header, which is followed by up to 16 section
//! descriptors.
//!
//! # Main and table header (32 bytes)
//!
//! | Offset | Field          | Type    | Description                       |
//! |--------|----------------|---------|-----------------------------------|
//! | 0-7    | signature      | char[8] | Free text                         |
//! | 8-11   | version        | char[4] | `%2u%2u`, e.g. `1111`             |
//! | 12-17  | build date     | char[6] | `ddmmyy`, year 2000-based         |
//! | 18-25  | name           | char[8] | Type tag, blank padded            |
//! | 26     | pad            | u8      |                                   |
//! | 27     | sections_count | u8      | Number of section descriptors     |
//! | 28-31  | pad            | u8[4]   |                                   |
//!
//! # Section descriptor (33 bytes)
//!
//! | Offset | Field        | Type   | Description                         |
//! |--------|--------------|--------|-------------------------------------|
//! | 0-17   | pad          | u8[18] |                                     |
//! | 18-19  | values_count | u16    | Number of records                   |
//! | 20-21  | value_len    | u16    | Record stride                       |
//! | 22-25  | raw_len      | u32    | `values_count * value_len`          |
//! | 26-29  | raw_offset   | u32    | Relative to the owning table header |
//! | 30-32  | pad          | u8[3]  |                                     |
//!
//! # Table pointer (10 bytes)
//!
//! | Offset | Field      | Type   | Description                           |
//! |--------|------------|--------|---------------------------------------|
//! | 0-3    | date_range | u16[2] | Days since 1979-12-31, `[start, end)` |
//! | 4-5    | pad        | u8[2]  |                                       |
//! | 6-9    | raw_offset | u32    | Offset of the table header            |

use mco_model::Date;
use tracing::{debug, warn};

use crate::bytes::ByteReader;
use crate::error::{Result, TableError, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{SectionInfo, TableInfo, TableType};

/// Size of the main and per-table headers.
pub const HEADER_LEN: usize = 32;
/// Size of a section descriptor.
pub const SECTION_LEN: usize = 33;
/// Size of a table pointer.
pub const TABLE_PTR_LEN: usize = 10;
/// Maximum number of sections in one table.
pub const MAX_SECTIONS: usize = 16;
/// Oldest supported format version.
pub const MIN_VERSION: (u16, u16) = (11, 10);

#[derive(Debug, Clone, Copy)]
struct RawHeader {
    version: [u8; 4],
    date: [u8; 6],
    name: [u8; 8],
    sections_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct RawSection {
    values_count: u16,
    value_len: u16,
    raw_len: u32,
    raw_offset: u32,
}

#[derive(Debug, Clone, Copy)]
struct RawTablePtr {
    date_range: [u16; 2],
    raw_offset: u32,
}

fn read_header(data: &[u8], offset: usize) -> Option<RawHeader> {
    let mut reader = ByteReader::at(data, offset);
    reader.skip(8)?;
    let version = reader.array()?;
    let date = reader.array()?;
    let name = reader.array()?;
    reader.skip(1)?;
    let sections_count = usize::from(reader.u8()?);
    reader.skip(4)?;
    Some(RawHeader {
        version,
        date,
        name,
        sections_count,
    })
}

fn read_section(data: &[u8], offset: usize) -> Option<RawSection> {
    let mut reader = ByteReader::at(data, offset);
    reader.skip(18)?;
    Some(RawSection {
        values_count: reader.u16()?,
        value_len: reader.u16()?,
        raw_len: reader.u32()?,
        raw_offset: reader.u32()?,
    })
}

fn read_table_ptr(data: &[u8], offset: usize) -> Option<RawTablePtr> {
    let mut reader = ByteReader::at(data, offset);
    let date_range = [reader.u16()?, reader.u16()?];
    reader.skip(2)?;
    Some(RawTablePtr {
        date_range,
        raw_offset: reader.u32()?,
    })
}

/// Parse a 2-digit ASCII field; blanks around the digits are tolerated.
fn parse_ascii_pair(bytes: &[u8]) -> Option<u16> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

/// Parse the `%2u%2u` version field, `(0, 0)` when unreadable.
pub fn parse_version(raw: &[u8; 4]) -> (u16, u16) {
    match (parse_ascii_pair(&raw[..2]), parse_ascii_pair(&raw[2..])) {
        (Some(major), Some(minor)) => (major, minor),
        _ => (0, 0),
    }
}

/// Parse the `ddmmyy` build date.
pub fn parse_build_date(raw: &[u8; 6]) -> Option<Date> {
    let day = parse_ascii_pair(&raw[..2])?;
    let month = parse_ascii_pair(&raw[2..4])?;
    let year = parse_ascii_pair(&raw[4..])?;
    Date::from_ymd(2000 + i32::from(year), u32::from(month), u32::from(day))
}

/// Type tag text: the name cut at the first blank or NUL.
fn parse_raw_type(name: &[u8; 8]) -> String {
    let len = name
        .iter()
        .position(|&b| b == b' ' || b == 0)
        .unwrap_or(name.len());
    String::from_utf8_lossy(&name[..len]).into_owned()
}

/// Parse every table header of a file and append them to `out`.
///
/// On error nothing is appended.
pub fn parse_table_headers(
    data: &[u8],
    file: &str,
    source: usize,
    out: &mut Vec<TableInfo>,
) -> Result<()> {
    let mut tables = AppendGuard::new(out);

    ensure_table!(file, data.len() >= HEADER_LEN + SECTION_LEN);
    let malformed = |reason: &str| TableError::malformed(file, reason);

    let main_header = read_header(data, 0).ok_or_else(|| malformed("truncated main header"))?;
    ensure_table!(file, main_header.sections_count == 1);
    let main_section =
        read_section(data, HEADER_LEN).ok_or_else(|| malformed("truncated main section"))?;

    let version = parse_version(&main_header.version);
    ensure_table!(file, version >= MIN_VERSION);
    ensure_table!(file, usize::from(main_section.value_len) == TABLE_PTR_LEN);
    let ptrs_len = usize::from(main_section.values_count) * TABLE_PTR_LEN;
    ensure_table!(file, data.len() >= HEADER_LEN + SECTION_LEN + ptrs_len);

    let build_date = parse_build_date(&main_header.date)
        .ok_or_else(|| malformed("invalid build date in main header"))?;

    for i in 0..usize::from(main_section.values_count) {
        let ptr = read_table_ptr(data, HEADER_LEN + SECTION_LEN + i * TABLE_PTR_LEN)
            .ok_or_else(|| malformed("truncated table pointer"))?;
        let table_offset = ptr.raw_offset as usize;
        ensure_table!(file, data.len() >= table_offset.saturating_add(HEADER_LEN));

        let header =
            read_header(data, table_offset).ok_or_else(|| malformed("truncated table header"))?;
        ensure_table!(file, header.sections_count <= MAX_SECTIONS);
        ensure_table!(
            file,
            data.len() >= table_offset + HEADER_LEN + header.sections_count * SECTION_LEN
        );

        let mut sections = Vec::with_capacity(header.sections_count);
        for j in 0..header.sections_count {
            let raw = read_section(data, table_offset + HEADER_LEN + j * SECTION_LEN)
                .ok_or_else(|| malformed("truncated section descriptor"))?;
            let offset = table_offset.saturating_add(raw.raw_offset as usize);
            let len = raw.raw_len as usize;
            ensure_table!(file, data.len() >= offset.saturating_add(len));
            ensure_table!(
                file,
                u64::from(raw.raw_len) == u64::from(raw.values_count) * u64::from(raw.value_len)
            );
            sections.push(SectionInfo {
                offset,
                len,
                count: usize::from(raw.values_count),
                stride: usize::from(raw.value_len),
            });
        }

        let start = Date::from_disk_days(ptr.date_range[0])
            .ok_or_else(|| malformed("invalid start date"))?;
        let end = Date::from_disk_days(ptr.date_range[1])
            .ok_or_else(|| malformed("invalid end date"))?;
        ensure_table!(file, end > start);

        let raw_type = parse_raw_type(&header.name);
        let kind = TableType::from_tag(&raw_type);
        if kind == TableType::Unknown {
            warn!(file, tag = %raw_type, "skipping table with unknown type");
        } else {
            debug!(file, %kind, %start, %end, sections = sections.len(), "found table");
        }

        tables.push(TableInfo {
            source,
            file: file.to_string(),
            build_date,
            version: parse_version(&header.version),
            start,
            end,
            raw_type,
            kind,
            sections,
        });
    }

    tables.commit();
    Ok(())
}
