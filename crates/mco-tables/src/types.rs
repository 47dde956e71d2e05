//! Decoded table metadata and record types.

use std::fmt;

use mco_model::{Date, DiagnosisCode, GhmCode, GhmRootCode, GhsCode, ProcedureCode, Sex};

/// Kind of table, resolved from the 8-byte type tag in the table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableType {
    GhmDecisionTree,
    Diagnosis,
    Procedure,
    GhmRoot,
    Severity,
    GhsTree,
    Authorization,
    SrcPair,
    /// Any other tag; ignored by the versioner.
    Unknown,
}

impl TableType {
    /// Number of known table types.
    pub const COUNT: usize = 8;

    /// All known types, in index order.
    pub const KNOWN: [TableType; Self::COUNT] = [
        TableType::GhmDecisionTree,
        TableType::Diagnosis,
        TableType::Procedure,
        TableType::GhmRoot,
        TableType::Severity,
        TableType::GhsTree,
        TableType::Authorization,
        TableType::SrcPair,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ARBREDEC" => TableType::GhmDecisionTree,
            "DIAG10CR" => TableType::Diagnosis,
            "CCAMCARA" => TableType::Procedure,
            "RGHMINFO" => TableType::GhmRoot,
            "TABCOMBI" => TableType::Severity,
            "GHSINFO" => TableType::GhsTree,
            "AUTOREFS" => TableType::Authorization,
            "SRCDGACT" => TableType::SrcPair,
            _ => TableType::Unknown,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            TableType::GhmDecisionTree => "ARBREDEC",
            TableType::Diagnosis => "DIAG10CR",
            TableType::Procedure => "CCAMCARA",
            TableType::GhmRoot => "RGHMINFO",
            TableType::Severity => "TABCOMBI",
            TableType::GhsTree => "GHSINFO",
            TableType::Authorization => "AUTOREFS",
            TableType::SrcPair => "SRCDGACT",
            TableType::Unknown => "",
        }
    }

    /// Position in [`TableType::KNOWN`], `None` for unknown tables.
    pub fn index(self) -> Option<usize> {
        Self::KNOWN.iter().position(|&kind| kind == self)
    }

    pub fn label(self) -> &'static str {
        match self {
            TableType::GhmDecisionTree => "GHM Decision Tree",
            TableType::Diagnosis => "Diagnosis Table",
            TableType::Procedure => "Procedure Table",
            TableType::GhmRoot => "GHM Root Table",
            TableType::Severity => "Severity Table",
            TableType::GhsTree => "GHS Table",
            TableType::Authorization => "Authorization Table",
            TableType::SrcPair => "Supplement Pair Table",
            TableType::Unknown => "Unknown Table",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw section of a table: `count` records of `stride` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    /// Absolute offset in the file.
    pub offset: usize,
    pub len: usize,
    pub count: usize,
    pub stride: usize,
}

impl SectionInfo {
    /// Bytes of record `idx`, if it lies inside `data`.
    pub fn record<'a>(&self, data: &'a [u8], idx: usize) -> Option<&'a [u8]> {
        if idx >= self.count {
            return None;
        }
        let start = self.offset.checked_add(idx.checked_mul(self.stride)?)?;
        data.get(start..start.checked_add(self.stride)?)
    }

    /// Iterate over every record of the section.
    pub fn records<'a>(&self, data: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        let bytes = self
            .offset
            .checked_add(self.len)
            .and_then(|end| data.get(self.offset..end))
            .unwrap_or(&[]);
        let count = if self.stride == 0 { 0 } else { self.count };
        bytes.chunks_exact(self.stride.max(1)).take(count)
    }
}

/// Metadata of one table found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Index of the source file in the loader.
    pub source: usize,
    /// File name, used in error messages.
    pub file: String,
    pub build_date: Date,
    pub version: (u16, u16),
    /// First valid day.
    pub start: Date,
    /// First day after the validity interval.
    pub end: Date,
    pub raw_type: String,
    pub kind: TableType,
    pub sections: Vec<SectionInfo>,
}

impl TableInfo {
    /// True if the table is valid on `date`.
    pub fn covers(&self, date: Date) -> bool {
        self.start <= date && date < self.end
    }
}

/// Byte offset plus bit mask, tested against attribute bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitMask {
    pub offset: usize,
    pub mask: u8,
}

impl BitMask {
    pub const fn new(offset: usize, mask: u8) -> Self {
        Self { offset, mask }
    }

    /// True if the masked bits are set; out-of-range offsets never match.
    pub fn test(&self, bytes: &[u8]) -> bool {
        bytes
            .get(self.offset)
            .is_some_and(|&byte| byte & self.mask != 0)
    }
}

/// One node of the GHM decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhmDecisionNode {
    /// Run test `function`; its result selects child `children_idx + result`.
    Test {
        function: u8,
        params: [u8; 2],
        children_idx: usize,
        children_count: usize,
    },
    /// Terminal node; a non-zero `error` is reported with the GHM.
    Leaf { ghm: GhmCode, error: u8 },
}

/// Per-sex attribute block of a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosisAttributes {
    pub raw: [u8; 37],
    pub cmd: u8,
    pub jump: u8,
    pub severity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosisInfo {
    pub code: DiagnosisCode,
    /// The male and female attribute blocks differ.
    pub sex_difference: bool,
    pub attributes: [DiagnosisAttributes; 2],
    pub warnings: u16,
    pub exclusion_set_idx: usize,
    /// Position of this diagnosis in exclusion bitsets.
    pub cma_exclusion: BitMask,
}

impl DiagnosisInfo {
    pub fn attributes(&self, sex: Sex) -> &DiagnosisAttributes {
        &self.attributes[sex.index()]
    }

    /// Attribute byte `offset` for `sex`, or 0 when out of range.
    pub fn byte(&self, sex: Sex, offset: usize) -> u8 {
        self.attributes(sex).raw.get(offset).copied().unwrap_or(0)
    }
}

/// Set of diagnoses excluded as complications of another diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionInfo {
    pub raw: [u8; 256],
}

impl ExclusionInfo {
    pub fn contains(&self, position: BitMask) -> bool {
        position.test(&self.raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcedureInfo {
    pub code: ProcedureCode,
    pub phase: u8,
    pub start: Date,
    pub end: Date,
    pub bytes: [u8; 55],
}

impl ProcedureInfo {
    /// Attribute byte `offset`, or 0 when out of range.
    pub fn byte(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    pub fn covers(&self, date: Date) -> bool {
        self.start <= date && date < self.end
    }
}

/// Severity policy of a GHM root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhmRootInfo {
    pub code: GhmRootCode,
    pub allow_ambulatory: bool,
    /// Durations below this threshold get the `T` mode; 0 disables it.
    pub short_duration_threshold: u8,
    pub confirm_duration_threshold: u8,
    pub young_age_threshold: u8,
    pub young_severity_limit: u8,
    pub old_age_threshold: u8,
    pub old_severity_limit: u8,
    /// Childbirth CMA list (1..=3), 0 when the root has none.
    pub childbirth_severity_list: u8,
    pub cma_exclusion: BitMask,
}

/// Half-open range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueRange {
    pub min: i32,
    pub max: i32,
}

impl ValueRange {
    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value < self.max
    }
}

/// Grid cell mapping `N` ranges to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRangeCell<const N: usize> {
    pub limits: [ValueRange; N],
    pub value: u16,
}

impl<const N: usize> ValueRangeCell<N> {
    pub fn matches(&self, values: [i32; N]) -> bool {
        self.limits
            .iter()
            .zip(values)
            .all(|(limit, value)| limit.contains(value))
    }
}

/// First cell of `cells` matching `values`.
pub fn find_cell<const N: usize>(cells: &[ValueRangeCell<N>], values: [i32; N]) -> Option<u16> {
    cells
        .iter()
        .find(|cell| cell.matches(values))
        .map(|cell| cell.value)
}

/// Conditions under which a GHM maps to a GHS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhsInfo {
    pub ghm: GhmCode,
    /// Public and private sector GHS.
    pub ghs: [GhsCode; 2],
    pub bed_authorization: u8,
    pub unit_authorization: u8,
    pub minimal_duration: u8,
    pub minimal_age: u8,
    pub main_diagnosis_mask: Option<BitMask>,
    pub diagnosis_mask: Option<BitMask>,
    pub procedure_masks: Vec<BitMask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationScope {
    Bed,
    Unit,
    Facility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationInfo {
    pub scope: AuthorizationScope,
    pub code: u8,
    pub function: u8,
}

/// Diagnosis and procedure that open a supplement together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcPair {
    pub diagnosis: DiagnosisCode,
    pub procedure: ProcedureCode,
}
