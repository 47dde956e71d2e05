//! Per-type table decoders.
//!
//! Each decoder appends typed records to an output arena. A structural
//! inconsistency aborts the table with [`TableError::Malformed`] and leaves
//! the arena as it was before the call.
//!
//! [`TableError::Malformed`]: crate::TableError::Malformed

mod authorization;
mod diagnosis;
mod ghm_root;
mod ghs;
mod procedure;
mod severity;
mod src_pair;
mod tree;

pub use authorization::parse_authorization_table;
pub use diagnosis::{parse_diagnosis_table, parse_exclusion_table};
pub use ghm_root::parse_ghm_root_table;
pub use ghs::parse_ghs_table;
pub use procedure::parse_procedure_table;
pub use severity::parse_severity_table;
pub use src_pair::parse_src_pair_table;
pub use tree::parse_ghm_decision_tree;

use mco_model::{DiagnosisCode, ProcedureCode};

use crate::error::{Result, TableError};
use crate::types::{SectionInfo, TableInfo};

/// Characters of the packed diagnosis suffix, radix 12.
const DIAGNOSIS_SUFFIX_CHARS: &[u8; 12] = b" 0123456789+";

/// Letters `A..Z` for a value modulo 26.
fn letter(value: usize) -> u8 {
    // `value % 26` always fits in a u8
    b'A' + (value % 26) as u8
}

/// Rebuild a diagnosis code from its packed root (`0..2600`) and suffix.
pub(crate) fn diagnosis_code(code123: u16, code456: u16) -> Option<DiagnosisCode> {
    let root = usize::from(code123);
    if root >= 26 * 100 {
        return None;
    }
    let suffix = usize::from(code456 % 1584);
    let mut text = [
        letter(root / 100),
        b'0' + (root % 100 / 10) as u8,
        b'0' + (root % 10) as u8,
        DIAGNOSIS_SUFFIX_CHARS[suffix / 132],
        DIAGNOSIS_SUFFIX_CHARS[suffix % 132 / 11],
        DIAGNOSIS_SUFFIX_CHARS[suffix % 11],
    ]
    .to_vec();
    while text.len() > 3 && text.last() == Some(&b' ') {
        text.pop();
    }
    DiagnosisCode::from_ascii(&text)
}

/// Rebuild a procedure code: three letters from `root` in base 26, a fourth
/// letter and a 3-digit sequence.
pub(crate) fn procedure_code(root: usize, char4: usize, seq: u16) -> Option<ProcedureCode> {
    let text = format!(
        "{}{}{}{}{:03}",
        char::from(letter(root / 676)),
        char::from(letter(root / 26)),
        char::from(letter(root)),
        char::from(letter(char4)),
        seq % 1000
    );
    ProcedureCode::from_ascii(text.as_bytes())
}

/// Section `idx` of `table`, or a malformed-table error.
fn section(table: &TableInfo, idx: usize) -> Result<&SectionInfo> {
    table.sections.get(idx).ok_or_else(|| {
        TableError::malformed(&table.file, format!("missing section {idx}"))
    })
}

/// Record `idx` of `section`, or a malformed-table error.
fn record<'a>(data: &'a [u8], table: &TableInfo, section: &SectionInfo, idx: usize) -> Result<&'a [u8]> {
    section.record(data, idx).ok_or_else(|| {
        TableError::malformed(&table.file, format!("record {idx} out of bounds"))
    })
}

fn truncated(table: &TableInfo) -> TableError {
    TableError::malformed(&table.file, "truncated record")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnosis_code_expansion() {
        // 'K' = root 10xx, "35" then suffix digits '9', blank, blank
        let code = diagnosis_code(1035, 10 * 132).expect("valid code");
        assert_eq!(code.as_str(), "K359");

        let code = diagnosis_code(0, 0).expect("valid code");
        assert_eq!(code.as_str(), "A00");

        // '+' then '1' then blank
        let code = diagnosis_code(2351, 11 * 132 + 2 * 11).expect("valid code");
        assert_eq!(code.as_str(), "X51+1");

        assert_eq!(diagnosis_code(2600, 0), None);
    }

    #[test]
    fn test_diagnosis_code_keeps_interior_blank() {
        let code = diagnosis_code(2515, 2).expect("valid code");
        assert_eq!(code.as_str(), "Z15  1");
    }

    #[test]
    fn test_procedure_code_expansion() {
        // ZCQ = 25*676 + 2*26 + 16
        let root = 25 * 676 + 2 * 26 + 16;
        let code = procedure_code(root, 10, 2).expect("valid code");
        assert_eq!(code.as_str(), "ZCQK002");
    }
}
