//! Attribute byte lookups shared by the classification steps.
//!
//! Unknown codes and out-of-range offsets read as 0.

use mco_model::{DiagnosisCode, ProcedureRealisation, Sex};
use mco_tables::{BitMask, ClassifierIndex};

pub(crate) fn diagnosis_byte(
    index: &ClassifierIndex<'_>,
    sex: Sex,
    code: Option<DiagnosisCode>,
    offset: usize,
) -> u8 {
    code.and_then(|code| index.find_diagnosis(code))
        .map_or(0, |info| info.byte(sex, offset))
}

pub(crate) fn test_diagnosis(
    index: &ClassifierIndex<'_>,
    sex: Sex,
    code: Option<DiagnosisCode>,
    mask: BitMask,
) -> bool {
    diagnosis_byte(index, sex, code, mask.offset) & mask.mask != 0
}

/// Byte of the procedure record matching the code, phase and date of `proc`.
pub(crate) fn procedure_byte(
    index: &ClassifierIndex<'_>,
    proc: &ProcedureRealisation,
    offset: usize,
) -> u8 {
    index
        .find_procedure(proc.code, proc.phase, proc.date)
        .map_or(0, |info| info.byte(offset))
}

pub(crate) fn test_procedure(
    index: &ClassifierIndex<'_>,
    proc: &ProcedureRealisation,
    mask: BitMask,
) -> bool {
    procedure_byte(index, proc, mask.offset) & mask.mask != 0
}
