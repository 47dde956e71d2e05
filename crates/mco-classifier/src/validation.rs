//! Coding checks run around the tree walk.
//!
//! [`check_diagnoses`] and [`check_procedures`] validate the codes of every
//! record before the walk. [`check_ghm_errors`] and [`check_confirmation`]
//! look at the GHM the tree reached. Each returns false when a blocking
//! error was recorded.

use mco_model::{Date, EXIT_MODE_DEATH, GhmCode, GhmRootCode, ProcedureCode, Sex, Stay};
use mco_tables::{DiagnosisInfo, GhmRootInfo};

use crate::aggregate::StayAggregate;
use crate::error_set::ErrorSet;

/// Error codes of one diagnosis position; 0 means no error.
struct DiagnosisErrors {
    obsolete: u16,
    /// By jump value, for CMD 0 diagnoses.
    imprecise: [u16; 4],
    reserved: u16,
    too_young: u16,
    too_old: u16,
    inappropriate_warning: u16,
    imprecise_warning: u16,
    unusual_warning: u16,
    sex_warning: u16,
    age_warning: u16,
}

const MAIN_DIAGNOSIS: DiagnosisErrors = DiagnosisErrors {
    obsolete: 68,
    imprecise: [113, 114, 115, 113],
    reserved: 180,
    too_young: 130,
    too_old: 133,
    inappropriate_warning: 88,
    imprecise_warning: 84,
    unusual_warning: 87,
    sex_warning: 86,
    age_warning: 85,
};

const LINKED_DIAGNOSIS: DiagnosisErrors = DiagnosisErrors {
    obsolete: 95,
    imprecise: [116, 117, 118, 0],
    reserved: 181,
    too_young: 131,
    too_old: 134,
    inappropriate_warning: 0,
    imprecise_warning: 96,
    unusual_warning: 99,
    sex_warning: 98,
    age_warning: 97,
};

const ASSOCIATED_DIAGNOSIS: DiagnosisErrors = DiagnosisErrors {
    obsolete: 71,
    imprecise: [0, 0, 119, 0],
    reserved: 182,
    too_young: 132,
    too_old: 135,
    inappropriate_warning: 0,
    imprecise_warning: 90,
    unusual_warning: 93,
    sex_warning: 92,
    age_warning: 91,
};

fn on_or_after(date: Date, year: i32, month: u32, day: u32) -> bool {
    Date::from_ymd(year, month, day).is_some_and(|cutoff| date >= cutoff)
}

/// Record a blocking `error`; code 0 is no error.
fn block(errors: &mut ErrorSet, error: u16) -> bool {
    if error == 0 {
        return true;
    }
    errors.record(error);
    false
}

fn warn_if(errors: &mut ErrorSet, condition: bool, error: u16) {
    if condition && error != 0 {
        errors.warn(error);
    }
}

/// Warning bit of the patient's age band.
fn age_warning_bit(agg: &StayAggregate<'_>) -> u16 {
    let child_limit = if on_or_after(agg.stay.discharge_date, 2016, 3, 1) {
        8
    } else {
        10
    };
    match agg.age {
        _ if agg.age_in_days() < 29 => 4,
        0 => 3,
        age if age < child_limit => 5,
        age if age < 20 => 6,
        age if age < 65 => 7,
        _ => 8,
    }
}

fn check_diagnosis(
    agg: &StayAggregate<'_>,
    info: &DiagnosisInfo,
    codes: &DiagnosisErrors,
    errors: &mut ErrorSet,
) -> bool {
    let sex = agg.stay.sex;
    let warnings = info.warnings;
    let has_warning = |bit: u16| warnings & (1 << bit) != 0;

    warn_if(errors, has_warning(9), codes.inappropriate_warning);
    warn_if(errors, has_warning(0), codes.imprecise_warning);
    warn_if(errors, has_warning(10), codes.unusual_warning);
    warn_if(errors, has_warning(13 - u16::from(sex.code())), codes.sex_warning);
    warn_if(errors, has_warning(age_warning_bit(agg)), codes.age_warning);

    let raw = &info.attributes(sex).raw;
    if raw[5] & 0x02 != 0 {
        block(errors, codes.obsolete)
    } else if raw[0] == 0 {
        match codes.imprecise.get(usize::from(raw[1])) {
            Some(&error) => block(errors, error),
            None => true,
        }
    } else if on_or_after(agg.stay.discharge_date, 2014, 3, 1) && raw[0] == 23 && raw[1] == 14 {
        block(errors, codes.reserved)
    } else if raw[19] & 0x10 != 0 && agg.age < 9 {
        block(errors, codes.too_young)
    } else if raw[19] & 0x08 != 0 && agg.age >= 2 {
        block(errors, codes.too_old)
    } else {
        true
    }
}

/// Look up and check the diagnoses of every record.
///
/// Unknown codes give 67 (main), 94 (linked) or 70 (associated). A missing
/// main diagnosis is left to the cluster checks.
pub fn check_diagnoses(agg: &StayAggregate<'_>, errors: &mut ErrorSet) -> bool {
    let index = &agg.index;
    let mut valid = true;

    for stay in agg.stays {
        for &code in &stay.associated_diagnoses {
            if Some(code) == stay.main_diagnosis || Some(code) == stay.linked_diagnosis {
                continue;
            }
            valid &= match index.find_diagnosis(code) {
                Some(info) => check_diagnosis(agg, info, &ASSOCIATED_DIAGNOSIS, errors),
                None => block(errors, 70),
            };
        }
        if let Some(code) = stay.main_diagnosis {
            valid &= match index.find_diagnosis(code) {
                Some(info) => check_diagnosis(agg, info, &MAIN_DIAGNOSIS, errors),
                None => block(errors, 67),
            };
        }
        if let Some(code) = stay.linked_diagnosis {
            valid &= match index.find_diagnosis(code) {
                Some(info) => check_diagnosis(agg, info, &LINKED_DIAGNOSIS, errors),
                None => block(errors, 94),
            };
        }
    }

    valid
}

fn is_placeholder(code: ProcedureCode) -> bool {
    code.as_str().starts_with("YYYY")
}

fn check_record_procedures(agg: &StayAggregate<'_>, stay: &Stay, errors: &mut ErrorSet) -> bool {
    let index = &agg.index;
    let mut valid = true;

    for proc in &stay.procedures {
        if proc.count == 0 {
            valid &= block(errors, 52);
        }
        if proc.activities == 0 {
            valid &= block(errors, 103);
        }

        let Some(info) = index.find_procedure(proc.code, proc.phase, stay.discharge_date) else {
            let known: Vec<_> = index
                .find_procedures(proc.code)
                .iter()
                .filter(|info| info.phase == proc.phase)
                .collect();
            valid &= match (known.first(), known.last()) {
                (Some(first), Some(last)) if !is_placeholder(proc.code) => {
                    if stay.discharge_date < first.start {
                        block(errors, 79)
                    } else if stay.admission_date >= last.end {
                        block(errors, 78)
                    } else {
                        true
                    }
                }
                (Some(_), Some(_)) => true,
                _ => block(errors, 73),
            };
            continue;
        };

        warn_if(errors, info.byte(43) & 0x40 != 0 && agg.stay.sex == Sex::Female, 148);
        let weight = agg.stay.newborn_weight;
        if (agg.age > 0 || agg.age_in_days() > 28)
            && info.byte(44) & 0x20 != 0
            && (weight == 0 || weight >= 3000)
        {
            valid &= block(errors, 149);
        }

        let delivery = info.byte(41) & 0x02 != 0;
        if proc.date < stay.admission_date || proc.date > stay.discharge_date {
            if delivery {
                valid &= block(errors, 142);
            } else {
                errors.warn(102);
            }
        }
    }

    valid
}

/// Look up and check the procedures of every record against the index in
/// force at the record's discharge.
pub fn check_procedures(agg: &StayAggregate<'_>, errors: &mut ErrorSet) -> bool {
    agg.stays
        .iter()
        .fold(true, |valid, stay| check_record_procedures(agg, stay, errors) & valid)
}

/// Checks that depend on the GHM reached by the tree.
pub fn check_ghm_errors(agg: &StayAggregate<'_>, ghm: GhmCode, errors: &mut ErrorSet) -> bool {
    const ROOT_14C04: GhmRootCode = GhmRootCode::new(14, b'C', 4);
    const ROOT_14M02: GhmRootCode = GhmRootCode::new(14, b'M', 2);
    const ROOT_14Z08: GhmRootCode = GhmRootCode::new(14, b'Z', 8);

    let stay = &agg.stay;
    let recent = on_or_after(stay.discharge_date, 2016, 3, 1);
    let mut valid = true;

    if ghm.root.cmd == 28 {
        if agg.stays.len() > 1 {
            valid &= block(errors, 150);
        }
        if recent
            && stay.main_diagnosis.is_some_and(|code| code.starts_with("Z511"))
            && stay.linked_diagnosis.is_none()
        {
            valid &= block(errors, 187);
        }
    }

    if ghm.root.cmd == 14
        && ghm.root != ROOT_14C04
        && ghm.root != ROOT_14M02
        && stay.last_menstrual_period.is_none()
    {
        valid &= block(errors, 162);
    }

    if recent && ghm.root == ROOT_14Z08 {
        let typed = agg
            .procedures
            .iter()
            .any(|proc| matches!(proc.code.as_str(), "JNJD002" | "JNJP001"));
        warn_if(errors, !typed, 179);
    }

    valid
}

/// GHMs a childbirth stay may reach without confirmation.
fn allowed_for_childbirth(ghm: GhmCode) -> bool {
    let GhmRootCode { cmd, kind, seq } = ghm.root;
    match cmd {
        12 | 14 | 22 | 25 | 26 | 27 => true,
        1 => matches!(
            (kind, seq),
            (b'C', 3..=6 | 10..=12) | (b'K', 7) | (b'M', 13 | 18 | 19 | 24 | 25 | 30 | 31)
        ),
        7 => kind == b'C' && (9..=14).contains(&seq),
        23 => kind == b'Z' && seq == 2,
        _ => false,
    }
}

/// Whether the stay needs the coder's confirmation for `ghm`.
fn needs_confirmation(agg: &StayAggregate<'_>, ghm: GhmCode, root: &GhmRootInfo) -> bool {
    let exit = agg.stay.exit;
    let expected_exit =
        exit.mode == EXIT_MODE_DEATH || exit.mode == 0 || (exit.mode == 7 && exit.destination == 1);

    if agg.duration >= 365 {
        true
    } else if agg.duration < i32::from(root.confirm_duration_threshold) && !expected_exit {
        true
    } else if agg.childbirth || agg.childbirth_type {
        !allowed_for_childbirth(ghm)
    } else {
        false
    }
}

/// Compare the stay's confirmation flag with what `ghm` requires.
pub fn check_confirmation(
    agg: &StayAggregate<'_>,
    ghm: GhmCode,
    root: &GhmRootInfo,
    errors: &mut ErrorSet,
) -> bool {
    let confirm = needs_confirmation(agg, ghm, root);
    if agg.stay.confirmed {
        if confirm {
            errors.notice(223);
            true
        } else if agg.duration >= i32::from(root.confirm_duration_threshold) {
            block(errors, 124)
        } else {
            true
        }
    } else if confirm {
        block(errors, 120)
    } else {
        true
    }
}
