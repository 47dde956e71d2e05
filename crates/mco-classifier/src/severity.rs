//! Severity mode of a GHM, from its root policy and the stay's complications.

use mco_model::{DiagnosisCode, EXIT_MODE_DEATH, GhmCode};
use mco_tables::{ClassifierIndex, DiagnosisInfo, GhmRootInfo, find_cell};

use crate::aggregate::StayAggregate;
use crate::error::{ClassifyFailure, Result};

/// Shortest stay, in days, allowed to reach `severity`.
pub fn minimal_duration_for_severity(severity: u8) -> i32 {
    if severity == 0 {
        0
    } else {
        i32::from(severity) + 2
    }
}

/// Cap `severity` by what a stay of `duration` days can reach.
///
/// Severity 1 needs 3 days, 2 needs 4 days and 3 needs 5 days.
pub fn limit_severity_with_duration(severity: u8, duration: i32) -> u8 {
    if duration >= 3 {
        let cap = u8::try_from(duration - 2).unwrap_or(u8::MAX);
        severity.min(cap)
    } else {
        0
    }
}

/// Complications of `cma` do not count when `cma` belongs to the exclusion
/// set of `main`.
fn is_excluded(index: &ClassifierIndex<'_>, cma: &DiagnosisInfo, main: &DiagnosisInfo) -> bool {
    index
        .exclusion_set(cma)
        .is_some_and(|set| set.contains(main.cma_exclusion))
}

/// Highest severity among the associated diagnoses that may raise it.
fn complication_severity(agg: &StayAggregate<'_>, root: &GhmRootInfo) -> u8 {
    let index = &agg.index;
    let sex = agg.stay.sex;
    let main = agg.stay.main_diagnosis;
    let linked = agg.stay.linked_diagnosis;
    let main_info = main.and_then(|code| index.find_diagnosis(code));
    let linked_info = linked.and_then(|code| index.find_diagnosis(code));

    let mut severity = 0;
    for &code in &agg.diagnoses {
        if Some(code) == main || Some(code) == linked {
            continue;
        }
        let Some(info) = index.find_diagnosis(code) else {
            continue;
        };
        let attributes = info.attributes(sex);
        if attributes.severity <= severity {
            continue;
        }

        let ignored = (agg.age < 14 && attributes.raw[19] & 0x10 != 0)
            || (agg.age >= 2 && attributes.raw[19] & 0x08 != 0)
            || (agg.age >= 2 && is_perinatal(code))
            || root.cma_exclusion.test(&attributes.raw)
            || main_info.is_some_and(|main| is_excluded(index, info, main))
            || linked_info.is_some_and(|linked| is_excluded(index, info, linked));
        if !ignored {
            severity = attributes.severity;
        }
    }
    severity
}

fn is_perinatal(code: DiagnosisCode) -> bool {
    code.chapter() == 'P'
}

/// Resolve the mode of `ghm` from its root policy.
///
/// Leaves that already carry a final mode (other than the childbirth letters)
/// are returned unchanged.
pub fn run_ghm_severity(agg: &StayAggregate<'_>, ghm: GhmCode) -> Result<GhmCode> {
    let root = agg
        .index
        .find_ghm_root(ghm.root)
        .ok_or(ClassifyFailure::UnknownGhmRoot { root: ghm.root })?;

    let mode = if root.allow_ambulatory && agg.duration == 0 {
        b'J'
    } else if root.short_duration_threshold > 0
        && agg.duration < i32::from(root.short_duration_threshold)
    {
        b'T'
    } else if (b'A'..b'E').contains(&ghm.mode) {
        let mut severity = ghm.mode - b'A';
        if root.childbirth_severity_list > 0 {
            let cells = agg.index.cma_cells(root.childbirth_severity_list);
            let values = [i32::from(agg.stay.gestational_age), i32::from(severity)];
            if let Some(value) = find_cell(cells, values) {
                severity = u8::try_from(value).unwrap_or(u8::MAX);
            }
        }
        b'A' + limit_severity_with_duration(severity, agg.duration)
    } else if ghm.mode == 0 {
        let mut severity = complication_severity(agg, root);
        let age = agg.age;
        if age >= i32::from(root.old_age_threshold) && severity < root.old_severity_limit {
            severity += 1;
        } else if age < i32::from(root.young_age_threshold) && severity < root.young_severity_limit
        {
            severity += 1;
        } else if agg.stay.exit.mode == EXIT_MODE_DEATH && severity == 0 {
            severity = 1;
        }
        b'1' + limit_severity_with_duration(severity, agg.duration)
    } else {
        ghm.mode
    };

    Ok(ghm.with_mode(mode))
}
