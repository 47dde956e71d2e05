//! Merging the records of a cluster into one synthesized stay.

use mco_model::{DiagnosisCode, ProcedureRealisation, Stay};
use mco_tables::{ClassifierIndex, TableSet};

use crate::error::{ClassifyFailure, Result};
use crate::error_set::ErrorSet;
use crate::main_stay::find_main_stay;

/// Largest procedure count kept after merging duplicates.
const MAX_PROCEDURE_COUNT: u16 = 9999;

/// A cluster of records merged for classification.
#[derive(Debug, Clone)]
pub struct StayAggregate<'a> {
    /// Synthesized stay: first record, patched with cluster-wide values.
    pub stay: Stay,
    pub stays: &'a [Stay],
    pub index: ClassifierIndex<'a>,
    /// Age in years at the first admission.
    pub age: i32,
    /// Sum of the record durations, in days.
    pub duration: i32,
    /// Every diagnosis of the cluster, sorted and deduplicated.
    pub diagnoses: Vec<DiagnosisCode>,
    /// Every procedure of the cluster, merged by code and phase.
    pub procedures: Vec<ProcedureRealisation>,
    /// A Z37 delivery outcome or a delivery procedure was coded.
    pub childbirth: bool,
    /// An O80 to O84 delivery type was coded.
    pub childbirth_type: bool,
}

impl StayAggregate<'_> {
    /// Age in days at the first admission, 0 without a birthdate.
    pub fn age_in_days(&self) -> i32 {
        self.stay
            .birthdate
            .map_or(0, |birthdate| self.stay.admission_date - birthdate)
    }
}

/// Childbirth markers of the associated diagnoses and procedures of
/// `stays`, as `(childbirth, childbirth_type)`.
fn childbirth_markers(index: &ClassifierIndex<'_>, stays: &[Stay]) -> (bool, bool) {
    let (mut childbirth, mut childbirth_type) = (false, false);
    for stay in stays {
        for &code in &stay.associated_diagnoses {
            if Some(code) == stay.main_diagnosis || Some(code) == stay.linked_diagnosis {
                continue;
            }
            childbirth |= code.starts_with("Z37");
            childbirth_type |= ["O80", "O81", "O82", "O83", "O84"]
                .iter()
                .any(|prefix| code.starts_with(prefix));
        }
        childbirth |= stay.procedures.iter().any(|proc| {
            index
                .find_procedure(proc.code, proc.phase, stay.discharge_date)
                .is_some_and(|info| info.byte(41) & 0x02 != 0)
        });
    }
    (childbirth, childbirth_type)
}

fn merge_procedures(stays: &[Stay]) -> Vec<ProcedureRealisation> {
    let mut procedures: Vec<ProcedureRealisation> = stays
        .iter()
        .flat_map(|stay| stay.procedures.iter().copied())
        .collect();
    procedures.sort_by_key(|proc| (proc.code, proc.phase));

    let mut merged: Vec<ProcedureRealisation> = Vec::with_capacity(procedures.len());
    for proc in procedures {
        match merged.last_mut() {
            Some(last) if last.code == proc.code && last.phase == proc.phase => {
                last.activities |= proc.activities;
                last.count = last
                    .count
                    .saturating_add(proc.count)
                    .min(MAX_PROCEDURE_COUNT);
            }
            _ => merged.push(proc),
        }
    }
    merged
}

/// Merge the records of one cluster.
///
/// The index is chosen from the discharge date of the last record; an
/// index missing any table needed to classify counts as absent. When
/// the cluster spans several records, its main and linked diagnoses come
/// from [`find_main_stay`].
pub fn aggregate<'a>(set: &'a TableSet, stays: &'a [Stay]) -> Result<StayAggregate<'a>> {
    let (Some(first), Some(last)) = (stays.first(), stays.last()) else {
        return Err(ClassifyFailure::EmptyCluster);
    };
    let index = set
        .find_index(Some(last.discharge_date))
        .filter(ClassifierIndex::is_complete)
        .ok_or(ClassifyFailure::NoTableIndex {
            date: last.discharge_date,
        })?;

    let mut stay = first.clone();
    stay.associated_diagnoses = Vec::new();
    stay.procedures = Vec::new();
    stay.discharge_date = last.discharge_date;
    stay.exit = last.exit;
    let mut duration = 0;
    for record in stays {
        if record.gestational_age > 0 {
            stay.gestational_age = record.gestational_age;
        }
        if stay.last_menstrual_period.is_none() {
            stay.last_menstrual_period = record.last_menstrual_period;
        }
        stay.igs2 = stay.igs2.max(record.igs2);
        duration += record.duration();
    }
    stay.confirmed = last.confirmed;
    let age = first
        .birthdate
        .map_or(0, |birthdate| first.admission_date.years_since(birthdate));

    let mut diagnoses: Vec<DiagnosisCode> = stays.iter().flat_map(Stay::all_diagnoses).collect();
    diagnoses.sort_unstable();
    diagnoses.dedup();

    if stays.len() > 1
        && let Some(main) = find_main_stay(&index, stays, duration)
    {
        stay.main_diagnosis = main.main_diagnosis;
        stay.linked_diagnosis = main.linked_diagnosis;
    }
    let (childbirth, childbirth_type) = childbirth_markers(&index, stays);

    Ok(StayAggregate {
        stay,
        stays,
        index,
        age,
        duration,
        diagnoses,
        procedures: merge_procedures(stays),
        childbirth,
        childbirth_type,
    })
}

/// Run the consistency checks of a cluster, recording each failed one.
///
/// Returns false when the cluster must be classified as an invalid stay.
pub fn check_stays(stays: &[Stay], errors: &mut ErrorSet) -> bool {
    let mut valid = true;
    let Some(first) = stays.first() else {
        return valid;
    };

    for stay in stays {
        if stay.main_diagnosis.is_none() {
            errors.record(40);
            valid = false;
        }
        if stay.birthdate.is_none() {
            errors.record(if stay.birthdate_malformed { 14 } else { 13 });
            valid = false;
        }
        if stay.discharge_date < stay.admission_date {
            errors.record(32);
            valid = false;
        }
    }
    for stay in &stays[1..] {
        if stay.birthdate != first.birthdate {
            errors.record(45);
            valid = false;
        }
        if stay.sex != first.sex {
            errors.record(46);
            valid = false;
        }
    }

    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use mco_model::{Date, ProcedureCode, Sex};

    fn date(s: &str) -> Date {
        Date::parse(s).unwrap()
    }

    fn stay() -> Stay {
        Stay::new(1, Sex::Female, date("2017-03-01"), date("2017-03-02"))
            .with_birthdate(date("1970-05-12"))
            .with_main_diagnosis(DiagnosisCode::parse("K359").unwrap())
    }

    #[test]
    fn test_merge_procedures() {
        let code = |s| ProcedureCode::parse(s).unwrap();
        let day = date("2017-03-01");
        let mut first = stay();
        first.procedures = vec![
            ProcedureRealisation::new(code("HHFA016"), day).with_count(9000),
            ProcedureRealisation::new(code("ZCQK002"), day),
        ];
        let mut second = stay();
        second.procedures = vec![
            ProcedureRealisation::new(code("HHFA016"), day)
                .with_activities(1 << 4)
                .with_count(2000),
            ProcedureRealisation::new(code("HHFA016"), day).with_phase(1),
        ];

        let merged = merge_procedures(&[first, second]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].code, code("HHFA016"));
        assert_eq!(merged[0].activities, (1 << 1) | (1 << 4));
        assert_eq!(merged[0].count, 9999);
        assert_eq!(merged[1].phase, 1);
        assert_eq!(merged[2].code, code("ZCQK002"));
    }

    #[test]
    fn test_checks_record_each_error() {
        let mut errors = ErrorSet::new();
        assert!(check_stays(&[stay(), stay()], &mut errors));
        assert!(errors.is_empty());

        let mut second = stay();
        second.main_diagnosis = None;
        second.sex = Sex::Male;
        second.birthdate = None;
        second.birthdate_malformed = true;
        assert!(!check_stays(&[stay(), second], &mut errors));
        assert_eq!(errors.to_vec(), [14, 40, 45, 46]);
    }

    #[test]
    fn test_missing_birthdate() {
        let mut errors = ErrorSet::new();
        let mut record = stay();
        record.birthdate = None;
        assert!(!check_stays(&[record], &mut errors));
        assert_eq!(errors.to_vec(), [13]);
    }
}
