//! Stay records as produced by ingestion and consumed by the classifier.

use serde::Serialize;

use crate::codes::{DiagnosisCode, ProcedureCode, Sex};
use crate::date::Date;

/// Exit mode for an internal transfer between units of the same facility.
pub const EXIT_MODE_TRANSFER: u8 = 6;
/// Exit mode for a patient who died during the stay.
pub const EXIT_MODE_DEATH: u8 = 9;

/// How the patient came in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StayEntry {
    pub mode: u8,
    pub origin: u8,
}

/// How the patient left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StayExit {
    pub mode: u8,
    pub destination: u8,
}

/// One procedure performed during a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcedureRealisation {
    pub code: ProcedureCode,
    pub phase: u8,
    /// Bit `n` is set when activity `n` was performed.
    pub activities: u8,
    pub count: u16,
    pub date: Date,
}

impl ProcedureRealisation {
    /// A single realisation of activity 1, phase 0.
    #[must_use]
    pub fn new(code: ProcedureCode, date: Date) -> Self {
        Self {
            code,
            phase: 0,
            activities: 1 << 1,
            count: 1,
            date,
        }
    }

    #[must_use]
    pub fn with_phase(mut self, phase: u8) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn with_activities(mut self, activities: u8) -> Self {
        self.activities = activities;
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u16) -> Self {
        self.count = count;
        self
    }
}

/// One hospital stay record (a RUM).
///
/// Several records sharing a `stay_id` may describe one episode split across
/// units; see the classifier's clustering for how they are grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stay {
    pub stay_id: u32,
    pub bill_id: u32,
    pub sex: Sex,
    pub birthdate: Option<Date>,
    /// Set by ingestion when a birthdate was present but unparseable.
    pub birthdate_malformed: bool,
    pub admission_date: Date,
    pub discharge_date: Date,
    pub entry: StayEntry,
    pub exit: StayExit,
    pub unit: u16,
    pub bed_authorization: u8,
    pub session_count: u16,
    pub igs2: u16,
    pub gestational_age: u8,
    pub newborn_weight: u16,
    pub last_menstrual_period: Option<Date>,
    /// The coder confirmed a stay the grouper would otherwise question.
    pub confirmed: bool,
    pub main_diagnosis: Option<DiagnosisCode>,
    pub linked_diagnosis: Option<DiagnosisCode>,
    pub associated_diagnoses: Vec<DiagnosisCode>,
    pub procedures: Vec<ProcedureRealisation>,
}

impl Stay {
    /// Create a stay with only identity, sex and dates filled in.
    #[must_use]
    pub fn new(stay_id: u32, sex: Sex, admission_date: Date, discharge_date: Date) -> Self {
        Self {
            stay_id,
            bill_id: stay_id,
            sex,
            birthdate: None,
            birthdate_malformed: false,
            admission_date,
            discharge_date,
            entry: StayEntry::default(),
            exit: StayExit::default(),
            unit: 0,
            bed_authorization: 0,
            session_count: 0,
            igs2: 0,
            gestational_age: 0,
            newborn_weight: 0,
            last_menstrual_period: None,
            confirmed: false,
            main_diagnosis: None,
            linked_diagnosis: None,
            associated_diagnoses: Vec::new(),
            procedures: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_birthdate(mut self, birthdate: Date) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    #[must_use]
    pub fn with_main_diagnosis(mut self, code: DiagnosisCode) -> Self {
        self.main_diagnosis = Some(code);
        self
    }

    #[must_use]
    pub fn with_linked_diagnosis(mut self, code: DiagnosisCode) -> Self {
        self.linked_diagnosis = Some(code);
        self
    }

    #[must_use]
    pub fn with_associated_diagnosis(mut self, code: DiagnosisCode) -> Self {
        self.associated_diagnoses.push(code);
        self
    }

    #[must_use]
    pub fn with_procedure(mut self, procedure: ProcedureRealisation) -> Self {
        self.procedures.push(procedure);
        self
    }

    #[must_use]
    pub fn with_exit(mut self, mode: u8, destination: u8) -> Self {
        self.exit = StayExit { mode, destination };
        self
    }

    #[must_use]
    pub fn with_entry(mut self, mode: u8, origin: u8) -> Self {
        self.entry = StayEntry { mode, origin };
        self
    }

    /// Length of this record in days (nights).
    #[must_use]
    pub fn duration(&self) -> i32 {
        self.discharge_date - self.admission_date
    }

    /// Main, linked and associated diagnoses, in that order.
    pub fn all_diagnoses(&self) -> impl Iterator<Item = DiagnosisCode> + '_ {
        self.main_diagnosis
            .into_iter()
            .chain(self.linked_diagnosis)
            .chain(self.associated_diagnoses.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        Date::parse(s).expect("valid date")
    }

    fn diag(s: &str) -> DiagnosisCode {
        DiagnosisCode::parse(s).expect("valid code")
    }

    #[test]
    fn test_duration_and_diagnoses() {
        let stay = Stay::new(1, Sex::Female, date("2017-03-01"), date("2017-03-04"))
            .with_main_diagnosis(diag("K359"))
            .with_linked_diagnosis(diag("E119"))
            .with_associated_diagnosis(diag("I10"));

        assert_eq!(stay.duration(), 3);
        let all: Vec<_> = stay.all_diagnoses().map(|d| d.to_string()).collect();
        assert_eq!(all, ["K359", "E119", "I10"]);
    }

    #[test]
    fn test_procedure_defaults() {
        let code = ProcedureCode::parse("HHFA016").expect("valid code");
        let proc = ProcedureRealisation::new(code, date("2017-03-02"));
        assert_eq!(proc.activities, 0b10);
        assert_eq!(proc.count, 1);
        assert_eq!(proc.with_phase(2).phase, 2);
    }
}
