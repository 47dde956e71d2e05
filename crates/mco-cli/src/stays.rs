//! JSON stay files.
//!
//! A stay file is a JSON array of objects. Most values may be given as
//! numbers or strings; dates use `YYYY-MM-DD`. Each stay may embed a `test`
//! object with the expected classification, checked by `mco classify --test`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use mco_classifier::ClassifyResult;
use mco_model::{
    Date, DiagnosisCode, GhmCode, ProcedureCode, ProcedureRealisation, Sex, Stay, StayEntry,
    StayExit,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::logging::redact_value;

/// Integer or text JSON value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Value {
    Number(i64),
    Text(String),
}

impl Value {
    fn text(&self) -> String {
        match self {
            Value::Number(value) => value.to_string(),
            Value::Text(text) => text.trim().to_string(),
        }
    }

    fn number<T: TryFrom<i64>>(&self, field: &str) -> Result<T> {
        let number = match self {
            Value::Number(value) => Some(*value),
            Value::Text(text) => text.trim().parse().ok(),
        };
        number
            .and_then(|value| T::try_from(value).ok())
            .ok_or_else(|| anyhow!("invalid {field} value '{}'", self.text()))
    }

    /// Single digit; empty text gives 0 and `R`/`r` is accepted when
    /// `allow_r` is set.
    fn digit(&self, field: &str, allow_r: bool) -> Result<u8> {
        let invalid = || anyhow!("invalid {field} value '{}'", self.text());
        match self {
            Value::Number(value) => u8::try_from(*value)
                .ok()
                .filter(|&digit| digit <= 9)
                .ok_or_else(invalid),
            Value::Text(text) => match text.trim().as_bytes() {
                [] => Ok(0),
                [digit @ b'0'..=b'9'] => Ok(digit - b'0'),
                // Kept as its offset from '0', which never matches a digit mode.
                [b'R' | b'r'] if allow_r => Ok(b'R' - b'0'),
                _ => Err(invalid()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawProcedure {
    code: String,
    date: String,
    #[serde(default)]
    phase: Option<Value>,
    #[serde(default)]
    activity: Option<Value>,
    #[serde(default)]
    count: Option<Value>,
}

impl RawProcedure {
    fn convert(&self) -> Result<ProcedureRealisation> {
        let code = ProcedureCode::parse(&self.code)?;
        let date = Date::parse(&self.date)?;
        let mut proc = ProcedureRealisation::new(code, date).with_activities(0);
        if let Some(phase) = &self.phase {
            proc = proc.with_phase(phase.number("procedure phase")?);
        }
        if let Some(activity) = &self.activity {
            proc = proc.with_activities(activity_mask(activity.number("procedure activity")?)?);
        }
        if let Some(count) = &self.count {
            proc = proc.with_count(count.number("procedure count")?);
        }
        Ok(proc)
    }
}

/// Turn decimal activity digits (`14` for activities 1 and 4) into a bitmask.
pub fn activity_mask(digits: u32) -> Result<u8> {
    let mut mask = 0u8;
    let mut rest = digits;
    while rest > 0 {
        let activity = rest % 10;
        if activity > 7 {
            bail!("procedure activity {digits} outside of 0-7");
        }
        mask |= 1 << activity;
        rest /= 10;
    }
    Ok(mask)
}

/// Expected classification embedded in a stay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StayTest {
    #[serde(default)]
    pub cluster_len: Option<usize>,
    #[serde(default)]
    pub ghm: Option<String>,
    #[serde(default)]
    pub error: Option<u16>,
    #[serde(default)]
    pub ghs: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct RawStay {
    #[serde(default)]
    stay_id: Option<Value>,
    #[serde(default)]
    bill_id: Option<Value>,
    sex: Value,
    #[serde(default)]
    birthdate: Option<String>,
    entry_date: String,
    exit_date: String,
    #[serde(default)]
    entry_mode: Option<Value>,
    #[serde(default)]
    entry_origin: Option<Value>,
    #[serde(default)]
    exit_mode: Option<Value>,
    #[serde(default)]
    exit_destination: Option<Value>,
    #[serde(default)]
    dp: Option<String>,
    #[serde(default)]
    dr: Option<String>,
    #[serde(default)]
    das: Vec<String>,
    #[serde(default)]
    procedures: Vec<RawProcedure>,
    #[serde(default)]
    session_count: Option<Value>,
    #[serde(default)]
    igs2: Option<Value>,
    #[serde(default)]
    gestational_age: Option<Value>,
    #[serde(default)]
    newborn_weight: Option<Value>,
    #[serde(default)]
    last_menstrual_period: Option<String>,
    #[serde(default)]
    confirm: bool,
    #[serde(default)]
    unit: Option<Value>,
    #[serde(default)]
    bed_authorization: Option<Value>,
    #[serde(default)]
    test: Option<StayTest>,
}

fn optional_number<T: TryFrom<i64> + Default>(value: Option<&Value>, field: &str) -> Result<T> {
    value.map_or_else(|| Ok(T::default()), |value| value.number(field))
}

fn optional_digit(value: Option<&Value>, field: &str, allow_r: bool) -> Result<u8> {
    value.map_or(Ok(0), |value| value.digit(field, allow_r))
}

fn optional_diagnosis(value: Option<&String>) -> Result<Option<DiagnosisCode>> {
    value
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(DiagnosisCode::parse)
        .transpose()
        .map_err(Into::into)
}

impl RawStay {
    fn convert(self) -> Result<(Stay, Option<StayTest>)> {
        let stay_id: u32 = optional_number(self.stay_id.as_ref(), "stay_id")?;
        let sex = Sex::parse(&self.sex.text())?;
        let admission = Date::parse(&self.entry_date).context("entry_date")?;
        let discharge = Date::parse(&self.exit_date).context("exit_date")?;

        let mut stay = Stay::new(stay_id, sex, admission, discharge);
        if let Some(bill_id) = &self.bill_id {
            stay.bill_id = bill_id.number("bill_id")?;
        }
        if let Some(raw) = self.birthdate.as_deref().filter(|raw| !raw.trim().is_empty()) {
            match Date::parse(raw) {
                Ok(birthdate) => stay.birthdate = Some(birthdate),
                Err(_) => {
                    warn!(stay_id, birthdate = redact_value(raw), "malformed birthdate");
                    stay.birthdate_malformed = true;
                }
            }
        }
        stay.entry = StayEntry {
            mode: optional_digit(self.entry_mode.as_ref(), "entry_mode", false)?,
            origin: optional_digit(self.entry_origin.as_ref(), "entry_origin", true)?,
        };
        stay.exit = StayExit {
            mode: optional_digit(self.exit_mode.as_ref(), "exit_mode", false)?,
            destination: optional_digit(self.exit_destination.as_ref(), "exit_destination", false)?,
        };

        stay.main_diagnosis = optional_diagnosis(self.dp.as_ref())?;
        stay.linked_diagnosis = optional_diagnosis(self.dr.as_ref())?;
        for code in &self.das {
            if let Some(code) = optional_diagnosis(Some(code))? {
                stay.associated_diagnoses.push(code);
            }
        }
        for proc in &self.procedures {
            let proc = proc
                .convert()
                .with_context(|| format!("procedure {}", proc.code))?;
            stay.procedures.push(proc);
        }

        stay.session_count = optional_number(self.session_count.as_ref(), "session_count")?;
        stay.igs2 = optional_number(self.igs2.as_ref(), "igs2")?;
        stay.gestational_age = optional_number(self.gestational_age.as_ref(), "gestational_age")?;
        stay.newborn_weight = optional_number(self.newborn_weight.as_ref(), "newborn_weight")?;
        stay.last_menstrual_period = self
            .last_menstrual_period
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(Date::parse)
            .transpose()
            .context("last_menstrual_period")?;
        stay.confirmed = self.confirm;
        stay.unit = optional_number(self.unit.as_ref(), "unit")?;
        stay.bed_authorization =
            optional_number(self.bed_authorization.as_ref(), "bed_authorization")?;

        Ok((stay, self.test))
    }
}

/// Stays loaded from one or more files, in file order.
#[derive(Debug, Clone, Default)]
pub struct StaySet {
    pub stays: Vec<Stay>,
    /// Expectations, parallel to `stays`.
    pub tests: Vec<Option<StayTest>>,
}

impl StaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stays.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Vec<RawStay> = serde_json::from_str(json).context("parse stay JSON")?;
        Self::from_raw(raw)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: Vec<RawStay> = serde_json::from_reader(reader).context("parse stay JSON")?;
        Self::from_raw(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let set = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("load stays from {}", path.display()))?;
        debug!(path = %path.display(), stays = set.len(), "loaded stay file");
        Ok(set)
    }

    fn from_raw(raw: Vec<RawStay>) -> Result<Self> {
        let mut set = Self::new();
        for (position, raw) in raw.into_iter().enumerate() {
            let (stay, test) = raw
                .convert()
                .with_context(|| format!("stay #{}", position + 1))?;
            set.stays.push(stay);
            set.tests.push(test);
        }
        Ok(set)
    }

    /// Append the stays of `other`.
    pub fn append(&mut self, mut other: StaySet) {
        self.stays.append(&mut other.stays);
        self.tests.append(&mut other.tests);
    }
}

/// One expected value that the classification did not reproduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub stay_id: u32,
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Compare `results` with the expectations of the first record of each
/// cluster. Clusters without expectations are skipped.
pub fn check_expectations(stays: &StaySet, results: &[ClassifyResult]) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    let mut position = 0;

    for result in results {
        let test = stays.tests.get(position).and_then(Option::as_ref);
        position += result.cluster_len;
        let Some(test) = test else {
            continue;
        };

        let mut check = |field, expected: String, actual: String| {
            if expected != actual {
                mismatches.push(Mismatch {
                    stay_id: result.stay_id,
                    field,
                    expected,
                    actual,
                });
            }
        };
        if let Some(cluster_len) = test.cluster_len {
            check(
                "cluster_len",
                cluster_len.to_string(),
                result.cluster_len.to_string(),
            );
        }
        if let Some(ghm) = &test.ghm {
            let expected = GhmCode::parse(ghm).map_or_else(|_| ghm.clone(), |ghm| ghm.to_string());
            check("ghm", expected, result.ghm.to_string());
        }
        if let Some(error) = test.error {
            check(
                "error",
                error.to_string(),
                result.main_error.unwrap_or(0).to_string(),
            );
        }
        if let Some(ghs) = test.ghs {
            check("ghs", ghs.to_string(), result.ghs.to_string());
        }
    }

    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_mask() {
        assert_eq!(activity_mask(0).unwrap(), 0);
        assert_eq!(activity_mask(1).unwrap(), 0b10);
        assert_eq!(activity_mask(14).unwrap(), 0b1_0010);
        assert!(activity_mask(18).is_err());
    }

    #[test]
    fn test_digit_values() {
        let text = |s: &str| Value::Text(s.to_string());
        assert_eq!(text("6").digit("exit_mode", false).unwrap(), 6);
        assert_eq!(text("").digit("exit_mode", false).unwrap(), 0);
        assert_eq!(Value::Number(8).digit("exit_mode", false).unwrap(), 8);
        assert!(Value::Number(12).digit("exit_mode", false).is_err());
        assert!(text("R").digit("exit_mode", false).is_err());
        assert_eq!(text("R").digit("entry_origin", true).unwrap(), b'R' - b'0');
    }
}
