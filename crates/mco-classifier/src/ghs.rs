//! GHS selection and unit authorizations.

use std::io::Read;
use std::path::Path;

use mco_model::{Date, GhmCode, GhsCode};
use serde::Deserialize;
use tracing::debug;

use crate::aggregate::StayAggregate;
use crate::error::AuthorizationError;
use crate::error_set::ErrorSet;
use crate::lookup::{test_diagnosis, test_procedure};
use crate::severity::run_ghm_severity;
use crate::tree::run_ghm_tree;

/// Entry and exit mode of short-stay emergency unit (UHCD) stays.
const UHCD_MODE: u8 = 8;
/// Unit authorization type of UHCD units.
const UHCD_AUTHORIZATION: u8 = 7;
/// Unit numbers from this value carry their authorization type in the last
/// two digits.
const SELF_AUTHORIZED_UNIT: u16 = 10000;

/// Unit an authorization applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthorizedUnit {
    Unit(u16),
    /// Every unit of the facility.
    Facility,
}

/// Authorization type granted to a unit over `[begin, end)`.
///
/// Missing bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    pub unit: AuthorizedUnit,
    pub kind: u8,
    pub begin: Option<Date>,
    pub end: Option<Date>,
}

impl Authorization {
    pub fn covers(&self, date: Date) -> bool {
        self.begin.is_none_or(|begin| begin <= date) && self.end.is_none_or(|end| date < end)
    }
}

/// Integer or text JSON value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(i64),
    Text(String),
}

impl RawValue {
    fn as_number(&self) -> Option<i64> {
        match self {
            RawValue::Number(value) => Some(*value),
            RawValue::Text(text) => text.trim().parse().ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            RawValue::Number(value) => value.to_string(),
            RawValue::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAuthorization {
    authorization: RawValue,
    #[serde(default)]
    begin_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    unit: RawValue,
}

impl RawAuthorization {
    fn convert(self) -> Result<Authorization, AuthorizationError> {
        let kind = self
            .authorization
            .as_number()
            .and_then(|value| u8::try_from(value).ok())
            .filter(|&value| value < 100)
            .ok_or_else(|| AuthorizationError::InvalidType {
                value: self.authorization.describe(),
            })?;

        let unit = match &self.unit {
            RawValue::Text(text) if text.trim() == "facility" => AuthorizedUnit::Facility,
            raw => raw
                .as_number()
                .and_then(|value| u16::try_from(value).ok())
                .filter(|&value| value < SELF_AUTHORIZED_UNIT)
                .map(AuthorizedUnit::Unit)
                .ok_or_else(|| AuthorizationError::InvalidUnit {
                    value: raw.describe(),
                })?,
        };

        let parse_date = |value: Option<String>| value.as_deref().map(Date::parse).transpose();
        Ok(Authorization {
            unit,
            kind,
            begin: parse_date(self.begin_date)?,
            end: parse_date(self.end_date)?,
        })
    }
}

/// Unit authorizations of a facility, sorted by unit and start date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationSet {
    authorizations: Vec<Authorization>,
}

impl AuthorizationSet {
    pub fn new(mut authorizations: Vec<Authorization>) -> Self {
        authorizations.sort_by_key(|auth| (auth.unit, auth.begin));
        Self { authorizations }
    }

    /// Parse a JSON array of `{authorization, begin_date, end_date, unit}`
    /// objects; `unit` may be `"facility"`.
    pub fn from_json_str(json: &str) -> Result<Self, AuthorizationError> {
        let raw: Vec<RawAuthorization> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AuthorizationError> {
        let raw: Vec<RawAuthorization> = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, AuthorizationError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    fn from_raw(raw: Vec<RawAuthorization>) -> Result<Self, AuthorizationError> {
        let authorizations = raw
            .into_iter()
            .map(RawAuthorization::convert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(authorizations))
    }

    pub fn authorizations(&self) -> &[Authorization] {
        &self.authorizations
    }

    pub fn len(&self) -> usize {
        self.authorizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorizations.is_empty()
    }

    fn for_unit(&self, unit: AuthorizedUnit) -> impl Iterator<Item = &Authorization> {
        self.authorizations
            .iter()
            .skip_while(move |auth| auth.unit != unit)
            .take_while(move |auth| auth.unit == unit)
    }

    /// Authorization of `unit` valid on `date`.
    pub fn find_unit(&self, unit: u16, date: Date) -> Option<&Authorization> {
        self.for_unit(AuthorizedUnit::Unit(unit))
            .find(|auth| auth.covers(date))
    }

    /// Authorization type of `unit` on `date`, 0 when unknown.
    pub fn authorization_type(&self, unit: u16, date: Date) -> u8 {
        if unit >= SELF_AUTHORIZED_UNIT {
            (unit % 100) as u8
        } else if unit == 0 {
            0
        } else {
            match self.find_unit(unit, date) {
                Some(auth) => auth.kind,
                None => {
                    debug!(unit, "unit is missing from authorization set");
                    0
                }
            }
        }
    }

    /// True if `unit` or the whole facility holds authorization `kind`.
    pub fn is_authorized(&self, unit: u16, date: Date, kind: u8) -> bool {
        self.authorization_type(unit, date) == kind
            || self
                .for_unit(AuthorizedUnit::Facility)
                .any(|auth| auth.kind == kind)
    }
}

fn test_ghs(
    agg: &StayAggregate<'_>,
    authorizations: &AuthorizationSet,
    group: &mco_tables::GhsInfo,
) -> bool {
    if group.minimal_age > 0 && agg.age < i32::from(group.minimal_age) {
        return false;
    }

    let duration = if group.unit_authorization > 0 {
        let authorized: Vec<_> = agg
            .stays
            .iter()
            .filter(|stay| {
                authorizations.is_authorized(
                    stay.unit,
                    stay.discharge_date,
                    group.unit_authorization,
                )
            })
            .collect();
        if authorized.is_empty() {
            return false;
        }
        authorized
            .iter()
            .map(|stay| match stay.duration() {
                0 => 1,
                days => days,
            })
            .sum::<i32>()
    } else {
        agg.duration
    };

    if group.bed_authorization > 0
        && !agg
            .stays
            .iter()
            .any(|stay| stay.bed_authorization == group.bed_authorization)
    {
        return false;
    }
    if group.minimal_duration > 0 && duration < i32::from(group.minimal_duration) {
        return false;
    }

    let index = &agg.index;
    let sex = agg.stay.sex;
    if let Some(mask) = group.main_diagnosis_mask
        && !test_diagnosis(index, sex, agg.stay.main_diagnosis, mask)
    {
        return false;
    }
    if let Some(mask) = group.diagnosis_mask
        && !agg
            .diagnoses
            .iter()
            .any(|&code| test_diagnosis(index, sex, Some(code), mask))
    {
        return false;
    }
    group.procedure_masks.iter().all(|&mask| {
        agg.procedures
            .iter()
            .any(|proc| test_procedure(index, proc, mask))
    })
}

/// True for clusters spent entirely in UHCD units, which are priced as
/// ambulatory stays.
fn is_uhcd_only(agg: &StayAggregate<'_>, authorizations: &AuthorizationSet) -> bool {
    let (Some(first), Some(last)) = (agg.stays.first(), agg.stays.last()) else {
        return false;
    };
    agg.duration > 0
        && first.entry.mode == UHCD_MODE
        && last.exit.mode == UHCD_MODE
        && agg.stays.iter().all(|stay| {
            authorizations.authorization_type(stay.unit, stay.discharge_date) == UHCD_AUTHORIZATION
        })
}

/// Public-sector GHS of `ghm`, or [`GhsCode::NONE`].
///
/// Groups of the GHM are tried in table order; the first whose conditions
/// hold wins. UHCD-only clusters are classified again as 0-day stays first.
pub fn classify_ghs(
    agg: &StayAggregate<'_>,
    authorizations: &AuthorizationSet,
    ghm: GhmCode,
) -> GhsCode {
    if ghm.is_error() {
        return GhsCode::NONE;
    }

    let ghm = if is_uhcd_only(agg, authorizations) {
        let mut ambulatory = agg.clone();
        ambulatory.duration = 0;
        let mut scratch = ErrorSet::new();
        match run_ghm_tree(&ambulatory, &mut scratch)
            .and_then(|ghm| run_ghm_severity(&ambulatory, ghm))
        {
            Ok(ghm) => ghm,
            Err(_) => return GhsCode::NONE,
        }
    } else {
        ghm
    };

    agg.index
        .find_compatible_ghs(ghm)
        .iter()
        .find(|group| test_ghs(agg, authorizations, group))
        .map_or(GhsCode::NONE, |group| group.ghs[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        Date::parse(s).unwrap()
    }

    #[test]
    fn test_parse_authorizations() {
        let set = AuthorizationSet::from_json_str(
            r#"[
                {"authorization": 3, "unit": 12, "begin_date": "2016-01-01", "end_date": "2017-01-01"},
                {"authorization": "7", "unit": "12", "begin_date": "2017-01-01"},
                {"authorization": 5, "unit": "facility"}
            ]"#,
        )
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.authorization_type(12, date("2016-06-01")), 3);
        assert_eq!(set.authorization_type(12, date("2018-06-01")), 7);
        assert_eq!(set.authorization_type(12, date("2015-06-01")), 0);
        assert_eq!(set.authorization_type(13, date("2016-06-01")), 0);
        assert_eq!(set.authorization_type(10_042, date("2016-06-01")), 42);
        assert!(set.is_authorized(13, date("2016-06-01"), 5));
        assert!(!set.is_authorized(13, date("2016-06-01"), 3));
    }

    #[test]
    fn test_reject_invalid_entries() {
        let err = AuthorizationSet::from_json_str(r#"[{"authorization": 120, "unit": 1}]"#)
            .unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidType { .. }));

        let err = AuthorizationSet::from_json_str(r#"[{"authorization": 1, "unit": "ward"}]"#)
            .unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidUnit { .. }));

        let err = AuthorizationSet::from_json_str(
            r#"[{"authorization": 1, "unit": 1, "begin_date": "2017-02-30"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidDate(_)));

        let err = AuthorizationSet::from_json_str(r#"[{"authorization": 1, "unit": 1, "bed": 2}]"#)
            .unwrap_err();
        assert!(matches!(err, AuthorizationError::Json(_)));
    }
}
