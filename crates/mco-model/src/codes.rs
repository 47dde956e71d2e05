//! Compact code values: diagnoses, procedures, GHM roots, GHMs and GHS.
//!
//! Every code is a small `Copy` value that can be hashed and ordered. Text
//! codes are stored as zero-padded ASCII bytes, so a code never needs an
//! allocation to be compared or used as a map key. An absent code is modelled
//! with `Option`, never with a sentinel value.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{ModelError, Result};

fn padded_str(bytes: &[u8]) -> &str {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..len]).unwrap_or_default()
}

fn copy_ascii<const N: usize>(text: &[u8]) -> Option<[u8; N]> {
    if text.is_empty()
        || text.len() > N
        || !text.iter().all(|&b| b.is_ascii_graphic() || b == b' ')
    {
        return None;
    }
    let mut bytes = [0u8; N];
    bytes[..text.len()].copy_from_slice(text);
    Some(bytes)
}

/// ICD-10 diagnosis code, at most 6 characters (`A00`, `S0230`, `Z515`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosisCode([u8; 6]);

impl DiagnosisCode {
    /// Parse and validate a diagnosis code.
    ///
    /// The first character must be a letter followed by two digits; the
    /// remaining characters are digits, or `+` in positions 4 and 5. Dots
    /// are ignored, letters are upper-cased and trailing `+` are dropped.
    pub fn parse(value: &str) -> Result<Self> {
        let mut text: Vec<u8> = value
            .trim()
            .bytes()
            .filter(|&b| b != b'.')
            .map(|b| b.to_ascii_uppercase())
            .collect();

        let valid = (3..=6).contains(&text.len())
            && text[0].is_ascii_uppercase()
            && text[1].is_ascii_digit()
            && text[2].is_ascii_digit()
            && text[3..]
                .iter()
                .enumerate()
                .all(|(i, &b)| b.is_ascii_digit() || (i < 2 && b == b'+'));
        if !valid {
            return Err(ModelError::invalid_diagnosis(value));
        }
        while text.len() > 3 && text.last() == Some(&b'+') {
            text.pop();
        }

        copy_ascii(&text)
            .map(Self)
            .ok_or_else(|| ModelError::invalid_diagnosis(value))
    }

    /// Build a code from raw ASCII without syntax checks.
    ///
    /// Used for codes reconstructed from table files, which are well formed by
    /// construction but may carry characters `parse` would normalize.
    #[must_use]
    pub fn from_ascii(text: &[u8]) -> Option<Self> {
        copy_ascii(text).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        padded_str(&self.0)
    }

    /// True if the code text starts with `prefix` (`Z515` matches `Z5150`).
    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix)
    }

    /// First character of the code (the ICD-10 chapter letter).
    #[must_use]
    pub fn chapter(&self) -> char {
        char::from(self.0[0])
    }
}

/// CCAM procedure code: 4 letters and 3 digits (`ZCQK002`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureCode([u8; 7]);

impl ProcedureCode {
    /// Parse and validate a procedure code.
    pub fn parse(value: &str) -> Result<Self> {
        let text: Vec<u8> = value
            .trim()
            .bytes()
            .map(|b| b.to_ascii_uppercase())
            .collect();
        let valid = text.len() == 7
            && text[..4].iter().all(u8::is_ascii_uppercase)
            && text[4..].iter().all(u8::is_ascii_digit);
        if !valid {
            return Err(ModelError::invalid_procedure(value));
        }
        copy_ascii(&text)
            .map(Self)
            .ok_or_else(|| ModelError::invalid_procedure(value))
    }

    /// Build a code from raw ASCII without syntax checks.
    #[must_use]
    pub fn from_ascii(text: &[u8]) -> Option<Self> {
        copy_ascii(text).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        padded_str(&self.0)
    }
}

/// GHM root: major category, type letter and sequence (`04C02`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GhmRootCode {
    pub cmd: u8,
    pub kind: u8,
    pub seq: u8,
}

impl GhmRootCode {
    #[must_use]
    pub const fn new(cmd: u8, kind: u8, seq: u8) -> Self {
        Self { cmd, kind, seq }
    }

    /// Parse the 5-character form `CCTSS`.
    pub fn parse(value: &str) -> Result<Self> {
        parse_root(value.trim().as_bytes()).ok_or_else(|| ModelError::invalid_ghm(value))
    }
}

fn parse_two_digits(bytes: &[u8]) -> Option<u8> {
    match bytes {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Some((a - b'0') * 10 + (b - b'0')),
        _ => None,
    }
}

fn parse_root(bytes: &[u8]) -> Option<GhmRootCode> {
    if bytes.len() != 5 || !bytes[2].is_ascii_alphabetic() {
        return None;
    }
    Some(GhmRootCode {
        cmd: parse_two_digits(&bytes[..2])?,
        kind: bytes[2].to_ascii_uppercase(),
        seq: parse_two_digits(&bytes[3..5])?,
    })
}

/// Full GHM code: a root and an optional mode character (`04C021`, `90Z03Z`).
///
/// A mode of `0` means the tree left the severity to be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GhmCode {
    pub root: GhmRootCode,
    pub mode: u8,
}

impl GhmCode {
    /// Error GHM for stays that fail consistency checks.
    pub const INVALID_STAY: GhmCode = GhmCode::new(90, b'Z', 0, b'Z');
    /// Error GHM for stays the grouper could not classify.
    pub const CLASSIFICATION_FAILED: GhmCode = GhmCode::new(90, b'Z', 3, b'Z');

    #[must_use]
    pub const fn new(cmd: u8, kind: u8, seq: u8, mode: u8) -> Self {
        Self {
            root: GhmRootCode::new(cmd, kind, seq),
            mode,
        }
    }

    /// Parse `CCTSS` or `CCTSSM`.
    pub fn parse(value: &str) -> Result<Self> {
        let bytes = value.trim().as_bytes();
        let (root, mode) = match bytes.len() {
            5 => (parse_root(bytes), 0),
            6 if bytes[5].is_ascii_alphanumeric() => {
                (parse_root(&bytes[..5]), bytes[5].to_ascii_uppercase())
            }
            _ => (None, 0),
        };
        root.map(|root| Self { root, mode })
            .ok_or_else(|| ModelError::invalid_ghm(value))
    }

    #[must_use]
    pub fn with_mode(self, mode: u8) -> Self {
        Self { mode, ..self }
    }

    /// Error GHMs all live in the 90 category.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.root.cmd == 90
    }
}

/// GHS billing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GhsCode(pub u16);

impl GhsCode {
    /// Returned when no GHS applies to a GHM.
    pub const NONE: GhsCode = GhsCode(9999);
}

/// Patient sex as coded in stays and used to pick attribute blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sex {
    Male = 1,
    Female = 2,
}

impl Sex {
    /// Accepts `1`/`2` and the letters `H`/`M` (male) and `F` (female).
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "1" | "H" | "h" | "M" | "m" => Ok(Self::Male),
            "2" | "F" | "f" => Ok(Self::Female),
            other => Err(ModelError::InvalidSex {
                value: other.to_string(),
            }),
        }
    }

    /// Numeric code (1 or 2).
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Zero-based index for per-sex arrays.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.code() - 1)
    }
}

impl fmt::Display for DiagnosisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProcedureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for GhmRootCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{}{:02}", self.cmd, char::from(self.kind), self.seq)
    }
}

impl fmt::Display for GhmCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        if self.mode != 0 {
            write!(f, "{}", char::from(self.mode))?;
        }
        Ok(())
    }
}

impl fmt::Display for GhsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DiagnosisCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for ProcedureCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for GhmCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

macro_rules! serialize_as_text {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(
                    &self,
                    serializer: S,
                ) -> std::result::Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }
        )*
    };
}

serialize_as_text!(DiagnosisCode, ProcedureCode, GhmRootCode, GhmCode);

impl Serialize for GhsCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

impl Serialize for Sex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnosis_parse() {
        let code = DiagnosisCode::parse("s02.30").expect("valid code");
        assert_eq!(code.as_str(), "S0230");
        assert_eq!(code.chapter(), 'S');

        let code = DiagnosisCode::parse("A00+").expect("plus suffix");
        assert_eq!(code.as_str(), "A00");

        let code = DiagnosisCode::parse("Z5150").expect("valid code");
        assert!(code.starts_with("Z515"));
        assert!(!code.starts_with("Z502"));
    }

    #[test]
    fn test_diagnosis_rejects_malformed() {
        for bad in ["", "A0", "0A00", "AA00", "A00X", "A0012345", "A0000+"] {
            assert!(DiagnosisCode::parse(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_procedure_parse() {
        let code = ProcedureCode::parse("zcqk002").expect("valid code");
        assert_eq!(code.to_string(), "ZCQK002");
        assert!(ProcedureCode::parse("ZCQK02").is_err());
        assert!(ProcedureCode::parse("ZCQ1002").is_err());
    }

    #[test]
    fn test_ghm_parse_and_display() {
        let ghm = GhmCode::parse("04C021").expect("valid GHM");
        assert_eq!(ghm.root, GhmRootCode::new(4, b'C', 2));
        assert_eq!(ghm.mode, b'1');
        assert_eq!(ghm.to_string(), "04C021");

        let root_only = GhmCode::parse("04M05").expect("root only");
        assert_eq!(root_only.mode, 0);
        assert_eq!(root_only.to_string(), "04M05");

        assert_eq!(GhmCode::CLASSIFICATION_FAILED.to_string(), "90Z03Z");
        assert_eq!(GhmCode::INVALID_STAY.to_string(), "90Z00Z");
        assert!(GhmCode::INVALID_STAY.is_error());
        assert!(GhmCode::parse("4C021").is_err());
    }

    #[test]
    fn test_codes_order_and_hash_as_values() {
        let a = DiagnosisCode::parse("A00").expect("valid");
        let b = DiagnosisCode::parse("A000").expect("valid");
        let c = DiagnosisCode::parse("B00").expect("valid");
        assert!(a < b && b < c);

        let set: std::collections::HashSet<_> = [a, a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_sex_parse() {
        assert_eq!(Sex::parse("1"), Ok(Sex::Male));
        assert_eq!(Sex::parse("H"), Ok(Sex::Male));
        assert_eq!(Sex::parse("f"), Ok(Sex::Female));
        assert!(Sex::parse("3").is_err());
        assert_eq!(Sex::Female.index(), 1);
    }

    #[test]
    fn test_codes_serialize_as_text() {
        let ghm = GhmCode::parse("90Z03Z").expect("valid");
        assert_eq!(serde_json::to_string(&ghm).expect("json"), "\"90Z03Z\"");
        assert_eq!(serde_json::to_string(&GhsCode(1234)).expect("json"), "1234");
    }
}
