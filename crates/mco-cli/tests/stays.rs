//! JSON stay ingestion and expectation checks.

use mco_classifier::ClassifyResult;
use mco_cli::stays::{Mismatch, StaySet, check_expectations};
use mco_model::{Date, DiagnosisCode, GhmCode, GhsCode, ProcedureCode, Sex};

fn date(s: &str) -> Date {
    Date::parse(s).unwrap()
}

const STAYS: &str = r#"[
    {
        "stay_id": 7, "bill_id": "70", "sex": "F", "birthdate": "1971-05-12",
        "entry_date": "2016-06-01", "entry_mode": "8", "entry_origin": "R",
        "exit_date": "2016-06-02", "exit_mode": 6, "exit_destination": "",
        "dp": "Z51.5", "das": ["I10", ""],
        "unit": 12, "igs2": "31",
        "test": {"cluster_len": 2, "ghm": "04M053", "error": 0}
    },
    {
        "stay_id": 7, "sex": 2, "birthdate": "1971-05-12",
        "entry_date": "2016-06-02", "entry_mode": 6, "exit_date": "2016-06-08", "exit_mode": 8,
        "dp": "J189", "dr": "E119", "last_menstrual_period": "2016-05-02", "confirm": true,
        "procedures": [
            {"code": "EBLA003", "date": "2016-06-03", "activity": 14, "count": 2},
            {"code": "HHFA016", "date": "2016-06-04", "phase": "1"}
        ]
    },
    {
        "stay_id": 8, "sex": "1", "birthdate": "1971-02-30",
        "entry_date": "2016-06-10", "exit_date": "2016-06-10",
        "test": {"ghm": "90Z00Z", "error": 14, "ghs": 9999}
    }
]"#;

#[test]
fn test_parse_stays() {
    let set = StaySet::from_json_str(STAYS).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.tests.len(), 3);

    let first = &set.stays[0];
    assert_eq!(first.stay_id, 7);
    assert_eq!(first.bill_id, 70);
    assert_eq!(first.sex, Sex::Female);
    assert_eq!(first.birthdate, Some(date("1971-05-12")));
    assert_eq!(first.entry.mode, 8);
    assert_eq!(first.entry.origin, b'R' - b'0');
    assert_eq!(first.exit.mode, 6);
    assert_eq!(first.exit.destination, 0);
    assert_eq!(first.main_diagnosis, Some(DiagnosisCode::parse("Z515").unwrap()));
    assert_eq!(first.associated_diagnoses, [DiagnosisCode::parse("I10").unwrap()]);
    assert_eq!(first.unit, 12);
    assert_eq!(first.igs2, 31);
    assert_eq!(set.tests[0].as_ref().unwrap().cluster_len, Some(2));

    let second = &set.stays[1];
    assert_eq!(second.bill_id, 7);
    assert_eq!(second.linked_diagnosis, Some(DiagnosisCode::parse("E119").unwrap()));
    assert_eq!(second.last_menstrual_period, Some(date("2016-05-02")));
    assert!(second.confirmed);
    assert!(!first.confirmed);
    assert_eq!(second.procedures.len(), 2);
    let act = &second.procedures[0];
    assert_eq!(act.code, ProcedureCode::parse("EBLA003").unwrap());
    assert_eq!(act.activities, (1 << 1) | (1 << 4));
    assert_eq!(act.count, 2);
    let phased = &second.procedures[1];
    assert_eq!(phased.phase, 1);
    assert_eq!(phased.activities, 0);
    assert_eq!(phased.count, 1);
    assert!(set.tests[1].is_none());

    let third = &set.stays[2];
    assert_eq!(third.sex, Sex::Male);
    assert_eq!(third.birthdate, None);
    assert!(third.birthdate_malformed);
}

#[test]
fn test_reject_invalid_values() {
    let cases = [
        r#"[{"sex": 3, "entry_date": "2016-06-01", "exit_date": "2016-06-02"}]"#,
        r#"[{"sex": 1, "entry_date": "2016-13-01", "exit_date": "2016-06-02"}]"#,
        r#"[{"sex": 1, "entry_date": "2016-06-01", "exit_date": "2016-06-02", "exit_mode": "12"}]"#,
        r#"[{"sex": 1, "entry_date": "2016-06-01", "exit_date": "2016-06-02", "dp": "1234"}]"#,
        r#"[{"sex": 1, "entry_date": "2016-06-01", "exit_date": "2016-06-02",
             "procedures": [{"code": "EBLA003", "date": "2016-06-01", "activity": 9}]}]"#,
        r#"[{"sex": 1, "entry_date": "2016-06-01"}]"#,
        r#"{"sex": 1}"#,
    ];
    for json in cases {
        assert!(StaySet::from_json_str(json).is_err(), "{json}");
    }
}

#[test]
fn test_append_keeps_order() {
    let mut set = StaySet::from_json_str(STAYS).unwrap();
    let more = StaySet::from_json_str(
        r#"[{"stay_id": 9, "sex": 1, "entry_date": "2016-07-01", "exit_date": "2016-07-02"}]"#,
    )
    .unwrap();
    set.append(more);
    assert_eq!(set.len(), 4);
    assert_eq!(set.tests.len(), 4);
    assert_eq!(set.stays[3].stay_id, 9);
}

fn result(stay_id: u32, cluster_len: usize, ghm: &str, ghs: u16, errors: &[u16]) -> ClassifyResult {
    ClassifyResult {
        stay_id,
        cluster_len,
        ghm: GhmCode::parse(ghm).unwrap(),
        ghs: GhsCode(ghs),
        main_error: errors.iter().min().copied(),
        errors: errors.to_vec(),
        duration: 0,
        age: 45,
        index_start: None,
        index_end: None,
    }
}

#[test]
fn test_check_expectations() {
    let set = StaySet::from_json_str(STAYS).unwrap();

    let matching = [
        result(7, 2, "04M053", 1103, &[]),
        result(8, 1, "90Z00Z", 9999, &[14]),
    ];
    assert!(check_expectations(&set, &matching).is_empty());

    let failing = [
        result(7, 2, "04M052", 1102, &[]),
        result(8, 1, "90Z00Z", 9999, &[13]),
    ];
    assert_eq!(
        check_expectations(&set, &failing),
        [
            Mismatch {
                stay_id: 7,
                field: "ghm",
                expected: "04M053".to_string(),
                actual: "04M052".to_string(),
            },
            Mismatch {
                stay_id: 8,
                field: "error",
                expected: "14".to_string(),
                actual: "13".to_string(),
            },
        ]
    );
}

#[test]
fn test_unclustered_results_use_each_record_expectation() {
    let set = StaySet::from_json_str(STAYS).unwrap();
    let results = [
        result(7, 1, "23Z02Z", 2302, &[]),
        result(7, 1, "04M053", 1103, &[]),
        result(8, 1, "90Z00Z", 9999, &[14]),
    ];

    let mismatches = check_expectations(&set, &results);
    let fields: Vec<_> = mismatches.iter().map(|mismatch| mismatch.field).collect();
    assert_eq!(fields, ["cluster_len", "ghm"]);
}
