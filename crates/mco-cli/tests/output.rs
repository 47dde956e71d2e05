//! Rendering of classification results and duration constraints.

use mco_classifier::{ClassifyResult, ConstraintSet, GhmConstraint};
use mco_cli::summary::{constraints_table, results_csv, results_json, results_table};
use mco_model::{Date, GhmCode, GhsCode};

fn results() -> Vec<ClassifyResult> {
    let start = Date::parse("2016-03-01").ok();
    let end = Date::parse("2017-03-01").ok();
    vec![
        ClassifyResult {
            stay_id: 7,
            cluster_len: 2,
            ghm: GhmCode::parse("04M053").unwrap(),
            ghs: GhsCode(1103),
            main_error: None,
            errors: Vec::new(),
            duration: 7,
            age: 45,
            index_start: start,
            index_end: end,
        },
        ClassifyResult {
            stay_id: 8,
            cluster_len: 1,
            ghm: GhmCode::parse("90Z00Z").unwrap(),
            ghs: GhsCode::NONE,
            main_error: Some(40),
            errors: vec![40, 45],
            duration: 0,
            age: 0,
            index_start: None,
            index_end: None,
        },
    ]
}

#[test]
fn test_results_csv() {
    let csv = results_csv(&results()).unwrap();
    insta::assert_snapshot!(csv.trim_end(), @r"
    stay_id,cluster_len,ghm,ghs,duration,age,main_error,errors,index_start,index_end
    7,2,04M053,1103,7,45,,,2016-03-01,2017-03-01
    8,1,90Z00Z,9999,0,0,40,40;45,,
    ");
}

#[test]
fn test_results_json() {
    let json = results_json(&results()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["ghm"], "04M053");
    assert_eq!(rows[0]["ghs"], 1103);
    assert_eq!(rows[0]["index_start"], "2016-03-01");
    assert!(rows[0]["main_error"].is_null());
    assert_eq!(rows[1]["errors"], serde_json::json!([40, 45]));
    assert_eq!(rows[1]["ghs"], 9999);
}

#[test]
fn test_results_table_totals() {
    let table = results_table(&results()).to_string();
    assert!(table.contains("04M053"));
    assert!(table.contains("40;45"));
    assert!(table.contains("TOTAL"));
    let total = table
        .lines()
        .find(|line| line.contains("TOTAL"))
        .unwrap();
    assert!(total.contains('3'));
}

#[test]
fn test_constraints_table() {
    let mut constraints = ConstraintSet::default();
    for (code, duration_mask) in [("04M051", u64::MAX & !1), ("04C02J", 1)] {
        let ghm = GhmCode::parse(code).unwrap();
        constraints.constraints.insert(ghm, GhmConstraint { ghm, duration_mask });
    }

    let table = constraints_table(&constraints).to_string();
    let c02 = table.find("04C02J").unwrap();
    let m051 = table.find("04M051").unwrap();
    assert!(c02 < m051);
    assert!(table.contains("1-63"));
}
