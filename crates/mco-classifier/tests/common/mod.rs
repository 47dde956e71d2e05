//! Table fixtures shared by the classifier integration tests.
//!
//! The tables are encoded with the `mco-tables` writer and loaded back, so
//! classification runs over the same structures as with real files. The
//! index is valid from 2016-03-01 to 2017-03-01.
//!
//! Tests that need other trees, GHM roots or severity grids build them with
//! [`table_set_with`].
//!
//! Decision tree:
//!
//! ```text
//! 0: main diagnosis CMD == 4 ?
//!    no  -> 1: leaf 23Z02Z
//!    yes -> 2: duration < 1 ?
//!               no  -> 3: leaf 04M05 (severity resolved)
//!               yes -> 4: leaf 04C02 (ambulatory root)
//! ```

#![allow(dead_code)]

use mco_model::{
    Date, DiagnosisCode, GhmCode, GhmRootCode, GhsCode, ProcedureCode, ProcedureRealisation, Sex,
    Stay,
};
use mco_tables::writer::{
    TableData, TableFileBuilder, encode_diagnosis_table, encode_ghm_decision_tree,
    encode_ghm_root_table, encode_ghs_table, encode_procedure_table, encode_severity_cells,
};
use mco_tables::{
    BitMask, DiagnosisAttributes, DiagnosisInfo, ExclusionInfo, GhmDecisionNode, GhmRootInfo,
    GhsInfo, ProcedureInfo, TableSet, TableSetBuilder, TableType, ValueRange, ValueRangeCell,
};

/// Newborn grid followed by the three childbirth CMA lists.
pub type SeverityGrids = [Vec<ValueRangeCell<2>>; 4];

pub fn date(s: &str) -> Date {
    Date::parse(s).unwrap()
}

pub fn diag(s: &str) -> DiagnosisCode {
    DiagnosisCode::parse(s).unwrap()
}

pub fn proc_code(s: &str) -> ProcedureCode {
    ProcedureCode::parse(s).unwrap()
}

pub fn ghm(s: &str) -> GhmCode {
    GhmCode::parse(s).unwrap()
}

/// Position of each diagnosis in exclusion sets.
fn exclusion_bit(code: &str) -> BitMask {
    match code {
        "J189" => BitMask::new(0, 0x80),
        "E119" => BitMask::new(0, 0x40),
        "I10" => BitMask::new(0, 0x20),
        "N179" => BitMask::new(0, 0x10),
        "Z515" => BitMask::new(0, 0x08),
        "S062" => BitMask::new(0, 0x04),
        "K359" => BitMask::new(0, 0x02),
        _ => BitMask::new(1, 0x80),
    }
}

/// Attribute block with CMD/jump and the severity bits of byte 20/21.
fn attributes(cmd: u8, jump: u8, byte20: u8, byte21: u8) -> DiagnosisAttributes {
    let mut raw = [0u8; 37];
    raw[0] = cmd;
    raw[1] = jump;
    raw[20] = byte20;
    raw[21] = byte21;
    let severity = if byte21 & 0x40 != 0 {
        3
    } else if byte21 & 0x80 != 0 {
        2
    } else {
        u8::from(byte20 & 0x01 != 0)
    };
    DiagnosisAttributes {
        raw,
        cmd,
        jump,
        severity,
    }
}

fn diagnosis(code: &str, attrs: DiagnosisAttributes, exclusion_set_idx: usize) -> DiagnosisInfo {
    DiagnosisInfo {
        code: diag(code),
        sex_difference: false,
        attributes: [attrs, attrs],
        warnings: 0,
        exclusion_set_idx,
        cma_exclusion: exclusion_bit(code),
    }
}

fn diagnoses() -> (Vec<DiagnosisInfo>, Vec<ExclusionInfo>) {
    let mut obsolete_attributes = attributes(4, 0, 0, 0);
    obsolete_attributes.raw[5] = 0x02;
    let obsolete = diagnosis("J180", obsolete_attributes, 0);
    // Carries the imprecise warning bit
    let mut vague = diagnosis("R51", attributes(18, 0, 0, 0), 0);
    vague.warnings = 1;

    let diagnoses = vec![
        diagnosis("J189", attributes(4, 0, 0, 0), 0),
        // Level 1 complication
        diagnosis("E119", attributes(10, 0, 0x01, 0), 0),
        // Level 2 complication
        diagnosis("I10", attributes(5, 0, 0, 0x80), 0),
        // Level 3 complication, excluded by a J189 main diagnosis
        diagnosis("N179", attributes(11, 0, 0, 0x40), 1),
        diagnosis("Z515", attributes(23, 0, 0, 0), 0),
        // Trauma main diagnosis, penalized in scores
        diagnosis("S062", attributes(1, 0, 0, 0x24), 0),
        // Penalized in scores only
        diagnosis("K359", attributes(6, 0, 0, 0x20), 0),
        obsolete,
        // Imprecise (CMD 0, jump 3), never swapped with the main diagnosis
        diagnosis("R69", attributes(0, 3, 0, 0), 0),
        vague,
        diagnosis("Z511", attributes(28, 0, 0, 0), 0),
        // Delivery outcome
        diagnosis("Z370", attributes(14, 0, 0, 0), 0),
    ];

    let empty = ExclusionInfo { raw: [0; 256] };
    let mut excludes_j189 = empty;
    excludes_j189.raw[0] = 0x80;
    (diagnoses, vec![empty, excludes_j189])
}

fn procedure(code: &str, bytes: &[(usize, u8)]) -> ProcedureInfo {
    let mut raw = [0u8; 55];
    for &(offset, value) in bytes {
        raw[offset] = value;
    }
    ProcedureInfo {
        code: proc_code(code),
        phase: 0,
        start: date("2015-01-01"),
        end: Date::disk_max().unwrap(),
        bytes: raw,
    }
}

fn procedure_from(code: &str, start: &str) -> ProcedureInfo {
    ProcedureInfo {
        start: date(start),
        ..procedure(code, &[])
    }
}

fn procedures() -> Vec<ProcedureInfo> {
    vec![
        // Major act, decides the main stay
        procedure("ZCQK002", &[(0, 0x80)]),
        // Priority tier 3
        procedure("HHFA016", &[(38, 0x02)]),
        // Neutral
        procedure("EBLA003", &[(5, 0x01)]),
        procedure("EBLA004", &[(5, 0x01)]),
        // Delivery
        procedure("JQGD010", &[(41, 0x02)]),
        procedure("JNJD002", &[]),
        // Not valid before September 2016
        procedure_from("HHFA017", "2016-09-01"),
    ]
}

fn tree() -> Vec<GhmDecisionNode> {
    vec![
        GhmDecisionNode::Test {
            function: 13,
            params: [0, 4],
            children_idx: 1,
            children_count: 2,
        },
        GhmDecisionNode::Leaf {
            ghm: ghm("23Z02Z"),
            error: 0,
        },
        GhmDecisionNode::Test {
            function: 22,
            params: [0, 1],
            children_idx: 3,
            children_count: 2,
        },
        GhmDecisionNode::Leaf {
            ghm: GhmCode::new(4, b'M', 5, 0),
            error: 0,
        },
        GhmDecisionNode::Leaf {
            ghm: GhmCode::new(4, b'C', 2, 0),
            error: 0,
        },
    ]
}

pub fn root(code: &str) -> GhmRootInfo {
    GhmRootInfo {
        code: GhmRootCode::parse(code).unwrap(),
        allow_ambulatory: false,
        short_duration_threshold: 0,
        confirm_duration_threshold: 0,
        young_age_threshold: 0,
        young_severity_limit: 0,
        old_age_threshold: 0,
        old_severity_limit: 0,
        childbirth_severity_list: 0,
        cma_exclusion: BitMask::new(0, 0),
    }
}

fn roots() -> Vec<GhmRootInfo> {
    let mut medical = root("04M05");
    medical.old_age_threshold = 80;
    medical.old_severity_limit = 1;
    let mut ambulatory = root("04C02");
    ambulatory.allow_ambulatory = true;
    vec![medical, ambulatory, root("23Z02")]
}

pub fn ghs(ghm_code: &str, public: u16) -> GhsInfo {
    GhsInfo {
        ghm: ghm(ghm_code),
        ghs: [GhsCode(public), GhsCode(public + 5000)],
        bed_authorization: 0,
        unit_authorization: 0,
        minimal_duration: 0,
        minimal_age: 0,
        main_diagnosis_mask: None,
        diagnosis_mask: None,
        procedure_masks: Vec::new(),
    }
}

fn ghs_groups() -> Vec<GhsInfo> {
    let mut intensive = ghs("04M051", 2001);
    intensive.unit_authorization = 3;
    intensive.minimal_duration = 4;
    vec![
        intensive,
        ghs("04M051", 1101),
        ghs("04M052", 1102),
        ghs("04M053", 1103),
        ghs("04M054", 1104),
        ghs("04C02J", 1200),
        ghs("04C021", 1201),
        ghs("23Z02Z", 2302),
    ]
}

/// Encode the fixture tables with `tree`, the fixture roots plus
/// `extra_roots`, and `grids` as severity grids.
pub fn table_file_with(
    tree: &[GhmDecisionNode],
    extra_roots: &[GhmRootInfo],
    grids: &SeverityGrids,
) -> Vec<u8> {
    let (start, end) = (date("2016-03-01"), date("2017-03-01"));
    let (diagnoses, exclusions) = diagnoses();
    let mut all_roots = roots();
    all_roots.extend_from_slice(extra_roots);

    TableFileBuilder::new(date("2016-02-15"))
        .table(
            TableData::new(TableType::GhmDecisionTree, start, end)
                .section(encode_ghm_decision_tree(tree).unwrap()),
        )
        .table(
            TableData::new(TableType::Diagnosis, start, end)
                .sections(encode_diagnosis_table(&diagnoses, &exclusions).unwrap()),
        )
        .table(
            TableData::new(TableType::Procedure, start, end)
                .sections(encode_procedure_table(&procedures()).unwrap()),
        )
        .table(
            TableData::new(TableType::GhmRoot, start, end)
                .section(encode_ghm_root_table(&all_roots, (11, 15)).unwrap()),
        )
        .table(
            TableData::new(TableType::Severity, start, end).sections(
                grids
                    .iter()
                    .map(|cells| encode_severity_cells(cells).unwrap()),
            ),
        )
        .table(
            TableData::new(TableType::GhsTree, start, end)
                .section(encode_ghs_table(&ghs_groups()).unwrap()),
        )
        .to_bytes()
        .unwrap()
}

/// Encode the fixture tables, with `tree` as decision tree.
pub fn table_file_with_tree(tree: &[GhmDecisionNode]) -> Vec<u8> {
    table_file_with(tree, &[], &SeverityGrids::default())
}

/// Encode the fixture tables with the default decision tree.
pub fn table_file() -> Vec<u8> {
    table_file_with_tree(&tree())
}

/// A file holding only an empty severity grid, valid from 2017-03-01 to
/// 2018-03-01.
pub fn severity_only_file() -> Vec<u8> {
    let empty = || encode_severity_cells(&[]).unwrap();
    TableFileBuilder::new(date("2017-02-15"))
        .table(
            TableData::new(TableType::Severity, date("2017-03-01"), date("2018-03-01"))
                .sections([empty(), empty(), empty(), empty()]),
        )
        .to_bytes()
        .unwrap()
}

fn load(data: Vec<u8>) -> TableSet {
    let mut builder = TableSetBuilder::new();
    builder.add_bytes("fixture.tab", data).unwrap();
    let load = builder.finish();
    assert!(load.is_complete(), "{:?}", load.errors);
    load.set
}

pub fn table_set_with(
    tree: &[GhmDecisionNode],
    extra_roots: &[GhmRootInfo],
    grids: &SeverityGrids,
) -> TableSet {
    load(table_file_with(tree, extra_roots, grids))
}

pub fn table_set_with_tree(tree: &[GhmDecisionNode]) -> TableSet {
    load(table_file_with_tree(tree))
}

pub fn table_set() -> TableSet {
    table_set_with_tree(&tree())
}

/// A 45-year-old woman admitted on `admission` for `main`.
pub fn stay(stay_id: u32, admission: &str, discharge: &str, main: &str) -> Stay {
    Stay::new(stay_id, Sex::Female, date(admission), date(discharge))
        .with_birthdate(date("1971-05-12"))
        .with_main_diagnosis(diag(main))
        .with_entry(8, 0)
        .with_exit(8, 0)
}

pub fn act(code: &str, day: &str) -> ProcedureRealisation {
    ProcedureRealisation::new(proc_code(code), date(day))
}

pub fn leaf(code: &str) -> GhmDecisionNode {
    GhmDecisionNode::Leaf {
        ghm: ghm(code),
        error: 0,
    }
}

pub fn test_node(
    function: u8,
    params: [u8; 2],
    children_idx: usize,
    children_count: usize,
) -> GhmDecisionNode {
    GhmDecisionNode::Test {
        function,
        params,
        children_idx,
        children_count,
    }
}

/// One test at node 0 choosing between 23Z02Z (result 0) and 04M05Z
/// (result 1).
pub fn yes_no_tree(function: u8, params: [u8; 2]) -> Vec<GhmDecisionNode> {
    vec![
        test_node(function, params, 1, 2),
        leaf("23Z02Z"),
        leaf("04M05Z"),
    ]
}

/// Grid cell over two inclusive ranges.
pub fn cell(var1: (i32, i32), var2: (i32, i32), value: u16) -> ValueRangeCell<2> {
    ValueRangeCell {
        limits: [
            ValueRange {
                min: var1.0,
                max: var1.1 + 1,
            },
            ValueRange {
                min: var2.0,
                max: var2.1 + 1,
            },
        ],
        value,
    }
}
