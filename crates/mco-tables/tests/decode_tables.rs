//! Integration tests for table decoding and index assembly.
//!
//! Fixtures are encoded with the crate's writer, loaded through the builder
//! and read back through classifier indexes.

use mco_model::{Date, DiagnosisCode, GhmCode, GhmRootCode, GhsCode, ProcedureCode};
use mco_tables::writer::{
    SectionData, TableData, TableFileBuilder, encode_authorization_table, encode_diagnosis_table,
    encode_ghm_decision_tree, encode_ghm_root_table, encode_ghs_table, encode_procedure_table,
    encode_severity_cells, encode_src_pairs,
};
use mco_tables::{
    AuthorizationInfo, AuthorizationScope, BitMask, DiagnosisAttributes, DiagnosisInfo,
    ExclusionInfo, GhmDecisionNode, GhmRootInfo, GhsInfo, ProcedureInfo, SrcPair, TableError,
    TableSetBuilder, TableType, ValueRange, ValueRangeCell,
};

fn date(s: &str) -> Date {
    Date::parse(s).unwrap()
}

fn diag(s: &str) -> DiagnosisCode {
    DiagnosisCode::parse(s).unwrap()
}

fn attributes(cmd: u8, jump: u8, byte20: u8, byte21: u8) -> DiagnosisAttributes {
    let mut raw = [0u8; 37];
    raw[0] = cmd;
    raw[1] = jump;
    raw[20] = byte20;
    raw[21] = byte21;
    DiagnosisAttributes {
        raw,
        cmd,
        jump,
        severity: 0,
    }
}

fn diagnosis(code: &str, male: DiagnosisAttributes, female: DiagnosisAttributes) -> DiagnosisInfo {
    DiagnosisInfo {
        code: diag(code),
        sex_difference: male.raw != female.raw,
        attributes: [male, female],
        warnings: 0b101,
        exclusion_set_idx: 0,
        cma_exclusion: BitMask::new(3, 0x20),
    }
}

fn tree() -> Vec<GhmDecisionNode> {
    vec![
        GhmDecisionNode::Test {
            function: 22,
            params: [0, 2],
            children_idx: 1,
            children_count: 2,
        },
        GhmDecisionNode::Leaf {
            ghm: GhmCode::new(4, b'M', 5, 0),
            error: 0,
        },
        GhmDecisionNode::Test {
            function: 20,
            params: [0, 1],
            children_idx: 4,
            children_count: 1,
        },
        GhmDecisionNode::Leaf {
            ghm: GhmCode::new(90, b'Z', 0, b'Z'),
            error: 80,
        },
        GhmDecisionNode::Leaf {
            ghm: GhmCode::new(4, b'C', 2, b'J'),
            error: 0,
        },
    ]
}

fn procedure(code: &str, phase: u8, start: &str, end: Date, byte0: u8) -> ProcedureInfo {
    let mut bytes = [0u8; 55];
    bytes[0] = byte0;
    ProcedureInfo {
        code: ProcedureCode::parse(code).unwrap(),
        phase,
        start: date(start),
        end,
        bytes,
    }
}

fn root(code: &str) -> GhmRootInfo {
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

fn ghs(ghm: &str, public: u16) -> GhsInfo {
    GhsInfo {
        ghm: GhmCode::parse(ghm).unwrap(),
        ghs: [GhsCode(public), GhsCode(public + 1)],
        bed_authorization: 0,
        unit_authorization: 0,
        minimal_duration: 0,
        minimal_age: 0,
        main_diagnosis_mask: None,
        diagnosis_mask: None,
        procedure_masks: Vec::new(),
    }
}

fn cell(var1: (i32, i32), var2: (i32, i32), value: u16) -> ValueRangeCell<2> {
    ValueRangeCell {
        limits: [
            ValueRange {
                min: var1.0,
                max: var1.1,
            },
            ValueRange {
                min: var2.0,
                max: var2.1,
            },
        ],
        value,
    }
}

/// A file holding one table of every type, valid during 2016.
fn full_file() -> Vec<u8> {
    let (start, end) = (date("2016-03-01"), date("2017-03-01"));

    let diagnoses = [
        diagnosis("K359", attributes(6, 1, 0, 0x80), attributes(6, 1, 0, 0x80)),
        diagnosis("E119", attributes(10, 2, 1, 0), attributes(10, 3, 1, 0)),
        diagnosis("Z515", attributes(23, 0, 0, 0x40), attributes(23, 0, 0, 0x40)),
    ];
    let mut exclusion = ExclusionInfo { raw: [0; 256] };
    exclusion.raw[3] = 0x20;

    let mut old_root = root("04M05");
    old_root.old_age_threshold = 80;
    old_root.old_severity_limit = 2;
    let mut ambulatory_root = root("04C02");
    ambulatory_root.allow_ambulatory = true;
    let mut childbirth_root = root("14Z13");
    childbirth_root.short_duration_threshold = 2;
    childbirth_root.childbirth_severity_list = 2;

    let mut conditional = ghs("04C02J", 1200);
    conditional.minimal_duration = 2;
    conditional.procedure_masks.push(BitMask::new(0, 0x80));
    conditional.main_diagnosis_mask = Some(BitMask::new(21, 0x80));

    let pair = SrcPair {
        diagnosis: diag("E119"),
        procedure: ProcedureCode::parse("ZCQK002").unwrap(),
    };

    TableFileBuilder::new(date("2016-02-15"))
        .table(
            TableData::new(TableType::GhmDecisionTree, start, end)
                .section(encode_ghm_decision_tree(&tree()).unwrap()),
        )
        .table(
            TableData::new(TableType::Diagnosis, start, end)
                .sections(encode_diagnosis_table(&diagnoses, &[exclusion]).unwrap()),
        )
        .table(
            TableData::new(TableType::Procedure, start, end).sections(
                encode_procedure_table(&[
                    procedure("ZCQK002", 0, "2015-01-01", Date::disk_max().unwrap(), 0x80),
                    procedure("HHFA016", 0, "2015-01-01", date("2016-06-01"), 0x01),
                    procedure("HHFA016", 0, "2016-06-01", date("2018-01-01"), 0x02),
                    procedure("HHFA016", 1, "2015-01-01", date("2018-01-01"), 0x04),
                ])
                .unwrap(),
            ),
        )
        .table(
            TableData::new(TableType::GhmRoot, start, end).section(
                encode_ghm_root_table(
                    &[old_root, ambulatory_root, childbirth_root],
                    (11, 15),
                )
                .unwrap(),
            ),
        )
        .table(
            TableData::new(TableType::Severity, start, end)
                .section(encode_severity_cells(&[cell((0, 1500), (22, 33), 3)]).unwrap())
                .section(encode_severity_cells(&[]).unwrap())
                .section(encode_severity_cells(&[cell((0, 37), (0, 4), 2)]).unwrap())
                .section(encode_severity_cells(&[]).unwrap()),
        )
        .table(
            TableData::new(TableType::GhsTree, start, end).section(
                encode_ghs_table(&[ghs("04C021", 1100), conditional, ghs("04C02J", 1201)])
                    .unwrap(),
            ),
        )
        .table(
            TableData::new(TableType::Authorization, start, end).sections(
                encode_authorization_table(&[
                    AuthorizationInfo {
                        scope: AuthorizationScope::Bed,
                        code: 8,
                        function: 1,
                    },
                    AuthorizationInfo {
                        scope: AuthorizationScope::Facility,
                        code: 3,
                        function: 2,
                    },
                ]),
            ),
        )
        .table(
            TableData::new(TableType::SrcPair, start, end)
                .section(encode_src_pairs(&[pair]).unwrap())
                .section(encode_src_pairs(&[]).unwrap()),
        )
        .to_bytes()
        .unwrap()
}

#[test]
fn test_full_file_builds_one_complete_index() {
    let mut builder = TableSetBuilder::new();
    assert_eq!(builder.add_bytes("full.tab", full_file()).unwrap(), 8);
    let load = builder.finish();
    assert!(load.is_complete(), "errors: {:?}", load.errors);

    let set = &load.set;
    assert_eq!(set.index_count(), 1);
    assert_eq!(set.files()[0].name, "full.tab");
    assert_eq!(set.files()[0].sha256.len(), 64);

    let index = set.find_index(Some(date("2016-06-01"))).unwrap();
    assert!(index.is_complete());
    assert_eq!(index.start(), date("2016-03-01"));
    assert_eq!(index.end(), date("2017-03-01"));
    assert_eq!(index.changed_tables(), 0xFF);
    assert!(set.find_index(Some(date("2017-03-01"))).is_none());
    assert!(set.find_index(Some(date("2016-02-29"))).is_none());

    let table = index.table(TableType::GhmRoot).unwrap();
    assert_eq!(table.version, (11, 15));
    assert_eq!(table.build_date, date("2016-02-15"));
}

#[test]
fn test_decision_tree_decodes_back() {
    let mut builder = TableSetBuilder::new();
    builder.add_bytes("full.tab", full_file()).unwrap();
    let load = builder.finish();
    let index = load.set.find_index(None).unwrap();

    assert_eq!(index.ghm_nodes(), tree().as_slice());
}

#[test]
fn test_diagnosis_lookup_and_attributes() {
    let mut builder = TableSetBuilder::new();
    builder.add_bytes("full.tab", full_file()).unwrap();
    let load = builder.finish();
    let index = load.set.find_index(None).unwrap();

    assert_eq!(index.diagnoses().len(), 3);
    let appendicitis = index.find_diagnosis(diag("K359")).unwrap();
    assert_eq!(appendicitis.attributes[0].cmd, 6);
    assert_eq!(appendicitis.attributes[0].severity, 2);
    assert!(!appendicitis.sex_difference);
    assert_eq!(appendicitis.warnings, 0b101);
    assert_eq!(appendicitis.cma_exclusion, BitMask::new(3, 0x20));

    let diabetes = index.find_diagnosis(diag("E119")).unwrap();
    assert!(diabetes.sex_difference);
    assert_eq!(diabetes.attributes[0].severity, 1);
    assert_eq!(diabetes.attributes[1].jump, 3);

    assert_eq!(index.find_diagnosis(diag("Z515")).unwrap().attributes[0].severity, 3);
    assert!(index.find_diagnosis(diag("A00")).is_none());

    let set = index.exclusion_set(appendicitis).unwrap();
    assert!(set.contains(appendicitis.cma_exclusion));
    assert!(!set.contains(BitMask::new(3, 0x10)));
}

#[test]
fn test_procedure_validity_and_phases() {
    let mut builder = TableSetBuilder::new();
    builder.add_bytes("full.tab", full_file()).unwrap();
    let load = builder.finish();
    let index = load.set.find_index(None).unwrap();

    let code = ProcedureCode::parse("HHFA016").unwrap();
    assert_eq!(index.find_procedures(code).len(), 3);

    let before = index.find_procedure(code, 0, date("2016-05-31")).unwrap();
    assert_eq!(before.byte(0), 0x01);
    let after = index.find_procedure(code, 0, date("2016-06-01")).unwrap();
    assert_eq!(after.byte(0), 0x02);
    assert_eq!(index.find_procedure(code, 1, date("2016-06-01")).unwrap().byte(0), 0x04);
    assert!(index.find_procedure(code, 2, date("2016-06-01")).is_none());

    let open_ended = ProcedureCode::parse("ZCQK002").unwrap();
    let info = index.find_procedure(open_ended, 0, date("2150-01-01")).unwrap();
    assert_eq!(info.end, Date::disk_max().unwrap());
}

#[test]
fn test_ghm_root_policies() {
    let mut builder = TableSetBuilder::new();
    builder.add_bytes("full.tab", full_file()).unwrap();
    let load = builder.finish();
    let index = load.set.find_index(None).unwrap();

    let old = index.find_ghm_root(GhmRootCode::parse("04M05").unwrap()).unwrap();
    assert_eq!((old.old_age_threshold, old.old_severity_limit), (80, 2));
    assert!(!old.allow_ambulatory);

    let ambulatory = index.find_ghm_root(GhmRootCode::parse("04C02").unwrap()).unwrap();
    assert!(ambulatory.allow_ambulatory);

    let childbirth = index.find_ghm_root(GhmRootCode::parse("14Z13").unwrap()).unwrap();
    assert_eq!(childbirth.short_duration_threshold, 2);
    assert_eq!(childbirth.childbirth_severity_list, 2);
}

#[test]
fn test_severity_ghs_and_auxiliary_tables() {
    let mut builder = TableSetBuilder::new();
    builder.add_bytes("full.tab", full_file()).unwrap();
    let load = builder.finish();
    let index = load.set.find_index(None).unwrap();

    assert_eq!(index.gnn_cells(), [cell((0, 1500), (22, 33), 3)]);
    assert!(index.cma_cells(1).is_empty());
    assert_eq!(index.cma_cells(2), [cell((0, 37), (0, 4), 2)]);
    assert!(index.cma_cells(0).is_empty());
    assert!(index.cma_cells(4).is_empty());

    let groups = index.find_compatible_ghs(GhmCode::parse("04C02J").unwrap());
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].ghs[0], GhsCode(1200));
    assert_eq!(groups[0].minimal_duration, 2);
    assert_eq!(groups[0].procedure_masks, [BitMask::new(0, 0x80)]);
    assert_eq!(groups[0].main_diagnosis_mask, Some(BitMask::new(21, 0x80)));
    assert_eq!(groups[1].ghs, [GhsCode(1201), GhsCode(1202)]);
    assert!(groups[1].procedure_masks.is_empty());

    // J groups sort before numbered modes of the same root
    assert_eq!(index.ghs()[0].ghm.mode, b'J');
    assert_eq!(index.ghs()[2].ghm.to_string(), "04C021");

    assert_eq!(index.authorizations().len(), 2);
    assert_eq!(index.authorizations()[1].scope, AuthorizationScope::Facility);
    assert_eq!(index.src_pairs(0).len(), 1);
    assert_eq!(index.src_pairs(0)[0].diagnosis, diag("E119"));
    assert!(index.src_pairs(1).is_empty());
    assert!(index.src_pairs(2).is_empty());
}

#[test]
fn test_malformed_table_is_rolled_back() {
    let (start, end) = (date("2016-03-01"), date("2017-03-01"));
    let broken_tree = SectionData::new(6, vec![22, 0, 2, 2, 0, 9]);
    let data = TableFileBuilder::new(date("2016-02-15"))
        .table(TableData::new(TableType::GhmDecisionTree, start, end).section(broken_tree))
        .table(
            TableData::new(TableType::Diagnosis, start, end).sections(
                encode_diagnosis_table(
                    &[diagnosis("K359", attributes(6, 1, 0, 0), attributes(6, 1, 0, 0))],
                    &[ExclusionInfo { raw: [0; 256] }],
                )
                .unwrap(),
            ),
        )
        .to_bytes()
        .unwrap();

    let mut builder = TableSetBuilder::new();
    builder.add_bytes("broken.tab", data).unwrap();
    let load = builder.finish();

    assert!(!load.is_complete());
    assert_eq!(load.errors.len(), 1);
    match &load.errors[0] {
        TableError::Malformed { file, reason } => {
            assert_eq!(file, "broken.tab");
            assert!(reason.contains("children_idx"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let index = load.set.find_index(None).unwrap();
    assert!(index.ghm_nodes().is_empty());
    assert_eq!(index.diagnoses().len(), 1);
    assert!(!index.is_complete());
}

#[test]
fn test_unknown_tables_are_listed_but_not_indexed() {
    let (start, end) = (date("2016-03-01"), date("2017-03-01"));
    let data = TableFileBuilder::new(date("2016-02-15"))
        .table(TableData::with_tag("PRIXGHS", start, end).section(SectionData::new(4, vec![0; 8])))
        .to_bytes()
        .unwrap();

    let mut builder = TableSetBuilder::new();
    assert_eq!(builder.add_bytes("prices.tab", data).unwrap(), 1);
    let load = builder.finish();

    assert!(load.is_complete());
    assert_eq!(load.set.tables()[0].kind, TableType::Unknown);
    assert_eq!(load.set.tables()[0].raw_type, "PRIXGHS");
    assert_eq!(load.set.index_count(), 0);
}

#[test]
fn test_old_format_version_is_rejected() {
    let (start, end) = (date("2016-03-01"), date("2017-03-01"));
    let data = TableFileBuilder::new(date("2016-02-15"))
        .version((11, 9))
        .table(
            TableData::new(TableType::GhmDecisionTree, start, end)
                .section(encode_ghm_decision_tree(&tree()).unwrap()),
        )
        .to_bytes()
        .unwrap();

    let mut builder = TableSetBuilder::new();
    let err = builder.add_bytes("old.tab", data).unwrap_err();
    assert!(matches!(err, TableError::Malformed { .. }));
    assert!(builder.finish().set.tables().is_empty());
}
