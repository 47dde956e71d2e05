//! Date-versioned assembly of decoded tables.
//!
//! Every table is valid over a date interval. [`plan_indexes`] cuts the
//! timeline into the fewest disjoint intervals over which the set of active
//! tables (one per type) does not change; [`TableSetBuilder::finish`] then
//! decodes each active table once and commits one [`ClassifierIndex`] per
//! interval.
//!
//! Decoded records live in shared append-only arenas. An index only stores
//! ranges into them, so consecutive indexes that keep a table share its
//! records and its lookup map.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

use mco_model::{Date, DiagnosisCode, GhmCode, GhmRootCode, ProcedureCode};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::decode::{
    parse_authorization_table, parse_diagnosis_table, parse_exclusion_table,
    parse_ghm_decision_tree, parse_ghm_root_table, parse_ghs_table, parse_procedure_table,
    parse_severity_table, parse_src_pair_table,
};
use crate::error::{Result, TableError};
use crate::guard::AppendGuard;
use crate::header::parse_table_headers;
use crate::index::ClassifierIndex;
use crate::types::{
    AuthorizationInfo, DiagnosisInfo, ExclusionInfo, GhmDecisionNode, GhmRootInfo, GhsInfo,
    ProcedureInfo, SrcPair, TableInfo, TableType, ValueRangeCell,
};

/// Active table index per [`TableType::KNOWN`] slot.
pub type ActiveTables = [Option<usize>; TableType::COUNT];

/// One planned index: an interval and the table active for each type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPlan {
    pub start: Date,
    pub end: Date,
    pub tables: ActiveTables,
}

/// Sort key: start date, then version, then build date. Ties keep input order.
fn precedence(table: &TableInfo) -> (Date, (u16, u16), Date) {
    (table.start, table.version, table.build_date)
}

/// Cut the timeline covered by `tables` into disjoint, sorted intervals.
///
/// Over each interval, the active table of a type is the one with the
/// highest precedence among those valid there. Adjacent intervals with the
/// same active tables are merged. Unknown tables are ignored.
pub fn plan_indexes(tables: &[TableInfo]) -> Vec<IndexPlan> {
    let mut order: Vec<usize> = tables
        .iter()
        .enumerate()
        .filter(|(_, table)| table.kind != TableType::Unknown)
        .map(|(idx, _)| idx)
        .collect();
    order.sort_by_key(|&idx| precedence(&tables[idx]));

    let mut bounds: Vec<Date> = order
        .iter()
        .flat_map(|&idx| [tables[idx].start, tables[idx].end])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut plans: Vec<IndexPlan> = Vec::new();
    for window in bounds.windows(2) {
        let (start, end) = (window[0], window[1]);

        let mut active: ActiveTables = [None; TableType::COUNT];
        for &idx in &order {
            let table = &tables[idx];
            if let Some(slot) = table.kind.index()
                && table.covers(start)
            {
                active[slot] = Some(idx);
            }
        }
        if active.iter().all(Option::is_none) {
            continue;
        }

        match plans.last_mut() {
            Some(last) if last.end == start && last.tables == active => last.end = end,
            _ => plans.push(IndexPlan {
                start,
                end,
                tables: active,
            }),
        }
    }

    plans
}

/// Metadata of a loaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    pub name: String,
    pub size: usize,
    /// Hex SHA-256 of the file content.
    pub sha256: String,
}

/// Shared arenas of decoded records.
#[derive(Debug, Default)]
pub(crate) struct TableStore {
    pub ghm_nodes: Vec<GhmDecisionNode>,
    pub diagnoses: Vec<DiagnosisInfo>,
    pub exclusions: Vec<ExclusionInfo>,
    pub procedures: Vec<ProcedureInfo>,
    pub ghm_roots: Vec<GhmRootInfo>,
    pub gnn_cells: Vec<ValueRangeCell<2>>,
    pub cma_cells: [Vec<ValueRangeCell<2>>; 3],
    pub ghs: Vec<GhsInfo>,
    pub authorizations: Vec<AuthorizationInfo>,
    pub src_pairs: [Vec<SrcPair>; 2],
}

/// Code to record maps; values are relative to the owning index's slice.
#[derive(Debug, Default)]
pub(crate) struct IndexMaps {
    pub diagnoses: Vec<HashMap<DiagnosisCode, usize>>,
    pub procedures: Vec<HashMap<ProcedureCode, usize>>,
    pub ghm_roots: Vec<HashMap<GhmRootCode, usize>>,
    pub ghs: Vec<HashMap<GhmCode, usize>>,
}

/// Map each key to its first position in `records`; return the map id.
fn build_map<T, K: Hash + Eq>(
    maps: &mut Vec<HashMap<K, usize>>,
    records: &[T],
    key: impl Fn(&T) -> K,
) -> usize {
    let mut map = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        map.entry(key(record)).or_insert(idx);
    }
    maps.push(map);
    maps.len() - 1
}

/// Arena ranges and map ids produced by decoding one table.
#[derive(Debug, Clone)]
enum TableParts {
    GhmDecisionTree {
        nodes: Range<usize>,
    },
    Diagnosis {
        diagnoses: Range<usize>,
        exclusions: Range<usize>,
        map: usize,
    },
    Procedure {
        procedures: Range<usize>,
        map: usize,
    },
    GhmRoot {
        roots: Range<usize>,
        map: usize,
    },
    Severity {
        gnn: Range<usize>,
        cma: [Range<usize>; 3],
    },
    GhsTree {
        ghs: Range<usize>,
        map: usize,
    },
    Authorization {
        authorizations: Range<usize>,
    },
    SrcPair {
        pairs: [Range<usize>; 2],
    },
}

/// Everything an index needs to slice the arenas.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexParts {
    pub ghm_nodes: Range<usize>,
    pub diagnoses: Range<usize>,
    pub exclusions: Range<usize>,
    pub procedures: Range<usize>,
    pub ghm_roots: Range<usize>,
    pub gnn_cells: Range<usize>,
    pub cma_cells: [Range<usize>; 3],
    pub ghs: Range<usize>,
    pub authorizations: Range<usize>,
    pub src_pairs: [Range<usize>; 2],
    pub diagnosis_map: Option<usize>,
    pub procedure_map: Option<usize>,
    pub ghm_root_map: Option<usize>,
    pub ghs_map: Option<usize>,
}

impl IndexParts {
    fn apply(&mut self, parts: &TableParts) {
        match parts {
            TableParts::GhmDecisionTree { nodes } => self.ghm_nodes = nodes.clone(),
            TableParts::Diagnosis {
                diagnoses,
                exclusions,
                map,
            } => {
                self.diagnoses = diagnoses.clone();
                self.exclusions = exclusions.clone();
                self.diagnosis_map = Some(*map);
            }
            TableParts::Procedure { procedures, map } => {
                self.procedures = procedures.clone();
                self.procedure_map = Some(*map);
            }
            TableParts::GhmRoot { roots, map } => {
                self.ghm_roots = roots.clone();
                self.ghm_root_map = Some(*map);
            }
            TableParts::Severity { gnn, cma } => {
                self.gnn_cells = gnn.clone();
                self.cma_cells = cma.clone();
            }
            TableParts::GhsTree { ghs, map } => {
                self.ghs = ghs.clone();
                self.ghs_map = Some(*map);
            }
            TableParts::Authorization { authorizations } => {
                self.authorizations = authorizations.clone();
            }
            TableParts::SrcPair { pairs } => self.src_pairs = pairs.clone(),
        }
    }
}

/// Decode `table` into the arenas.
///
/// Kinds made of several sections hold a guard on every arena they append
/// to, so a failing section leaves all of them untouched.
fn decode_into(
    store: &mut TableStore,
    maps: &mut IndexMaps,
    data: &[u8],
    table: &TableInfo,
) -> Result<TableParts> {
    let parts = match table.kind {
        TableType::GhmDecisionTree => {
            let start = store.ghm_nodes.len();
            parse_ghm_decision_tree(data, table, &mut store.ghm_nodes)?;
            TableParts::GhmDecisionTree {
                nodes: start..store.ghm_nodes.len(),
            }
        }
        TableType::Diagnosis => {
            let mut diagnoses = AppendGuard::new(&mut store.diagnoses);
            parse_diagnosis_table(data, table, &mut diagnoses)?;
            let exclusions_start = store.exclusions.len();
            parse_exclusion_table(data, table, &mut store.exclusions)?;
            let map = build_map(&mut maps.diagnoses, diagnoses.appended(), |d| d.code);
            let parts = TableParts::Diagnosis {
                diagnoses: diagnoses.start()..diagnoses.len(),
                exclusions: exclusions_start..store.exclusions.len(),
                map,
            };
            diagnoses.commit();
            parts
        }
        TableType::Procedure => {
            let start = store.procedures.len();
            parse_procedure_table(data, table, &mut store.procedures)?;
            let procedures = start..store.procedures.len();
            let map = build_map(
                &mut maps.procedures,
                &store.procedures[procedures.clone()],
                |p| p.code,
            );
            TableParts::Procedure { procedures, map }
        }
        TableType::GhmRoot => {
            let start = store.ghm_roots.len();
            parse_ghm_root_table(data, table, &mut store.ghm_roots)?;
            let roots = start..store.ghm_roots.len();
            let map = build_map(&mut maps.ghm_roots, &store.ghm_roots[roots.clone()], |r| {
                r.code
            });
            TableParts::GhmRoot { roots, map }
        }
        TableType::Severity => {
            let mut gnn = AppendGuard::new(&mut store.gnn_cells);
            parse_severity_table(data, table, 0, &mut gnn)?;
            let [cma0, cma1, cma2] = &mut store.cma_cells;
            let mut cma = [
                AppendGuard::new(cma0),
                AppendGuard::new(cma1),
                AppendGuard::new(cma2),
            ];
            for (list, cells) in cma.iter_mut().enumerate() {
                parse_severity_table(data, table, list + 1, cells)?;
            }
            let parts = TableParts::Severity {
                gnn: gnn.start()..gnn.len(),
                cma: cma.each_ref().map(|cells| cells.start()..cells.len()),
            };
            gnn.commit();
            cma.into_iter().for_each(AppendGuard::commit);
            parts
        }
        TableType::GhsTree => {
            let start = store.ghs.len();
            parse_ghs_table(data, table, &mut store.ghs)?;
            let ghs = start..store.ghs.len();
            let map = build_map(&mut maps.ghs, &store.ghs[ghs.clone()], |g| g.ghm);
            TableParts::GhsTree { ghs, map }
        }
        TableType::Authorization => {
            let start = store.authorizations.len();
            parse_authorization_table(data, table, &mut store.authorizations)?;
            TableParts::Authorization {
                authorizations: start..store.authorizations.len(),
            }
        }
        TableType::SrcPair => {
            let [first, second] = &mut store.src_pairs;
            let mut lists = [AppendGuard::new(first), AppendGuard::new(second)];
            for (list, out) in lists.iter_mut().enumerate() {
                parse_src_pair_table(data, table, list, out)?;
            }
            let pairs = lists.each_ref().map(|out| out.start()..out.len());
            lists.into_iter().for_each(AppendGuard::commit);
            TableParts::SrcPair { pairs }
        }
        TableType::Unknown => {
            return Err(TableError::malformed(&table.file, "cannot decode unknown table"));
        }
    };
    Ok(parts)
}

/// One committed index.
#[derive(Debug, Clone)]
pub(crate) struct IndexEntry {
    pub start: Date,
    pub end: Date,
    pub tables: ActiveTables,
    pub changed_tables: u16,
    pub parts: IndexParts,
}

/// Immutable set of decoded tables and the indexes built over them.
#[derive(Debug, Default)]
pub struct TableSet {
    pub(crate) files: Vec<TableFile>,
    pub(crate) tables: Vec<TableInfo>,
    pub(crate) store: TableStore,
    pub(crate) maps: IndexMaps,
    pub(crate) indexes: Vec<IndexEntry>,
}

impl TableSet {
    pub fn files(&self) -> &[TableFile] {
        &self.files
    }

    /// Every table found, including unknown and undecodable ones.
    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Indexes in chronological order.
    pub fn indexes(&self) -> impl Iterator<Item = ClassifierIndex<'_>> {
        self.indexes
            .iter()
            .map(move |entry| ClassifierIndex::new(self, entry))
    }

    /// Index valid on `date`, searching from the newest; `None` selects the
    /// most recent index.
    pub fn find_index(&self, date: Option<Date>) -> Option<ClassifierIndex<'_>> {
        let entry = match date {
            Some(date) => self
                .indexes
                .iter()
                .rev()
                .find(|entry| entry.start <= date && date < entry.end),
            None => self.indexes.last(),
        }?;
        Some(ClassifierIndex::new(self, entry))
    }
}

/// Result of loading tables: the set plus every error met on the way.
#[derive(Debug)]
pub struct TableSetLoad {
    pub set: TableSet,
    pub errors: Vec<TableError>,
}

impl TableSetLoad {
    /// True when every file and table loaded without error.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

struct PendingFile {
    info: TableFile,
    data: Vec<u8>,
}

/// Collects table files, then decodes them into a [`TableSet`].
#[derive(Default)]
pub struct TableSetBuilder {
    files: Vec<PendingFile>,
    tables: Vec<TableInfo>,
    pub(crate) errors: Vec<TableError>,
}

impl TableSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content of a table file. Returns the number of tables
    /// found; on error nothing from this file is kept.
    pub fn add_bytes(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<usize> {
        let name = name.into();
        let source = self.files.len();
        let before = self.tables.len();
        parse_table_headers(&data, &name, source, &mut self.tables)?;

        let info = TableFile {
            sha256: hex::encode(Sha256::digest(&data)),
            size: data.len(),
            name,
        };
        debug!(file = %info.name, tables = self.tables.len() - before, "registered table file");
        self.files.push(PendingFile { info, data });
        Ok(self.tables.len() - before)
    }

    /// Record an error without aborting the load.
    pub fn record_error(&mut self, error: TableError) {
        warn!(%error, "table load error");
        self.errors.push(error);
    }

    /// Decode the active tables and commit the indexes.
    pub fn finish(self) -> TableSetLoad {
        let TableSetBuilder {
            files,
            tables,
            mut errors,
        } = self;

        let mut store = TableStore::default();
        let mut maps = IndexMaps::default();
        let mut decoded: Vec<Option<Option<TableParts>>> = vec![None; tables.len()];
        let mut indexes = Vec::new();
        let mut previous: ActiveTables = [None; TableType::COUNT];

        for plan in plan_indexes(&tables) {
            let mut parts = IndexParts::default();
            let mut changed_tables = 0u16;

            for (slot, active) in plan.tables.iter().enumerate() {
                if *active != previous[slot] {
                    changed_tables |= 1 << slot;
                }
                let Some(table_idx) = *active else {
                    continue;
                };

                let table = &tables[table_idx];
                let table_parts = decoded[table_idx].get_or_insert_with(|| {
                    let data = files
                        .get(table.source)
                        .map_or(&[][..], |file| file.data.as_slice());
                    match decode_into(&mut store, &mut maps, data, table) {
                        Ok(parts) => {
                            debug!(file = %table.file, kind = %table.kind, "decoded table");
                            Some(parts)
                        }
                        Err(error) => {
                            warn!(%error, "failed to decode table");
                            errors.push(error);
                            None
                        }
                    }
                });
                if let Some(table_parts) = table_parts {
                    parts.apply(table_parts);
                }
            }

            debug!(
                start = %plan.start,
                end = %plan.end,
                changed_tables,
                "committed index"
            );
            indexes.push(IndexEntry {
                start: plan.start,
                end: plan.end,
                tables: plan.tables,
                changed_tables,
                parts,
            });
            previous = plan.tables;
        }

        TableSetLoad {
            set: TableSet {
                files: files.into_iter().map(|file| file.info).collect(),
                tables,
                store,
                maps,
                indexes,
            },
            errors,
        }
    }
}
