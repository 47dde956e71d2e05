//! Date-scoped view over a [`TableSet`].

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

use mco_model::{Date, DiagnosisCode, GhmCode, GhmRootCode, ProcedureCode};

use crate::table_set::{IndexEntry, TableSet};
use crate::types::{
    AuthorizationInfo, DiagnosisInfo, ExclusionInfo, GhmDecisionNode, GhmRootInfo, GhsInfo,
    ProcedureInfo, SrcPair, TableInfo, TableType, ValueRangeCell,
};

/// Table types an index needs to classify stays.
const REQUIRED_TABLES: [TableType; 5] = [
    TableType::GhmDecisionTree,
    TableType::Diagnosis,
    TableType::Procedure,
    TableType::GhmRoot,
    TableType::GhsTree,
];

fn slice<'s, T>(items: &'s [T], range: &Range<usize>) -> &'s [T] {
    items.get(range.clone()).unwrap_or(&[])
}

/// Read-only classifier tables valid over `[start, end)`.
///
/// This is a borrowed view: copying it is free and it can be shared across
/// threads.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierIndex<'a> {
    set: &'a TableSet,
    entry: &'a IndexEntry,
}

impl<'a> ClassifierIndex<'a> {
    pub(crate) fn new(set: &'a TableSet, entry: &'a IndexEntry) -> Self {
        Self { set, entry }
    }

    pub fn start(&self) -> Date {
        self.entry.start
    }

    pub fn end(&self) -> Date {
        self.entry.end
    }

    /// Bit `n` is set when the table of [`TableType::KNOWN`]`[n]` differs
    /// from the previous index.
    pub fn changed_tables(&self) -> u16 {
        self.entry.changed_tables
    }

    pub fn has_changed(&self, kind: TableType) -> bool {
        kind.index()
            .is_some_and(|slot| self.entry.changed_tables & (1 << slot) != 0)
    }

    /// Active table of `kind`, if any.
    pub fn table(&self, kind: TableType) -> Option<&'a TableInfo> {
        let slot = kind.index()?;
        self.entry.tables[slot].and_then(|idx| self.set.tables.get(idx))
    }

    /// True when every table needed to classify stays is present.
    pub fn is_complete(&self) -> bool {
        REQUIRED_TABLES.iter().all(|&kind| self.table(kind).is_some())
    }

    pub fn ghm_nodes(&self) -> &'a [GhmDecisionNode] {
        slice(&self.set.store.ghm_nodes, &self.entry.parts.ghm_nodes)
    }

    pub fn diagnoses(&self) -> &'a [DiagnosisInfo] {
        slice(&self.set.store.diagnoses, &self.entry.parts.diagnoses)
    }

    pub fn exclusions(&self) -> &'a [ExclusionInfo] {
        slice(&self.set.store.exclusions, &self.entry.parts.exclusions)
    }

    pub fn procedures(&self) -> &'a [ProcedureInfo] {
        slice(&self.set.store.procedures, &self.entry.parts.procedures)
    }

    pub fn ghm_roots(&self) -> &'a [GhmRootInfo] {
        slice(&self.set.store.ghm_roots, &self.entry.parts.ghm_roots)
    }

    pub fn gnn_cells(&self) -> &'a [ValueRangeCell<2>] {
        slice(&self.set.store.gnn_cells, &self.entry.parts.gnn_cells)
    }

    /// Childbirth CMA list `list` (1..=3); empty for any other id.
    pub fn cma_cells(&self, list: u8) -> &'a [ValueRangeCell<2>] {
        match usize::from(list).checked_sub(1) {
            Some(idx) if idx < 3 => {
                slice(&self.set.store.cma_cells[idx], &self.entry.parts.cma_cells[idx])
            }
            _ => &[],
        }
    }

    pub fn ghs(&self) -> &'a [GhsInfo] {
        slice(&self.set.store.ghs, &self.entry.parts.ghs)
    }

    pub fn authorizations(&self) -> &'a [AuthorizationInfo] {
        slice(&self.set.store.authorizations, &self.entry.parts.authorizations)
    }

    /// Supplement pair list `list` (0 or 1).
    pub fn src_pairs(&self, list: usize) -> &'a [SrcPair] {
        match (self.set.store.src_pairs.get(list), self.entry.parts.src_pairs.get(list)) {
            (Some(pairs), Some(range)) => slice(pairs, range),
            _ => &[],
        }
    }

    fn lookup<K: Hash + Eq>(
        maps: &'a [HashMap<K, usize>],
        map_id: Option<usize>,
        key: &K,
    ) -> Option<usize> {
        maps.get(map_id?)?.get(key).copied()
    }

    pub fn find_diagnosis(&self, code: DiagnosisCode) -> Option<&'a DiagnosisInfo> {
        let idx = Self::lookup(&self.set.maps.diagnoses, self.entry.parts.diagnosis_map, &code)?;
        self.diagnoses().get(idx)
    }

    /// Every procedure record with `code`, across phases and validity periods.
    pub fn find_procedures(&self, code: ProcedureCode) -> &'a [ProcedureInfo] {
        let procedures = self.procedures();
        let Some(first) =
            Self::lookup(&self.set.maps.procedures, self.entry.parts.procedure_map, &code)
        else {
            return &[];
        };
        let tail = procedures.get(first..).unwrap_or(&[]);
        let len = tail.iter().take_while(|info| info.code == code).count();
        &tail[..len]
    }

    /// Procedure record for `code` and `phase` valid on `date`.
    pub fn find_procedure(
        &self,
        code: ProcedureCode,
        phase: u8,
        date: Date,
    ) -> Option<&'a ProcedureInfo> {
        self.find_procedures(code)
            .iter()
            .find(|info| info.phase == phase && info.covers(date))
    }

    pub fn find_ghm_root(&self, code: GhmRootCode) -> Option<&'a GhmRootInfo> {
        let idx = Self::lookup(&self.set.maps.ghm_roots, self.entry.parts.ghm_root_map, &code)?;
        self.ghm_roots().get(idx)
    }

    /// GHS groups of `ghm`, in table order.
    pub fn find_compatible_ghs(&self, ghm: GhmCode) -> &'a [GhsInfo] {
        let groups = self.ghs();
        let Some(first) = Self::lookup(&self.set.maps.ghs, self.entry.parts.ghs_map, &ghm) else {
            return &[];
        };
        let tail = groups.get(first..).unwrap_or(&[]);
        let len = tail.iter().take_while(|info| info.ghm == ghm).count();
        &tail[..len]
    }

    /// Exclusion bitset of `main`, if its index is valid.
    pub fn exclusion_set(&self, main: &DiagnosisInfo) -> Option<&'a ExclusionInfo> {
        self.exclusions().get(main.exclusion_set_idx)
    }
}
