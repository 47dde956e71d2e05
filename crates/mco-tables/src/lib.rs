//! Binary reference tables of the MCO GHM grouper.
//!
//! The grouper ships its rules as big-endian `.tab` files. This crate:
//!
//! - decodes table headers and the per-type records ([`header`], [`decode`])
//! - versions decoded tables into disjoint date intervals ([`TableSet`])
//! - exposes each interval as a read-only [`ClassifierIndex`]
//! - encodes tables back to the file format ([`writer`]), mostly for fixtures
//!
//! # Example
//!
//! ```no_run
//! use mco_model::Date;
//! use mco_tables::load_table_set;
//!
//! let load = load_table_set(&["tables/"]);
//! for error in &load.errors {
//!     eprintln!("{error}");
//! }
//! let date = Date::parse("2016-06-01").unwrap();
//! if let Some(index) = load.set.find_index(Some(date)) {
//!     println!("{} diagnoses", index.diagnoses().len());
//! }
//! ```

mod bytes;
pub mod decode;
mod error;
mod guard;
pub mod header;
mod index;
mod loader;
mod table_set;
pub mod types;
pub mod writer;

pub use bytes::{BigEndian, ByteReader, read_be};
pub use error::{Result, TableError};
pub use guard::AppendGuard;
pub use index::ClassifierIndex;
pub use loader::{
    MAX_TABLE_FILE_SIZE, TABLE_EXTENSION, list_table_files, load_table_set, read_table_file,
};
pub use table_set::{
    ActiveTables, IndexPlan, TableFile, TableSet, TableSetBuilder, TableSetLoad, plan_indexes,
};
pub use types::{
    AuthorizationInfo, AuthorizationScope, BitMask, DiagnosisAttributes, DiagnosisInfo,
    ExclusionInfo, GhmDecisionNode, GhmRootInfo, GhsInfo, ProcedureInfo, SectionInfo, SrcPair,
    TableInfo, TableType, ValueRange, ValueRangeCell, find_cell,
};
