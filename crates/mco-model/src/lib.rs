//! Core value types for the MCO GHM grouper.
//!
//! - [`Date`]: calendar dates with the day-count encoding used on disk
//! - code values: [`DiagnosisCode`], [`ProcedureCode`], [`GhmRootCode`],
//!   [`GhmCode`], [`GhsCode`]
//! - [`Stay`]: one hospital stay record and its procedures

pub mod codes;
pub mod date;
pub mod error;
pub mod stay;

pub use codes::{DiagnosisCode, GhmCode, GhmRootCode, GhsCode, ProcedureCode, Sex};
pub use date::Date;
pub use error::{ModelError, Result};
pub use stay::{
    EXIT_MODE_DEATH, EXIT_MODE_TRANSFER, ProcedureRealisation, Stay, StayEntry, StayExit,
};
