//! Library side of the `mco` command-line grouper: logging setup, JSON stay
//! ingestion and result rendering.

pub mod logging;
pub mod stays;
pub mod summary;
