//! GHM classification of MCO hospital stays.
//!
//! Classification runs per cluster of stay records:
//!
//! 1. [`clusters`] groups consecutive records ([`ClusterMode`])
//! 2. [`aggregate`] merges a cluster and picks its table index
//! 3. [`check_diagnoses`] and [`check_procedures`] validate the coding
//! 4. [`run_ghm_tree`] walks the decision tree to a GHM, which
//!    [`check_ghm_errors`] and [`check_confirmation`] then vet
//! 5. [`run_ghm_severity`] resolves the severity mode
//! 6. [`classify_ghs`] picks the GHS
//!
//! [`classify`] runs the whole sequence over a stay list.
//! [`compute_ghm_constraints`] walks a tree without stays and reports which
//! durations lead to each GHM.
//!
//! # Example
//!
//! ```no_run
//! use mco_classifier::{AuthorizationSet, ClusterMode, classify};
//! use mco_tables::load_table_set;
//!
//! # fn stays() -> Vec<mco_model::Stay> { Vec::new() }
//! let load = load_table_set(&["tables/"]);
//! let results = classify(&load.set, &AuthorizationSet::default(), &stays(), ClusterMode::StayModes);
//! for result in &results {
//!     println!("{} {} {}", result.stay_id, result.ghm, result.ghs);
//! }
//! ```

mod aggregate;
mod cluster;
mod constraints;
mod driver;
mod error;
mod error_set;
mod ghs;
mod lookup;
mod main_stay;
mod severity;
mod tree;
mod validation;

pub use aggregate::{StayAggregate, aggregate, check_stays};
pub use cluster::{ClusterMode, Clusters, clusters, split_cluster};
pub use constraints::{ConstraintSet, GhmConstraint, compute_ghm_constraints};
pub use driver::{ClassifyResult, classify, classify_cluster, classify_ghm};
pub use error::{AuthorizationError, ClassifyFailure, Result};
pub use error_set::ErrorSet;
pub use ghs::{Authorization, AuthorizationSet, AuthorizedUnit, classify_ghs};
pub use main_stay::find_main_stay;
pub use severity::{limit_severity_with_duration, minimal_duration_for_severity, run_ghm_severity};
pub use tree::run_ghm_tree;
pub use validation::{check_confirmation, check_diagnoses, check_ghm_errors, check_procedures};
