//! Classification of a whole stay list, cluster by cluster.

use mco_model::{Date, GhmCode, GhsCode, Stay};
use mco_tables::TableSet;
use serde::Serialize;
use tracing::{debug, error};

use crate::aggregate::{StayAggregate, aggregate, check_stays};
use crate::cluster::{ClusterMode, clusters};
use crate::error::{ClassifyFailure, Result};
use crate::error_set::ErrorSet;
use crate::ghs::{AuthorizationSet, classify_ghs};
use crate::severity::run_ghm_severity;
use crate::tree::run_ghm_tree;
use crate::validation::{check_confirmation, check_diagnoses, check_ghm_errors, check_procedures};

/// Outcome of one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifyResult {
    /// Stay id of the first record.
    pub stay_id: u32,
    pub cluster_len: usize,
    pub ghm: GhmCode,
    pub ghs: GhsCode,
    pub main_error: Option<u16>,
    /// Every error code raised, ascending.
    pub errors: Vec<u16>,
    pub duration: i32,
    pub age: i32,
    /// Validity interval of the table index used, if any.
    pub index_start: Option<Date>,
    pub index_end: Option<Date>,
}

impl ClassifyResult {
    pub fn is_error(&self) -> bool {
        self.ghm.is_error()
    }
}

/// Record a failed step and return its error GHM.
fn fail(stay_id: u32, failure: &ClassifyFailure, errors: &mut ErrorSet) -> GhmCode {
    error!(
        stay_id,
        function = failure.function(),
        node = failure.node(),
        %failure,
        "classification failed"
    );
    let (category, code) = failure.error_code();
    errors.set(category, code)
}

fn resolve_ghm(agg: &StayAggregate<'_>, errors: &mut ErrorSet) -> Result<GhmCode> {
    let ghm = run_ghm_tree(agg, errors)?;
    let root = agg
        .index
        .find_ghm_root(ghm.root)
        .ok_or(ClassifyFailure::UnknownGhmRoot { root: ghm.root })?;
    if !check_ghm_errors(agg, ghm, errors) || !check_confirmation(agg, ghm, root, errors) {
        return Ok(GhmCode::INVALID_STAY);
    }
    run_ghm_severity(agg, ghm)
}

/// Tree walk, GHM checks, then severity resolution.
pub fn classify_ghm(agg: &StayAggregate<'_>, errors: &mut ErrorSet) -> GhmCode {
    resolve_ghm(agg, errors).unwrap_or_else(|failure| fail(agg.stay.stay_id, &failure, errors))
}

/// Classify the records of one cluster.
pub fn classify_cluster(
    set: &TableSet,
    authorizations: &AuthorizationSet,
    cluster: &[Stay],
) -> ClassifyResult {
    let stay_id = cluster.first().map_or(0, |stay| stay.stay_id);
    let mut errors = ErrorSet::new();

    let agg = match aggregate(set, cluster) {
        Ok(agg) => agg,
        Err(failure) => {
            let ghm = fail(stay_id, &failure, &mut errors);
            return ClassifyResult {
                stay_id,
                cluster_len: cluster.len(),
                ghm,
                ghs: GhsCode::NONE,
                main_error: errors.main_error(),
                errors: errors.to_vec(),
                duration: cluster.iter().map(Stay::duration).sum(),
                age: 0,
                index_start: None,
                index_end: None,
            };
        }
    };

    let valid = check_stays(cluster, &mut errors)
        & check_diagnoses(&agg, &mut errors)
        & check_procedures(&agg, &mut errors);
    let ghm = if valid {
        classify_ghm(&agg, &mut errors)
    } else {
        GhmCode::INVALID_STAY
    };
    let ghs = classify_ghs(&agg, authorizations, ghm);
    debug!(stay_id, %ghm, ghs = ghs.0, "classified cluster");

    ClassifyResult {
        stay_id,
        cluster_len: cluster.len(),
        ghm,
        ghs,
        main_error: errors.main_error(),
        errors: errors.to_vec(),
        duration: agg.duration,
        age: agg.age,
        index_start: Some(agg.index.start()),
        index_end: Some(agg.index.end()),
    }
}

/// Cluster `stays` with `mode` and classify every cluster, in input order.
///
/// A failing cluster gets an error GHM; the others are unaffected.
pub fn classify(
    set: &TableSet,
    authorizations: &AuthorizationSet,
    stays: &[Stay],
    mode: ClusterMode,
) -> Vec<ClassifyResult> {
    clusters(stays, mode)
        .map(|cluster| classify_cluster(set, authorizations, cluster))
        .collect()
}
