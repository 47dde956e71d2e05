//! Stay durations that can lead to each GHM of a decision tree.
//!
//! Durations are tracked as a 64-bit mask: bit `n` is set when a stay of
//! `n` nights can reach the GHM.

use std::collections::BTreeMap;

use mco_model::GhmCode;
use mco_tables::{ClassifierIndex, GhmDecisionNode};
use serde::Serialize;
use tracing::{error, warn};

use crate::severity::minimal_duration_for_severity;
use crate::tree::param_u16;

/// Mask of every duration below `days` (`days` < 64).
fn below(days: u16) -> u64 {
    (1u64 << days) - 1
}

/// Durations from which a GHM is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GhmConstraint {
    pub ghm: GhmCode,
    pub duration_mask: u64,
}

impl GhmConstraint {
    /// Reachable durations, shortest first.
    pub fn durations(&self) -> impl Iterator<Item = u32> + '_ {
        (0..64).filter(|&bit| self.duration_mask & (1u64 << bit) != 0)
    }
}

/// Constraints of every reachable GHM.
///
/// When `complete` is false some branches could not be followed, and the
/// masks may miss durations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    pub constraints: BTreeMap<GhmCode, GhmConstraint>,
    pub complete: bool,
}

impl ConstraintSet {
    pub fn get(&self, ghm: GhmCode) -> Option<&GhmConstraint> {
        self.constraints.get(&ghm)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    fn merge(&mut self, ghm: GhmCode, duration_mask: u64) {
        if duration_mask == 0 {
            return;
        }
        self.constraints
            .entry(ghm)
            .and_modify(|constraint| constraint.duration_mask |= duration_mask)
            .or_insert(GhmConstraint { ghm, duration_mask });
    }
}

struct ConstraintWalk<'a, 'b> {
    index: &'b ClassifierIndex<'a>,
    nodes: &'a [GhmDecisionNode],
    out: ConstraintSet,
}

impl ConstraintWalk<'_, '_> {
    /// Expand a leaf into the modes its root policy allows.
    fn merge_leaf(&mut self, ghm: GhmCode, mut mask: u64) {
        let Some(root) = self.index.find_ghm_root(ghm.root) else {
            error!(root = %ghm.root, "unknown GHM root");
            self.out.complete = false;
            return;
        };

        if root.allow_ambulatory {
            self.out.merge(ghm.with_mode(b'J'), mask & 0x1);
            mask &= !0x1;
        }
        if root.short_duration_threshold > 0 {
            let short = below(u16::from(root.short_duration_threshold));
            self.out.merge(ghm.with_mode(b'T'), mask & short);
            mask &= !short;
        }

        match ghm.mode {
            0 => {
                for severity in 0..4 {
                    let minimum = minimal_duration_for_severity(severity) as u16;
                    self.out
                        .merge(ghm.with_mode(b'1' + severity), mask & !below(minimum));
                }
            }
            b'J' | b'T' => {}
            _ => self.out.merge(ghm, mask),
        }
    }

    /// Split `mask` on a duration parameter, or give up on params ≥ 63.
    fn duration_param(&mut self, params: [u8; 2]) -> Option<u16> {
        let param = param_u16(params);
        if param >= 63 {
            warn!(param, "incomplete GHM constraints, duration >= 63 nights");
            self.out.complete = false;
            return None;
        }
        Some(param)
    }

    fn visit(&mut self, depth: usize, node_idx: usize, mask: u64) {
        if depth >= self.nodes.len() {
            error!(nodes = self.nodes.len(), "empty GHM tree or infinite loop");
            self.out.complete = false;
            return;
        }
        let Some(&node) = self.nodes.get(node_idx) else {
            error!(node = node_idx, nodes = self.nodes.len(), "GHM tree node does not exist");
            self.out.complete = false;
            return;
        };

        match node {
            GhmDecisionNode::Leaf { ghm, .. } => self.merge_leaf(ghm, mask),
            GhmDecisionNode::Test {
                function,
                params,
                children_idx,
                children_count,
            } => {
                let split = match function {
                    22 => self.duration_param(params).map(below),
                    29 => self.duration_param(params).map(|param| 1u64 << param),
                    30 if param_u16(params) == 0 => {
                        self.visit(depth + 1, children_idx, mask & 0x1);
                        self.visit(depth + 1, children_idx + 1, mask);
                        return;
                    }
                    30 => {
                        warn!("incomplete GHM constraints, session count != 0");
                        self.out.complete = false;
                        None
                    }
                    _ => None,
                };

                match split {
                    Some(test_mask) => {
                        self.visit(depth + 1, children_idx, mask & !test_mask);
                        self.visit(depth + 1, children_idx + 1, mask & test_mask);
                    }
                    None => {
                        for child in 0..children_count {
                            self.visit(depth + 1, children_idx + child, mask);
                        }
                    }
                }
            }
        }
    }
}

/// Walk the whole tree of `index` and collect the duration constraints of
/// every reachable GHM.
///
/// Tests other than the duration and session tests explore all their
/// children. Problems make the result incomplete but never abort the walk.
pub fn compute_ghm_constraints(index: &ClassifierIndex<'_>) -> ConstraintSet {
    let mut walk = ConstraintWalk {
        index,
        nodes: index.ghm_nodes(),
        out: ConstraintSet {
            constraints: BTreeMap::new(),
            complete: true,
        },
    };
    walk.visit(0, 0, u64::MAX);
    walk.out
}
