//! GHM decision tree interpreter.
//!
//! The walk starts at node 0. Each test node runs one test function whose
//! integer result selects a child; the first leaf reached gives the GHM.

use mco_model::{DiagnosisCode, GhmCode};
use mco_tables::{BitMask, GhmDecisionNode, find_cell};
use tracing::trace;

use crate::aggregate::StayAggregate;
use crate::error::{ClassifyFailure, Result};
use crate::error_set::ErrorSet;
use crate::lookup::{diagnosis_byte, test_diagnosis, test_procedure};

/// Big-endian `u16` made of the two test parameters.
pub(crate) fn param_u16(params: [u8; 2]) -> u16 {
    u16::from_be_bytes(params)
}

/// Gestational age used for the newborn grid when none was coded.
const UNKNOWN_GESTATIONAL_AGE: i32 = 99;

/// Mutable state of one walk.
struct TreeContext<'a, 'b> {
    agg: &'b StayAggregate<'a>,
    /// Working diagnoses, swapped by the DP/DR test.
    main_diagnosis: Option<DiagnosisCode>,
    linked_diagnosis: Option<DiagnosisCode>,
    /// Newborn classification, computed on demand.
    gnn: u16,
}

impl<'a, 'b> TreeContext<'a, 'b> {
    fn new(agg: &'b StayAggregate<'a>) -> Self {
        Self {
            agg,
            main_diagnosis: agg.stay.main_diagnosis,
            linked_diagnosis: agg.stay.linked_diagnosis,
            gnn: 0,
        }
    }

    fn byte(&self, code: Option<DiagnosisCode>, offset: u8) -> u8 {
        diagnosis_byte(&self.agg.index, self.agg.stay.sex, code, usize::from(offset))
    }

    fn diagnosis_matches(&self, code: DiagnosisCode, params: [u8; 2]) -> bool {
        test_diagnosis(
            &self.agg.index,
            self.agg.stay.sex,
            Some(code),
            BitMask::new(usize::from(params[0]), params[1]),
        )
    }

    fn any_diagnosis(&self, params: [u8; 2], skip: impl Fn(DiagnosisCode) -> bool) -> bool {
        self.agg
            .diagnoses
            .iter()
            .any(|&code| !skip(code) && self.diagnosis_matches(code, params))
    }

    /// Any diagnosis whose CMD and jump equal the parameters; unknown codes
    /// are skipped.
    fn any_cmd_jump(&self, params: [u8; 2], skip: impl Fn(DiagnosisCode) -> bool) -> bool {
        self.agg.diagnoses.iter().any(|&code| {
            !skip(code)
                && self.agg.index.find_diagnosis(code).is_some_and(|info| {
                    let attributes = info.attributes(self.agg.stay.sex);
                    attributes.cmd == params[0] && attributes.jump == params[1]
                })
        })
    }

    fn procedure_mask(params: [u8; 2]) -> BitMask {
        BitMask::new(usize::from(params[0]), params[1])
    }

    fn is_main_or_linked(&self, code: DiagnosisCode) -> bool {
        Some(code) == self.main_diagnosis || Some(code) == self.linked_diagnosis
    }

    fn swap_main_and_linked(&mut self) {
        let Some(linked) = self.linked_diagnosis else {
            return;
        };
        if Some(linked) != self.agg.stay.linked_diagnosis {
            return;
        }
        let Some(info) = self.agg.index.find_diagnosis(linked) else {
            return;
        };
        let attributes = info.attributes(self.agg.stay.sex);
        if attributes.cmd != 0 || attributes.jump != 3 {
            std::mem::swap(&mut self.main_diagnosis, &mut self.linked_diagnosis);
        }
    }

    fn compute_gnn(&mut self) {
        if self.gnn != 0 {
            return;
        }
        let gestational_age = match self.agg.stay.gestational_age {
            0 => UNKNOWN_GESTATIONAL_AGE,
            age => i32::from(age),
        };
        let values = [i32::from(self.agg.stay.newborn_weight), gestational_age];
        if let Some(gnn) = find_cell(self.agg.index.gnn_cells(), values) {
            self.gnn = gnn;
        }
    }

    /// Run test `function`; the result is the child offset to follow.
    fn execute(
        &mut self,
        function: u8,
        params: [u8; 2],
        node: usize,
        errors: &mut ErrorSet,
    ) -> Result<i32> {
        let agg = self.agg;
        let stay = &agg.stay;
        let index = &agg.index;
        let proc_mask = Self::procedure_mask(params);

        let result = match function {
            0 | 1 => i32::from(self.byte(self.main_diagnosis, params[0])),
            2 => i32::from(
                agg.procedures
                    .iter()
                    .any(|proc| test_procedure(index, proc, proc_mask)),
            ),
            3 => {
                let age = if params[1] == 1 {
                    agg.age_in_days()
                } else {
                    agg.age
                };
                i32::from(age > i32::from(params[0]))
            }
            5 => i32::from(self.byte(self.main_diagnosis, params[0]) & params[1] != 0),
            6 => i32::from(self.any_diagnosis(params, |code| self.is_main_or_linked(code))),
            7 => i32::from(self.any_diagnosis(params, |_| false)),
            9 => {
                let mut result = 0;
                for proc in &agg.procedures {
                    if test_procedure(index, proc, BitMask::new(0, 0x80)) {
                        if !test_procedure(index, proc, proc_mask) {
                            return Ok(0);
                        }
                        result = 1;
                    }
                }
                result
            }
            10 => {
                let matches = agg
                    .procedures
                    .iter()
                    .filter(|proc| test_procedure(index, proc, proc_mask))
                    .take(2)
                    .count();
                i32::from(matches >= 2)
            }
            13 => i32::from(self.byte(self.main_diagnosis, params[0]) == params[1]),
            14 => i32::from(i32::from(stay.sex.code()) - 1 == i32::from(params[0]) - 49),
            18 => {
                let (mut matches, mut special_matches) = (0, 0);
                let mut result = 0;
                for &code in &agg.diagnoses {
                    if self.diagnosis_matches(code, params) {
                        matches += 1;
                        if self.is_main_or_linked(code) {
                            special_matches += 1;
                        }
                        if matches >= 2 && matches > special_matches {
                            result = 1;
                            break;
                        }
                    }
                }
                result
            }
            19 => {
                let value = match params[1] {
                    0 => stay.exit.mode,
                    1 => stay.exit.destination,
                    2 => stay.entry.mode,
                    3 => stay.entry.origin,
                    _ => return Err(ClassifyFailure::UnknownTest { function, node }),
                };
                i32::from(value == params[0])
            }
            20 => 0,
            22 => i32::from(agg.duration < i32::from(param_u16(params))),
            26 => {
                // Working copy, which test 34 may have swapped with the main.
                let tested = stay.linked_diagnosis.and(self.linked_diagnosis);
                i32::from(self.byte(tested, params[0]) & params[1] != 0)
            }
            28 => {
                errors.record(u16::from(params[0]));
                0
            }
            29 => i32::from(agg.duration == i32::from(param_u16(params))),
            30 => i32::from(stay.session_count == param_u16(params)),
            33 => {
                let bit = 1u8.checked_shl(u32::from(params[0])).unwrap_or(0);
                i32::from(agg.procedures.iter().any(|proc| proc.activities & bit != 0))
            }
            34 => {
                self.swap_main_and_linked();
                0
            }
            35 => i32::from(self.main_diagnosis != stay.main_diagnosis),
            36 => {
                let linked = self.linked_diagnosis;
                i32::from(self.any_diagnosis(params, |code| Some(code) == linked))
            }
            38 => i32::from(
                self.gnn >= u16::from(params[0]) && self.gnn <= u16::from(params[1]),
            ),
            39 => {
                self.compute_gnn();
                0
            }
            41 => i32::from(self.any_cmd_jump(params, |_| false)),
            42 => {
                let weight = stay.newborn_weight;
                i32::from(weight != 0 && weight < param_u16(params))
            }
            43 => {
                let linked = self.linked_diagnosis;
                i32::from(self.any_cmd_jump(params, |code| Some(code) == linked))
            }
            _ => return Err(ClassifyFailure::UnknownTest { function, node }),
        };
        Ok(result)
    }
}

/// Walk the decision tree of the aggregate's index.
///
/// Errors raised by leaves and by test 28 go to `errors` and do not stop
/// the walk. The walk visits at most as many nodes as the tree holds.
pub fn run_ghm_tree(agg: &StayAggregate<'_>, errors: &mut ErrorSet) -> Result<GhmCode> {
    let nodes = agg.index.ghm_nodes();
    let mut ctx = TreeContext::new(agg);
    let mut node_idx = 0;

    for _ in 0..nodes.len() {
        let node = nodes
            .get(node_idx)
            .ok_or(ClassifyFailure::NodeOutOfRange {
                node: node_idx,
                nodes: nodes.len(),
            })?;

        match *node {
            GhmDecisionNode::Test {
                function,
                params,
                children_idx,
                children_count,
            } => {
                let result = ctx.execute(function, params, node_idx, errors)?;
                let child = usize::try_from(result)
                    .ok()
                    .filter(|&child| child < children_count)
                    .ok_or(ClassifyFailure::InvalidTestResult {
                        function,
                        node: node_idx,
                        result,
                        children: children_count,
                    })?;
                trace!(node = node_idx, function, result, "tree test");
                node_idx = children_idx + child;
            }
            GhmDecisionNode::Leaf { ghm, error } => {
                if error != 0 {
                    errors.record(u16::from(error));
                }
                return Ok(ghm);
            }
        }
    }

    Err(ClassifyFailure::IterationCap { nodes: nodes.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_u16_is_big_endian() {
        assert_eq!(param_u16([0, 2]), 2);
        assert_eq!(param_u16([1, 4]), 260);
    }
}
