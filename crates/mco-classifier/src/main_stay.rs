//! Choice of the record whose main and linked diagnoses represent a cluster.

use mco_model::{DiagnosisCode, Stay};
use mco_tables::{BitMask, ClassifierIndex, ProcedureInfo};

use crate::lookup::test_diagnosis;

/// Main diagnoses marking a stay dedicated to a session-like treatment.
const ZX_PREFIXES: [&str; 3] = ["Z515", "Z502", "Z503"];

const TRAUMA_MASK: BitMask = BitMask::new(21, 0x04);
const SCORE_PENALTY_MASK: BitMask = BitMask::new(21, 0x20);
const SCORE_EXCLUSION_MASK: BitMask = BitMask::new(21, 0x02);

/// Major act that is not exempt from main-stay selection.
fn is_deciding_act(info: &ProcedureInfo) -> bool {
    info.byte(0) & 0x80 != 0 && info.byte(23) & 0x80 == 0
}

/// Procedure priority tier (0 to 3); tiers 1 and 2 depend on the total
/// duration of the cluster.
fn procedure_tier(info: &ProcedureInfo, cluster_duration: i32) -> u8 {
    if info.byte(38) & 0x02 != 0 {
        3
    } else if cluster_duration <= 1 && info.byte(39) & 0x80 != 0 {
        2
    } else if cluster_duration == 0 && info.byte(39) & 0x40 != 0 {
        1
    } else {
        0
    }
}

fn is_zx(code: Option<DiagnosisCode>) -> bool {
    code.is_some_and(|code| ZX_PREFIXES.iter().any(|prefix| code.starts_with(prefix)))
}

/// Pick the main record of a multi-record cluster.
///
/// Candidates, from strongest to weakest:
///
/// 1. the first record with a deciding act;
/// 2. the longest `Z515`/`Z502`/`Z503` record, unless a longer or equal
///    record with another main diagnosis follows it;
/// 3. the first record with the highest procedure tier;
/// 4. the longest record among the leading trauma records;
/// 5. the record with the lowest score, first on ties.
///
/// Returns `None` only for an empty slice.
pub fn find_main_stay<'a>(
    index: &ClassifierIndex<'_>,
    stays: &'a [Stay],
    cluster_duration: i32,
) -> Option<&'a Stay> {
    let mut max_duration = -1;
    let mut priority: Option<(u8, &Stay)> = None;
    let mut zx: Option<&Stay> = None;
    let mut zx_duration = -1;
    let mut trauma: Option<&Stay> = None;
    let mut ignore_trauma = false;
    let mut best_score: Option<(i32, &Stay)> = None;
    let mut base_score = 0;

    for stay in stays {
        let stay_duration = stay.duration();

        let mut tier = 0;
        for proc in &stay.procedures {
            let Some(info) = index.find_procedure(proc.code, proc.phase, proc.date) else {
                continue;
            };
            if is_deciding_act(info) {
                return Some(stay);
            }
            tier = tier.max(procedure_tier(info, cluster_duration));
        }
        if tier > priority.map_or(0, |(best, _)| best) {
            priority = Some((tier, stay));
        }

        if stay_duration > zx_duration && stay_duration >= max_duration {
            if is_zx(stay.main_diagnosis) {
                zx = Some(stay);
                zx_duration = stay_duration;
            } else {
                zx = None;
            }
        }

        if !ignore_trauma {
            if test_diagnosis(index, stay.sex, stay.main_diagnosis, TRAUMA_MASK) {
                if stay_duration > max_duration {
                    trauma = Some(stay);
                }
            } else {
                ignore_trauma = true;
            }
        }

        let mut score = base_score;
        if test_diagnosis(index, stay.sex, stay.main_diagnosis, SCORE_PENALTY_MASK) {
            score += 150;
        } else if stay_duration >= 2 {
            base_score += 100;
        }
        match stay_duration {
            0 => score += 2,
            1 => score += 1,
            _ => {}
        }
        if test_diagnosis(index, stay.sex, stay.main_diagnosis, SCORE_EXCLUSION_MASK) {
            score += 201;
        }
        if best_score.is_none_or(|(best, _)| score < best) {
            best_score = Some((score, stay));
        }

        max_duration = max_duration.max(stay_duration);
    }

    zx.or(priority.map(|(_, stay)| stay))
        .or(trauma)
        .or(best_score.map(|(_, stay)| stay))
}
