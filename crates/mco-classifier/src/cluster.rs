//! Grouping consecutive stay records into clusters classified together.

use std::fmt;
use std::str::FromStr;

use mco_model::{EXIT_MODE_TRANSFER, Stay};

/// How consecutive records are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterMode {
    /// Same stay id, chained through internal transfers.
    #[default]
    StayModes,
    /// Same bill id.
    BillId,
    /// Every record alone.
    Disable,
}

impl ClusterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ClusterMode::StayModes => "stay-modes",
            ClusterMode::BillId => "bill-id",
            ClusterMode::Disable => "disable",
        }
    }

    /// True if `next` continues the cluster ending with `prev`.
    pub fn chains(self, prev: &Stay, next: &Stay) -> bool {
        match self {
            ClusterMode::StayModes => {
                prev.session_count == 0
                    && next.session_count == 0
                    && next.stay_id == prev.stay_id
                    && matches!(prev.exit.mode, 0 | EXIT_MODE_TRANSFER)
            }
            ClusterMode::BillId => next.bill_id == prev.bill_id,
            ClusterMode::Disable => false,
        }
    }
}

impl fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "stay-modes" => Ok(ClusterMode::StayModes),
            "bill-id" => Ok(ClusterMode::BillId),
            "disable" => Ok(ClusterMode::Disable),
            other => Err(format!("unknown cluster mode '{other}'")),
        }
    }
}

/// Split the leading cluster off `stays`; returns `(cluster, remainder)`.
pub fn split_cluster(stays: &[Stay], mode: ClusterMode) -> (&[Stay], &[Stay]) {
    let len = if stays.is_empty() {
        0
    } else {
        1 + stays
            .windows(2)
            .take_while(|pair| mode.chains(&pair[0], &pair[1]))
            .count()
    };
    stays.split_at(len)
}

/// Iterator over the clusters of a stay list, in input order.
#[derive(Debug, Clone)]
pub struct Clusters<'a> {
    remainder: &'a [Stay],
    mode: ClusterMode,
}

impl<'a> Iterator for Clusters<'a> {
    type Item = &'a [Stay];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remainder.is_empty() {
            return None;
        }
        let (cluster, remainder) = split_cluster(self.remainder, self.mode);
        self.remainder = remainder;
        Some(cluster)
    }
}

pub fn clusters(stays: &[Stay], mode: ClusterMode) -> Clusters<'_> {
    Clusters {
        remainder: stays,
        mode,
    }
}
