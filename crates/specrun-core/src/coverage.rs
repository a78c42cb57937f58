//! Plan coverage: which stored cases a plan runs, misses, or repeats.
//!
//! A plan is executed verbatim. The delta is only reported.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::ExecutionPlanItem;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageDelta {
    /// Stored case ids the plan never references
    pub missing: Vec<u64>,
    /// Case ids referenced more than once
    pub duplicated: Vec<u64>,
    /// Referenced ids not among the stored cases
    pub unknown: Vec<u64>,
}

impl CoverageDelta {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty() && self.unknown.is_empty()
    }

    /// One warning line per non-empty category.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.missing.is_empty() {
            out.push(format!("plan does not reference cases {}", id_list(&self.missing)));
        }
        if !self.duplicated.is_empty() {
            out.push(format!(
                "plan references cases more than once: {}",
                id_list(&self.duplicated)
            ));
        }
        if !self.unknown.is_empty() {
            out.push(format!("plan references unknown cases {}", id_list(&self.unknown)));
        }
        out
    }
}

/// Compare the `TestCaseRef`s of `plan` with the stored case ids.
///
/// `EndpointRef` items are setup steps and do not count.
#[must_use]
pub fn coverage_delta(plan: &[ExecutionPlanItem], stored: &[u64]) -> CoverageDelta {
    let stored: BTreeSet<u64> = stored.iter().copied().collect();
    let mut seen: BTreeMap<u64, usize> = BTreeMap::new();
    for item in plan {
        if let ExecutionPlanItem::TestCaseRef(id) = item {
            *seen.entry(*id).or_default() += 1;
        }
    }

    CoverageDelta {
        missing: stored
            .iter()
            .filter(|id| !seen.contains_key(id))
            .copied()
            .collect(),
        duplicated: seen
            .iter()
            .filter(|(_, n)| **n > 1)
            .map(|(id, _)| *id)
            .collect(),
        unknown: seen
            .keys()
            .filter(|id| !stored.contains(id))
            .copied()
            .collect(),
    }
}

fn id_list(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
