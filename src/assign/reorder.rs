//! Sample axis ordering.

use super::{ColorAssignment, PlotData, OTHER};
use crate::error::{MicroshadesError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A displayed (group, subgroup) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgroupRef {
    pub group: String,
    pub subgroup: String,
}

impl SubgroupRef {
    pub fn new(group: &str, subgroup: &str) -> Self {
        Self {
            group: group.to_string(),
            subgroup: subgroup.to_string(),
        }
    }
}

/// Options for [`reorder_samples`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderOptions {
    /// Pair to sort by; the most abundant non-`Other` entry if unset.
    pub by: Option<SubgroupRef>,
    pub descending: bool,
    /// Also restack groups by descending total abundance.
    pub sink_abundant_groups: bool,
}

impl Default for ReorderOptions {
    fn default() -> Self {
        Self {
            by: None,
            descending: true,
            sink_abundant_groups: false,
        }
    }
}

impl ReorderOptions {
    pub fn by(mut self, group: &str, subgroup: &str) -> Self {
        self.by = Some(SubgroupRef::new(group, subgroup));
        self
    }

    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }
}

fn resolve_target(plot: &PlotData, options: &ReorderOptions) -> Result<SubgroupRef> {
    match &options.by {
        Some(target) => {
            if plot.colors.lookup(&target.group, &target.subgroup).is_none() {
                return Err(MicroshadesError::InvalidInput(format!(
                    "No color entry for '{}' / '{}'",
                    target.group, target.subgroup
                )));
            }
            Ok(target.clone())
        }
        None => plot
            .colors
            .entries
            .iter()
            .filter(|e| e.group != OTHER)
            .fold(None, |best: Option<&ColorAssignment>, e| match best {
                Some(b) if b.total >= e.total => Some(b),
                _ => Some(e),
            })
            .map(|e| SubgroupRef::new(&e.group, &e.subgroup))
            .ok_or_else(|| {
                MicroshadesError::InvalidInput("No selected subgroup to order samples by".to_string())
            }),
    }
}

/// Samples with their sort value, in the order [`reorder_samples`] uses.
///
/// The value is the sample's summed proportion of the target pair, 0 when
/// the pair does not occur in it. Ties keep the current sample order.
pub fn sample_ordering(plot: &PlotData, options: &ReorderOptions) -> Result<Vec<(String, f64)>> {
    let target = resolve_target(plot, options)?;

    let mut values: HashMap<&str, f64> = HashMap::new();
    for record in plot
        .data
        .records
        .iter()
        .filter(|r| r.group == target.group && r.subgroup == target.subgroup)
    {
        *values.entry(record.sample_id.as_str()).or_insert(0.0) += record.proportion;
    }

    let mut ordering: Vec<(String, f64)> = plot
        .data
        .sample_ids
        .iter()
        .map(|s| (s.clone(), values.get(s.as_str()).copied().unwrap_or(0.0)))
        .collect();
    ordering.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if options.descending {
            ord.reverse()
        } else {
            ord
        }
    });

    debug!(
        "Ordered {} samples by '{}' / '{}'",
        ordering.len(),
        target.group,
        target.subgroup
    );
    Ok(ordering)
}

/// Reorder the sample axis by the abundance of one subgroup.
///
/// Proportions and colors are untouched; only the sample order (and, with
/// `sink_abundant_groups`, the group stacking order) changes.
///
/// # Errors
/// `InvalidInput` if `by` names a pair missing from the color table, or if
/// no selected group is present to pick a default from.
pub fn reorder_samples(plot: &PlotData, options: &ReorderOptions) -> Result<PlotData> {
    let ordering = sample_ordering(plot, options)?;

    let mut reordered = plot.clone();
    reordered.data.sample_ids = ordering.into_iter().map(|(s, _)| s).collect();

    if options.sink_abundant_groups {
        let mut totals: Vec<(String, f64)> = Vec::new();
        for group in plot.colors.groups() {
            if group == OTHER {
                continue;
            }
            let total = plot
                .colors
                .entries
                .iter()
                .filter(|e| e.group == group)
                .map(|e| e.total)
                .sum();
            totals.push((group.to_string(), total));
        }
        totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        let order: HashMap<&str, usize> = totals
            .iter()
            .enumerate()
            .map(|(k, (g, _))| (g.as_str(), k))
            .collect();
        for entry in reordered.colors.entries.iter_mut() {
            entry.group_order = order.get(entry.group.as_str()).copied().unwrap_or(totals.len());
        }
    }

    Ok(reordered)
}
