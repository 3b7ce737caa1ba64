//! Long-format table of per-sample proportions.

use crate::error::{MicroshadesError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One sample × taxon row of a prepared table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRecord {
    pub sample_id: String,
    /// Lineage truncated to the aggregation rank.
    pub lineage: Vec<Option<String>>,
    /// Share of the sample's total abundance, in [0, 1].
    pub proportion: f64,
}

/// Output of [`prepare`](crate::prepare::prepare): one row per sample and
/// aggregated taxon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedTable {
    /// Rank names from the broadest down to the aggregation rank.
    pub(crate) ranks: Vec<String>,
    pub(crate) sample_ids: Vec<String>,
    pub(crate) records: Vec<PreparedRecord>,
}

impl PreparedTable {
    /// Assemble a prepared table directly, e.g. from proportions computed
    /// elsewhere.
    pub fn new(ranks: Vec<String>, sample_ids: Vec<String>, records: Vec<PreparedRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(sample_ids.len());
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Sample '{}' appears more than once in the sample order",
                    id
                )));
            }
        }
        for record in &records {
            if record.lineage.len() != ranks.len() {
                return Err(MicroshadesError::DimensionMismatch {
                    expected: ranks.len(),
                    actual: record.lineage.len(),
                });
            }
            if !(0.0..=1.0).contains(&record.proportion) {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Proportion {} for sample '{}' is outside [0, 1]",
                    record.proportion, record.sample_id
                )));
            }
            if !sample_ids.contains(&record.sample_id) {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Sample '{}' is not listed in the sample order",
                    record.sample_id
                )));
            }
        }
        Ok(Self {
            ranks,
            sample_ids,
            records,
        })
    }

    /// Rank names, broadest first.
    pub fn ranks(&self) -> &[String] {
        &self.ranks
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn records(&self) -> &[PreparedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a rank column, failing with `MissingColumn`.
    pub fn field_index(&self, field: &str) -> Result<usize> {
        self.ranks
            .iter()
            .position(|r| r == field)
            .ok_or_else(|| MicroshadesError::MissingColumn(field.to_string()))
    }

    /// Sum of proportions per sample, in sample order.
    pub fn sample_totals(&self) -> Vec<(String, f64)> {
        self.sample_ids
            .iter()
            .map(|sid| {
                let total = self
                    .records
                    .iter()
                    .filter(|r| &r.sample_id == sid)
                    .map(|r| r.proportion)
                    .sum();
                (sid.clone(), total)
            })
            .collect()
    }
}
