//! Feature → lineage lookup table.

use super::parse_label;
use crate::error::{MicroshadesError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Taxonomic lineage for each feature of a [`CountMatrix`](super::CountMatrix).
///
/// Ranks are ordered from the broadest (e.g. Kingdom) to the most
/// specific (e.g. Species).
#[derive(Debug, Clone)]
pub struct Taxonomy {
    ranks: Vec<String>,
    lineages: HashMap<String, Vec<Option<String>>>,
}

impl Taxonomy {
    /// Build a taxonomy from `(feature_id, lineage)` pairs.
    pub fn new(ranks: Vec<String>, entries: Vec<(String, Vec<Option<String>>)>) -> Result<Self> {
        if ranks.is_empty() {
            return Err(MicroshadesError::InvalidInput(
                "Taxonomy must have at least one rank".to_string(),
            ));
        }
        let mut lineages = HashMap::with_capacity(entries.len());
        for (feature_id, lineage) in entries {
            if lineage.len() != ranks.len() {
                return Err(MicroshadesError::DimensionMismatch {
                    expected: ranks.len(),
                    actual: lineage.len(),
                });
            }
            if lineages.insert(feature_id.clone(), lineage).is_some() {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Duplicate feature '{}' in taxonomy",
                    feature_id
                )));
            }
        }
        Ok(Self { ranks, lineages })
    }

    /// Load a taxonomy table from a TSV file.
    ///
    /// Expected format: a header `feature_id<TAB>Kingdom<TAB>...` followed
    /// by one row per feature. Empty cells and `NA` are missing labels.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)?;
        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(MicroshadesError::InvalidInput(
                "Taxonomy must have at least one rank column".to_string(),
            ));
        }
        let ranks: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let feature_id = match record.get(0) {
                Some(id) if !id.trim().is_empty() => id.trim().to_string(),
                _ => continue,
            };
            let lineage: Vec<Option<String>> = (1..=ranks.len())
                .map(|i| record.get(i).and_then(parse_label))
                .collect();
            entries.push((feature_id, lineage));
        }

        Self::new(ranks, entries)
    }

    /// Rank names, broadest first.
    pub fn ranks(&self) -> &[String] {
        &self.ranks
    }

    /// Lineage of a feature.
    pub fn lineage(&self, feature_id: &str) -> Option<&[Option<String>]> {
        self.lineages.get(feature_id).map(Vec::as_slice)
    }

    pub fn n_features(&self) -> usize {
        self.lineages.len()
    }
}
