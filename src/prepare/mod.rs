//! Reshape raw abundance tables into per-sample proportions.
//!
//! [`prepare`] aggregates observations to one taxonomic rank, scales every
//! sample to proportions and emits the long-format [`PreparedTable`] the
//! color assigner consumes.

mod relative;

pub use relative::{relative_abundance, ProportionMatrix};

use crate::data::{AbundanceTable, CountMatrix, PreparedRecord, PreparedTable};
use crate::error::{MicroshadesError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options for [`prepare`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareOptions {
    /// Rank to aggregate to; the deepest rank of the schema when `None`.
    pub rank: Option<String>,
    /// Drop rows whose label at the aggregation rank is missing.
    pub remove_na: bool,
    /// Drop rows with a zero proportion.
    pub remove_zero: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            rank: None,
            remove_na: true,
            remove_zero: true,
        }
    }
}

impl PrepareOptions {
    /// Aggregate to `rank` with the default filters.
    pub fn at_rank(rank: &str) -> Self {
        Self {
            rank: Some(rank.to_string()),
            ..Self::default()
        }
    }
}

/// Aggregate, normalize and filter an abundance table.
///
/// Proportions are computed before missing-label rows are dropped, so a
/// sample's proportions sum to 1 when `remove_na` is off and to at most 1
/// otherwise.
///
/// # Errors
/// - `InvalidInput` if the table is empty, the rank is not in the schema,
///   or a sample's total abundance is zero.
pub fn prepare(table: &AbundanceTable, options: &PrepareOptions) -> Result<PreparedTable> {
    if table.n_records() == 0 {
        return Err(MicroshadesError::InvalidInput(
            "Abundance table has no records".to_string(),
        ));
    }
    let rank_idx = match &options.rank {
        Some(rank) => table.rank_index(rank)?,
        None => table.ranks().len() - 1,
    };

    let (counts, lineages) = aggregate(table, rank_idx)?;
    let props = relative_abundance(&counts)?;
    debug!(
        "Aggregated {} records to {} taxa at rank '{}' across {} samples",
        table.n_records(),
        counts.n_features(),
        table.ranks()[rank_idx],
        counts.n_samples()
    );

    let mut records = Vec::new();
    let mut dropped_na = 0usize;
    for (j, sample_id) in props.sample_ids.iter().enumerate() {
        for (i, lineage) in lineages.iter().enumerate() {
            let proportion = props.get(i, j);
            if options.remove_zero && proportion == 0.0 {
                continue;
            }
            if options.remove_na && lineage[rank_idx].is_none() {
                if proportion > 0.0 {
                    dropped_na += 1;
                }
                continue;
            }
            records.push(PreparedRecord {
                sample_id: sample_id.clone(),
                lineage: lineage.clone(),
                proportion,
            });
        }
    }
    if dropped_na > 0 {
        debug!("Dropped {} rows with a missing '{}' label", dropped_na, table.ranks()[rank_idx]);
    }

    Ok(PreparedTable {
        ranks: table.ranks()[..=rank_idx].to_vec(),
        sample_ids: props.sample_ids.clone(),
        records,
    })
}

/// Sum abundances per (sample, lineage truncated to `rank_idx`).
///
/// Returns the aggregated matrix and the lineage of each of its rows, in
/// order of first appearance.
fn aggregate(table: &AbundanceTable, rank_idx: usize) -> Result<(CountMatrix, Vec<Vec<Option<String>>>)> {
    let sample_index: HashMap<&str, usize> = table
        .sample_ids()
        .iter()
        .enumerate()
        .map(|(j, sid)| (sid.as_str(), j))
        .collect();

    let mut feature_index: HashMap<&[Option<String>], usize> = HashMap::new();
    let mut lineages: Vec<Vec<Option<String>>> = Vec::new();
    let mut triplets = Vec::with_capacity(table.n_records());

    for record in table.records() {
        let truncated = &record.lineage[..=rank_idx];
        let row = *feature_index.entry(truncated).or_insert_with(|| {
            lineages.push(truncated.to_vec());
            lineages.len() - 1
        });
        let col = sample_index[record.sample_id.as_str()];
        triplets.push((row, col, record.abundance));
    }

    let feature_ids = lineages.iter().map(|l| lineage_key(l)).collect();
    let counts = CountMatrix::from_triplets(&triplets, feature_ids, table.sample_ids().to_vec())?;
    Ok((counts, lineages))
}

/// `;`-joined lineage with `NA` for missing labels.
fn lineage_key(lineage: &[Option<String>]) -> String {
    lineage
        .iter()
        .map(|l| l.as_deref().unwrap_or("NA"))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AbundanceRecord;
    use approx::assert_relative_eq;

    fn create_test_table() -> AbundanceTable {
        let ranks = vec!["Phylum".to_string(), "Genus".to_string(), "Species".to_string()];
        let records = vec![
            AbundanceRecord::new("S1", &[Some("Firmicutes"), Some("Blautia"), Some("obeum")], 30.0),
            AbundanceRecord::new("S1", &[Some("Firmicutes"), Some("Blautia"), Some("wexlerae")], 10.0),
            AbundanceRecord::new("S1", &[Some("Bacteroidetes"), Some("Bacteroides"), None], 40.0),
            AbundanceRecord::new("S1", &[Some("Bacteroidetes"), None, None], 20.0),
            AbundanceRecord::new("S2", &[Some("Firmicutes"), Some("Blautia"), Some("obeum")], 5.0),
            AbundanceRecord::new("S2", &[Some("Bacteroidetes"), Some("Bacteroides"), None], 15.0),
            AbundanceRecord::new("S2", &[Some("Proteobacteria"), Some("Escherichia"), None], 0.0),
        ];
        AbundanceTable::new(ranks, records).unwrap()
    }

    fn proportion(table: &PreparedTable, sample: &str, genus: Option<&str>) -> Option<f64> {
        table
            .records()
            .iter()
            .find(|r| r.sample_id == sample && r.lineage[1].as_deref() == genus)
            .map(|r| r.proportion)
    }

    #[test]
    fn test_aggregates_to_genus() {
        let prepared = prepare(&create_test_table(), &PrepareOptions::at_rank("Genus")).unwrap();
        assert_eq!(prepared.ranks(), &["Phylum", "Genus"]);
        assert_relative_eq!(proportion(&prepared, "S1", Some("Blautia")).unwrap(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(proportion(&prepared, "S1", Some("Bacteroides")).unwrap(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(proportion(&prepared, "S2", Some("Blautia")).unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_remove_na_keeps_denominator() {
        let prepared = prepare(&create_test_table(), &PrepareOptions::at_rank("Genus")).unwrap();
        assert!(proportion(&prepared, "S1", None).is_none());
        let totals = prepared.sample_totals();
        assert_relative_eq!(totals[0].1, 0.8, epsilon = 1e-12);
        assert_relative_eq!(totals[1].1, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_keep_na_rows() {
        let options = PrepareOptions {
            rank: Some("Genus".to_string()),
            remove_na: false,
            remove_zero: true,
        };
        let prepared = prepare(&create_test_table(), &options).unwrap();
        assert_relative_eq!(proportion(&prepared, "S1", None).unwrap(), 0.2, epsilon = 1e-12);
        for (_, total) in prepared.sample_totals() {
            assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_remove_zero() {
        let prepared = prepare(&create_test_table(), &PrepareOptions::at_rank("Genus")).unwrap();
        assert!(proportion(&prepared, "S2", Some("Escherichia")).is_none());
        assert!(prepared.records().iter().all(|r| r.proportion > 0.0));

        let options = PrepareOptions {
            remove_zero: false,
            ..PrepareOptions::at_rank("Genus")
        };
        let dense = prepare(&create_test_table(), &options).unwrap();
        assert_eq!(proportion(&dense, "S2", Some("Escherichia")), Some(0.0));
        // 3 named genera for each of 2 samples
        assert_eq!(dense.len(), 6);
    }

    #[test]
    fn test_default_rank_is_deepest() {
        let options = PrepareOptions {
            remove_na: false,
            ..PrepareOptions::default()
        };
        let prepared = prepare(&create_test_table(), &options).unwrap();
        assert_eq!(prepared.ranks().len(), 3);
        // S1: obeum, wexlerae, Bacteroides/NA, Bacteroidetes/NA/NA
        assert_eq!(prepared.records().iter().filter(|r| r.sample_id == "S1").count(), 4);
    }

    #[test]
    fn test_unknown_rank() {
        let result = prepare(&create_test_table(), &PrepareOptions::at_rank("Order"));
        assert!(matches!(result, Err(MicroshadesError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_total_sample() {
        let table = AbundanceTable::new(
            vec!["Genus".to_string()],
            vec![
                AbundanceRecord::new("S1", &[Some("Blautia")], 3.0),
                AbundanceRecord::new("S2", &[Some("Blautia")], 0.0),
            ],
        )
        .unwrap();
        assert!(matches!(
            prepare(&table, &PrepareOptions::default()),
            Err(MicroshadesError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_lineage_key() {
        let key = lineage_key(&[Some("Firmicutes".to_string()), None]);
        assert_eq!(key, "Firmicutes;NA");
    }
}
