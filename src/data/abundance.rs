//! Raw long-format abundance table.

use super::count_matrix::parse_abundance;
use super::{parse_label, CountMatrix, Taxonomy};
use crate::error::{MicroshadesError, Result};
use std::collections::HashSet;
use std::path::Path;

/// One observation: a taxon's abundance in one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceRecord {
    pub sample_id: String,
    /// Labels for every rank of the table's schema; `None` is missing.
    pub lineage: Vec<Option<String>>,
    /// Non-negative abundance (read count or relative abundance).
    pub abundance: f64,
}

impl AbundanceRecord {
    pub fn new(sample_id: &str, lineage: &[Option<&str>], abundance: f64) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            lineage: lineage.iter().map(|l| l.map(str::to_string)).collect(),
            abundance,
        }
    }
}

/// A sample × taxon abundance table in long format.
#[derive(Debug, Clone)]
pub struct AbundanceTable {
    /// Rank names, broadest first.
    ranks: Vec<String>,
    records: Vec<AbundanceRecord>,
    /// Sample IDs in order of first appearance.
    sample_ids: Vec<String>,
}

impl AbundanceTable {
    /// Create a table, validating the rank schema and every record.
    pub fn new(ranks: Vec<String>, records: Vec<AbundanceRecord>) -> Result<Self> {
        if ranks.is_empty() {
            return Err(MicroshadesError::InvalidInput(
                "Abundance table needs at least one rank".to_string(),
            ));
        }
        let mut seen_ranks = HashSet::new();
        for rank in &ranks {
            if !seen_ranks.insert(rank.as_str()) {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Rank '{}' appears twice in the schema",
                    rank
                )));
            }
        }

        let mut sample_ids = Vec::new();
        let mut seen_samples = HashSet::new();
        for (row, record) in records.iter().enumerate() {
            if record.lineage.len() != ranks.len() {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Record {} has {} lineage entries, schema has {} ranks",
                    row,
                    record.lineage.len(),
                    ranks.len()
                )));
            }
            if !record.abundance.is_finite() || record.abundance < 0.0 {
                return Err(MicroshadesError::InvalidAbundance {
                    value: record.abundance.to_string(),
                    row,
                });
            }
            if seen_samples.insert(record.sample_id.clone()) {
                sample_ids.push(record.sample_id.clone());
            }
        }

        Ok(Self {
            ranks,
            records,
            sample_ids,
        })
    }

    /// Load a long-format TSV.
    ///
    /// Expected format:
    /// - Header: sample ID column, one column per rank, abundance column last
    /// - One row per sample × taxon observation
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        let header = reader.headers()?.clone();
        if header.len() < 3 {
            return Err(MicroshadesError::InvalidInput(
                "Abundance table needs sample, rank and abundance columns".to_string(),
            ));
        }
        let n_ranks = header.len() - 2;
        let ranks: Vec<String> = header
            .iter()
            .skip(1)
            .take(n_ranks)
            .map(|s| s.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let sample_id = record.get(0).unwrap_or_default().trim();
            if sample_id.is_empty() {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Row {} has no sample identifier",
                    row
                )));
            }
            let lineage = (1..=n_ranks)
                .map(|i| record.get(i).and_then(parse_label))
                .collect();
            let abundance = parse_abundance(record.get(n_ranks + 1).unwrap_or_default(), row)?;
            records.push(AbundanceRecord {
                sample_id: sample_id.to_string(),
                lineage,
                abundance,
            });
        }

        Self::new(ranks, records)
    }

    /// Melt a features × samples matrix using a taxonomy table.
    ///
    /// Zero cells are skipped. Every feature of the matrix must have a
    /// lineage in `taxonomy`.
    pub fn from_count_matrix(counts: &CountMatrix, taxonomy: &Taxonomy) -> Result<Self> {
        let mut records = Vec::with_capacity(counts.nnz());
        for (row, feature_id) in counts.feature_ids().iter().enumerate() {
            let lineage = taxonomy.lineage(feature_id).ok_or_else(|| {
                MicroshadesError::InvalidInput(format!(
                    "Feature '{}' has no taxonomy entry",
                    feature_id
                ))
            })?;
            for (col, value) in counts.row_entries(row) {
                records.push(AbundanceRecord {
                    sample_id: counts.sample_ids()[col].clone(),
                    lineage: lineage.to_vec(),
                    abundance: value,
                });
            }
        }
        // Keep the matrix's sample order even for samples without reads.
        let mut table = Self::new(taxonomy.ranks().to_vec(), records)?;
        table.sample_ids = counts.sample_ids().to_vec();
        Ok(table)
    }

    /// Rank names, broadest first.
    pub fn ranks(&self) -> &[String] {
        &self.ranks
    }

    pub fn records(&self) -> &[AbundanceRecord] {
        &self.records
    }

    /// Sample IDs in order of first appearance.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_records(&self) -> usize {
        self.records.len()
    }

    /// Position of `rank` in the schema.
    pub fn rank_index(&self, rank: &str) -> Result<usize> {
        self.ranks.iter().position(|r| r == rank).ok_or_else(|| {
            MicroshadesError::InvalidInput(format!(
                "Rank '{}' is not part of the lineage schema ({})",
                rank,
                self.ranks.join(", ")
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ranks() -> Vec<String> {
        vec!["Phylum".to_string(), "Genus".to_string()]
    }

    #[test]
    fn test_new_tracks_sample_order() {
        let table = AbundanceTable::new(
            ranks(),
            vec![
                AbundanceRecord::new("S2", &[Some("Firmicutes"), Some("Blautia")], 3.0),
                AbundanceRecord::new("S1", &[Some("Firmicutes"), Some("Blautia")], 1.0),
                AbundanceRecord::new("S2", &[Some("Bacteroidetes"), None], 2.0),
            ],
        )
        .unwrap();
        assert_eq!(table.sample_ids(), &["S2", "S1"]);
        assert_eq!(table.n_records(), 3);
        assert_eq!(table.rank_index("Genus").unwrap(), 1);
        assert!(matches!(
            table.rank_index("Species"),
            Err(MicroshadesError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_negative_abundance_rejected() {
        let result = AbundanceTable::new(
            ranks(),
            vec![AbundanceRecord::new("S1", &[Some("Firmicutes"), None], -1.0)],
        );
        assert!(matches!(result, Err(MicroshadesError::InvalidAbundance { .. })));
    }

    #[test]
    fn test_lineage_length_checked() {
        let result = AbundanceTable::new(
            ranks(),
            vec![AbundanceRecord::new("S1", &[Some("Firmicutes")], 1.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_rank_rejected() {
        let result = AbundanceTable::new(vec!["Genus".into(), "Genus".into()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tPhylum\tGenus\tabundance").unwrap();
        writeln!(file, "S1\tFirmicutes\tBlautia\t12").unwrap();
        writeln!(file, "S1\tBacteroidetes\tNA\t3.5").unwrap();
        writeln!(file, "S2\tFirmicutes\t\t7").unwrap();
        file.flush().unwrap();

        let table = AbundanceTable::from_tsv(file.path()).unwrap();
        assert_eq!(table.ranks(), &["Phylum", "Genus"]);
        assert_eq!(table.sample_ids(), &["S1", "S2"]);
        assert_eq!(table.records()[1].lineage[1], None);
        assert_eq!(table.records()[1].abundance, 3.5);
        assert_eq!(table.records()[2].lineage[1], None);
    }

    #[test]
    fn test_from_tsv_bad_abundance() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tGenus\tabundance").unwrap();
        writeln!(file, "S1\tBlautia\tmany").unwrap();
        file.flush().unwrap();
        assert!(AbundanceTable::from_tsv(file.path()).is_err());
    }

    #[test]
    fn test_from_count_matrix() {
        let counts = CountMatrix::from_triplets(
            &[(0, 0, 5.0), (1, 0, 5.0), (0, 1, 2.0)],
            vec!["otu_1".into(), "otu_2".into()],
            vec!["S1".into(), "S2".into(), "S3".into()],
        )
        .unwrap();
        let taxonomy = Taxonomy::new(
            ranks(),
            vec![
                ("otu_1".into(), vec![Some("Firmicutes".into()), Some("Blautia".into())]),
                ("otu_2".into(), vec![Some("Bacteroidetes".into()), None]),
            ],
        )
        .unwrap();

        let table = AbundanceTable::from_count_matrix(&counts, &taxonomy).unwrap();
        assert_eq!(table.n_records(), 3);
        assert_eq!(table.sample_ids(), &["S1", "S2", "S3"]);
        assert_eq!(table.records()[0].sample_id, "S1");
        assert_eq!(table.records()[0].lineage[1].as_deref(), Some("Blautia"));
    }

    #[test]
    fn test_from_count_matrix_missing_taxonomy() {
        let counts = CountMatrix::from_triplets(&[(0, 0, 1.0)], vec!["otu_9".into()], vec!["S1".into()])
            .unwrap();
        let taxonomy = Taxonomy::new(ranks(), vec![]).unwrap();
        assert!(AbundanceTable::from_count_matrix(&counts, &taxonomy).is_err());
    }
}
