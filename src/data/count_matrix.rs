//! Sparse feature × sample abundance matrix.

use crate::error::{MicroshadesError, Result};
use sprs::{CsMat, TriMat};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A sparse matrix storing feature abundances across samples.
///
/// Rows represent features (taxa), columns represent samples. Abundances
/// are non-negative and need not be integral, so relative-abundance
/// exports load as well as raw read counts.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<f64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    pub fn new(data: CsMat<f64>, feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(MicroshadesError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(MicroshadesError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Build a matrix from `(feature, sample, abundance)` triplets.
    ///
    /// Triplets addressing the same cell are summed.
    pub fn from_triplets(
        triplets: &[(usize, usize, f64)],
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let shape = (feature_ids.len(), sample_ids.len());
        let mut tri_mat = TriMat::new(shape);
        for &(row, col, val) in triplets {
            if row >= shape.0 || col >= shape.1 {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Triplet ({}, {}) outside a {}x{} matrix",
                    row, col, shape.0, shape.1
                )));
            }
            if val != 0.0 {
                tri_mat.add_triplet(row, col, val);
            }
        }
        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Load a count matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is feature ID header)
    /// - Subsequent rows: feature ID followed by abundances
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| MicroshadesError::InvalidInput("Empty count table".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(MicroshadesError::InvalidInput(
                "Count table must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();

        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let row_idx = feature_ids.len();
            let fields: Vec<&str> = line.split('\t').collect();
            feature_ids.push(fields[0].trim().to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate().take(n_samples) {
                let value = parse_abundance(value_str, row_idx)?;
                if value > 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        if feature_ids.is_empty() {
            return Err(MicroshadesError::InvalidInput("No features in count table".to_string()));
        }

        Self::from_triplets(&triplets, feature_ids, sample_ids)
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Total number of stored non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Iterate over the non-zero entries of one feature as `(sample, value)`.
    pub fn row_entries(&self, row: usize) -> Vec<(usize, f64)> {
        self.data
            .outer_view(row)
            .map(|v| v.iter().map(|(col, &val)| (col, val)).collect())
            .unwrap_or_default()
    }

    /// Compute column sums (library sizes per sample).
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Convert to a dense matrix.
    pub fn to_dense(&self) -> nalgebra::DMatrix<f64> {
        let mut dense = nalgebra::DMatrix::zeros(self.n_features(), self.n_samples());
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                dense[(row, col)] = val;
            }
        }
        dense
    }
}

/// Parse one abundance cell; must be a finite, non-negative number.
pub(crate) fn parse_abundance(raw: &str, row: usize) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| MicroshadesError::InvalidAbundance {
        value: raw.to_string(),
        row,
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(MicroshadesError::InvalidAbundance {
            value: raw.to_string(),
            row,
        });
    }
    Ok(value)
}
