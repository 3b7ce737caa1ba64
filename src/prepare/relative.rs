//! Total-sum scaling of aggregated abundances to per-sample proportions.

use crate::data::CountMatrix;
use crate::error::{MicroshadesError, Result};
use nalgebra::DMatrix;

/// Proportions of each feature within each sample.
#[derive(Debug, Clone)]
pub struct ProportionMatrix {
    /// Proportions (features × samples); every column sums to 1.
    pub data: DMatrix<f64>,
    pub feature_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    /// Total abundance per sample before scaling.
    pub library_sizes: Vec<f64>,
}

impl ProportionMatrix {
    /// Get the proportion for a feature and sample.
    #[inline]
    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.data[(feature, sample)]
    }

    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Get a column (sample) as a vector.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().cloned().collect()
    }
}

/// Divide every abundance by its sample's total.
///
/// # Formula
/// For sample j: p_ij = x_ij / sum_i(x_ij)
///
/// Fails if the matrix is empty or any sample's total is zero.
pub fn relative_abundance(counts: &CountMatrix) -> Result<ProportionMatrix> {
    let n_features = counts.n_features();
    let n_samples = counts.n_samples();

    if n_features == 0 || n_samples == 0 {
        return Err(MicroshadesError::InvalidInput(
            "Cannot compute proportions of an empty table".to_string(),
        ));
    }

    let library_sizes = counts.col_sums();
    for (j, &lib_size) in library_sizes.iter().enumerate() {
        if lib_size <= 0.0 {
            return Err(MicroshadesError::InvalidInput(format!(
                "Sample '{}' has zero total abundance, cannot compute proportions",
                counts.sample_ids()[j]
            )));
        }
    }

    let mut data = counts.to_dense();
    for (j, &lib_size) in library_sizes.iter().enumerate() {
        for value in data.column_mut(j).iter_mut() {
            *value /= lib_size;
        }
    }

    Ok(ProportionMatrix {
        data,
        feature_ids: counts.feature_ids().to_vec(),
        sample_ids: counts.sample_ids().to_vec(),
        library_sizes,
    })
}
