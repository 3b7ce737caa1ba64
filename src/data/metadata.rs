//! Per-sample covariates used to condition contribution summaries.

use crate::error::{MicroshadesError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// A covariate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value equals the textual `level`.
    ///
    /// Continuous values compare numerically, so `"30"` matches `30.0`.
    pub fn matches(&self, level: &str) -> bool {
        match self {
            Variable::Categorical(s) => s == level,
            Variable::Continuous(v) => level.trim().parse::<f64>().map_or(false, |l| l == *v),
            Variable::Missing => false,
        }
    }
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na"
}

/// Sample metadata: one row of covariates per sample.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    column_names: Vec<String>,
    /// sample_id -> column_name -> Variable
    data: HashMap<String, HashMap<String, Variable>>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from raw string rows.
    ///
    /// A column is continuous if every non-missing value parses as a
    /// number, otherwise categorical. Empty cells and `NA` are missing.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<(String, Vec<String>)>) -> Result<Self> {
        if rows.is_empty() {
            return Err(MicroshadesError::InvalidInput("No samples in metadata".to_string()));
        }

        let numeric: Vec<bool> = (0..column_names.len())
            .map(|col_idx| {
                rows.iter().all(|(_, values)| {
                    values
                        .get(col_idx)
                        .map(|v| v.trim())
                        .map_or(true, |v| is_missing_token(v) || v.parse::<f64>().is_ok())
                })
            })
            .collect();

        let mut sample_ids = Vec::with_capacity(rows.len());
        let mut data = HashMap::with_capacity(rows.len());
        for (sample_id, values) in rows {
            let mut sample_data = HashMap::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let raw = values.get(col_idx).map(|v| v.trim()).unwrap_or("");
                let var = if is_missing_token(raw) {
                    Variable::Missing
                } else if numeric[col_idx] {
                    raw.parse::<f64>().map(Variable::Continuous).unwrap_or(Variable::Missing)
                } else {
                    Variable::Categorical(raw.to_string())
                };
                sample_data.insert(col_name.clone(), var);
            }
            if data.insert(sample_id.clone(), sample_data).is_some() {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Sample '{}' appears twice in metadata",
                    sample_id
                )));
            }
            sample_ids.push(sample_id);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
        })
    }

    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)?;
        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(MicroshadesError::InvalidInput(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let sample_id = match record.get(0).map(str::trim) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => continue,
            };
            let values = record.iter().skip(1).map(str::to_string).collect();
            rows.push((sample_id, values));
        }

        Self::from_rows(column_names, rows)
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    fn require_column(&self, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(MicroshadesError::MissingColumn(column.to_string()))
        }
    }

    /// Distinct non-missing values of a column, sorted.
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        self.require_column(column)?;
        let levels: BTreeSet<String> = self
            .data
            .values()
            .filter_map(|m| m.get(column))
            .filter_map(|v| match v {
                Variable::Categorical(s) => Some(s.clone()),
                Variable::Continuous(x) => Some(x.to_string()),
                Variable::Missing => None,
            })
            .collect();
        Ok(levels.into_iter().collect())
    }

    /// Samples whose `column` equals `level`, in metadata order.
    pub fn samples_matching(&self, column: &str, level: &str) -> Result<Vec<String>> {
        self.require_column(column)?;
        Ok(self
            .sample_ids
            .iter()
            .filter(|sid| self.get(sid, column).map_or(false, |v| v.matches(level)))
            .cloned()
            .collect())
    }
}
