//! Per-group contribution statistics within one covariate level.

use crate::assign::PlotData;
use crate::data::Metadata;
use crate::error::{MicroshadesError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};
use std::collections::{HashMap, HashSet};

/// Whether contributions are summed per group or kept per subgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionLevel {
    #[default]
    Group,
    Subgroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    #[default]
    Mean,
    Median,
    Box,
}

/// Which samples to summarize, and at which level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionOptions {
    /// Metadata column to filter on.
    pub covariate: String,
    /// Level of `covariate` to keep.
    pub value: String,
    #[serde(default)]
    pub level: ContributionLevel,
}

impl ContributionOptions {
    pub fn new(covariate: &str, value: &str, level: ContributionLevel) -> Self {
        Self {
            covariate: covariate.to_string(),
            value: value.to_string(),
            level,
        }
    }
}

/// Distribution of one key's per-sample proportion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionSummary {
    pub group: String,
    /// `None` when summarizing whole groups.
    pub subgroup: Option<String>,
    pub hex: String,
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    /// Per-sample values in sample axis order.
    pub values: Vec<f64>,
}

impl ContributionSummary {
    pub fn label(&self) -> &str {
        self.subgroup.as_deref().unwrap_or(&self.group)
    }

    fn from_values(group: &str, subgroup: Option<&str>, hex: &str, values: Vec<f64>) -> Self {
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut data = Data::new(values.clone());
        Self {
            group: group.to_string(),
            subgroup: subgroup.map(str::to_string),
            hex: hex.to_string(),
            n,
            mean,
            median: data.median(),
            q1: data.lower_quartile(),
            q3: data.upper_quartile(),
            min,
            max,
            values,
        }
    }
}

impl std::fmt::Display for ContributionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<30} n={:<4} mean={:.4} median={:.4} IQR=[{:.4}, {:.4}] range=[{:.4}, {:.4}]",
            self.label(),
            self.n,
            self.mean,
            self.median,
            self.q1,
            self.q3,
            self.min,
            self.max
        )
    }
}

/// Summary chart of contributions within one covariate level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionChart {
    pub kind: SummaryKind,
    pub title: String,
    pub y_label: String,
    pub summaries: Vec<ContributionSummary>,
}

impl ContributionChart {
    /// Bar heights for mean and median charts; box charts use the median.
    pub fn heights(&self) -> Vec<f64> {
        self.summaries
            .iter()
            .map(|s| match self.kind {
                SummaryKind::Mean => s.mean,
                SummaryKind::Median | SummaryKind::Box => s.median,
            })
            .collect()
    }
}

/// Summarize each group's (or subgroup's) proportion over the samples
/// whose `covariate` equals `value`.
///
/// A sample lacking a key contributes 0 for it. Keys follow legend order.
///
/// # Errors
/// - `MissingColumn` if `covariate` is not a metadata column
/// - `InvalidInput` if no sample on the chart has that covariate value
pub fn summarize_contributions(
    plot: &PlotData,
    metadata: &Metadata,
    options: &ContributionOptions,
) -> Result<Vec<ContributionSummary>> {
    let matching: HashSet<String> = metadata
        .samples_matching(&options.covariate, &options.value)?
        .into_iter()
        .collect();
    let samples: Vec<&str> = plot
        .data
        .sample_ids
        .iter()
        .filter(|s| matching.contains(s.as_str()))
        .map(|s| s.as_str())
        .collect();
    if samples.is_empty() {
        return Err(MicroshadesError::InvalidInput(format!(
            "No samples with {} = '{}'",
            options.covariate, options.value
        )));
    }
    let column: HashMap<&str, usize> = samples.iter().enumerate().map(|(k, s)| (*s, k)).collect();

    // (group, subgroup, hex) in legend order
    let keys: Vec<(&str, Option<&str>, &str)> = match options.level {
        ContributionLevel::Group => plot
            .colors
            .groups()
            .into_iter()
            .filter_map(|g| {
                plot.colors
                    .group_entries(g)
                    .first()
                    .map(|e| (e.group.as_str(), None, e.hex.as_str()))
            })
            .collect(),
        ContributionLevel::Subgroup => plot
            .colors
            .ordered()
            .into_iter()
            .map(|e| (e.group.as_str(), Some(e.subgroup.as_str()), e.hex.as_str()))
            .collect(),
    };
    let index: HashMap<(&str, Option<&str>), usize> = keys
        .iter()
        .enumerate()
        .map(|(k, (g, s, _))| ((*g, *s), k))
        .collect();

    let mut values = vec![vec![0.0; samples.len()]; keys.len()];
    for record in &plot.data.records {
        let Some(&col) = column.get(record.sample_id.as_str()) else {
            continue;
        };
        let key = match options.level {
            ContributionLevel::Group => (record.group.as_str(), None),
            ContributionLevel::Subgroup => (record.group.as_str(), Some(record.subgroup.as_str())),
        };
        if let Some(&row) = index.get(&key) {
            values[row][col] += record.proportion;
        }
    }

    debug!(
        "Summarized {} keys over {} samples with {} = '{}'",
        keys.len(),
        samples.len(),
        options.covariate,
        options.value
    );

    Ok(keys
        .iter()
        .zip(values)
        .map(|((group, subgroup, hex), v)| ContributionSummary::from_values(group, *subgroup, hex, v))
        .collect())
}

/// Build a mean, median or box chart of contributions.
pub fn plot_contributions(
    plot: &PlotData,
    metadata: &Metadata,
    options: &ContributionOptions,
    kind: SummaryKind,
) -> Result<ContributionChart> {
    let summaries = summarize_contributions(plot, metadata, options)?;
    let statistic = match kind {
        SummaryKind::Mean => "Mean",
        SummaryKind::Median => "Median",
        SummaryKind::Box => "Distribution of",
    };
    Ok(ContributionChart {
        kind,
        title: format!("{} = {}", options.covariate, options.value),
        y_label: format!("{} relative abundance", statistic),
        summaries,
    })
}
