//! Stacked proportion bar chart.

use crate::assign::PlotData;
use crate::error::{MicroshadesError, Result};
use crate::palette::color::{parse_hex, to_hex};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which end of the bar the first legend entry sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackDirection {
    /// First entry at the top of the bar, so bars read like the legend.
    #[default]
    TopDown,
    BottomUp,
}

/// Axis labels and stacking for [`plot_stacked_bars`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub stack: StackDirection,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: None,
            x_label: "Sample".to_string(),
            y_label: "Relative abundance".to_string(),
            stack: StackDirection::TopDown,
        }
    }
}

/// One colored block of a bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub group: String,
    pub subgroup: String,
    pub hex: String,
    pub value: f64,
    /// Lower edge on the proportion axis.
    pub y0: f64,
    /// Upper edge on the proportion axis.
    pub y1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub sample: String,
    pub segments: Vec<Segment>,
}

impl Bar {
    /// Height of the bar.
    pub fn total(&self) -> f64 {
        self.segments.iter().map(|s| s.value).sum()
    }
}

/// Manual fill scale: legend labels and their colors in legend order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillScale {
    pub labels: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedBarChart {
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    /// Categories of the x axis, in display order.
    pub samples: Vec<String>,
    pub bars: Vec<Bar>,
    pub fill_scale: FillScale,
}

/// Build a stacked bar chart with one bar per sample.
///
/// Rows are summed per displayed (group, subgroup) pair and stacked in
/// color table order. Samples follow the annotated table's axis order.
///
/// Fill colors are written as uppercase `#RRGGBB`, whatever form the
/// color table holds them in.
///
/// # Errors
/// `InvalidInput` if a row's pair has no entry in the color table, or an
/// entry's color is not a hex color.
pub fn plot_stacked_bars(plot: &PlotData, options: &ChartOptions) -> Result<StackedBarChart> {
    let ordered = plot.colors.ordered();
    let fills: Vec<String> = ordered
        .iter()
        .map(|e| parse_hex(&e.hex).map(to_hex))
        .collect::<Result<_>>()?;
    let position: HashMap<(&str, &str), usize> = ordered
        .iter()
        .enumerate()
        .map(|(k, e)| ((e.group.as_str(), e.subgroup.as_str()), k))
        .collect();

    let mut values: HashMap<&str, Vec<f64>> = plot
        .data
        .sample_ids
        .iter()
        .map(|s| (s.as_str(), vec![0.0; ordered.len()]))
        .collect();
    for record in &plot.data.records {
        let k = *position
            .get(&(record.group.as_str(), record.subgroup.as_str()))
            .ok_or_else(|| {
                MicroshadesError::InvalidInput(format!(
                    "No color entry for '{}' / '{}'",
                    record.group, record.subgroup
                ))
            })?;
        let sample = values.get_mut(record.sample_id.as_str()).ok_or_else(|| {
            MicroshadesError::InvalidInput(format!(
                "Sample '{}' is not on the sample axis",
                record.sample_id
            ))
        })?;
        sample[k] += record.proportion;
    }

    let mut bars = Vec::with_capacity(plot.data.sample_ids.len());
    for sample in &plot.data.sample_ids {
        let sample_values = &values[sample.as_str()];
        let mut keys: Vec<usize> = (0..ordered.len()).filter(|&k| sample_values[k] > 0.0).collect();
        if options.stack == StackDirection::TopDown {
            keys.reverse();
        }

        let mut y = 0.0;
        let mut segments = Vec::with_capacity(keys.len());
        for k in keys {
            let entry = ordered[k];
            let value = sample_values[k];
            segments.push(Segment {
                group: entry.group.clone(),
                subgroup: entry.subgroup.clone(),
                hex: fills[k].clone(),
                value,
                y0: y,
                y1: y + value,
            });
            y += value;
        }
        bars.push(Bar {
            sample: sample.clone(),
            segments,
        });
    }

    debug!("Built stacked bar chart with {} bars", bars.len());

    Ok(StackedBarChart {
        title: options.title.clone(),
        x_label: options.x_label.clone(),
        y_label: options.y_label.clone(),
        samples: plot.data.sample_ids.clone(),
        bars,
        fill_scale: FillScale {
            labels: ordered.iter().map(|e| e.subgroup.clone()).collect(),
            values: fills,
        },
    })
}
