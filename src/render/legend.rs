//! Two-tier legend: a header per group, then its subgroups darkest first.

use crate::assign::ColorTable;
use crate::error::{MicroshadesError, Result};
use serde::{Deserialize, Serialize};

/// Average glyph width as a fraction of the text size.
const GLYPH_WIDTH: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Group columns stacked top to bottom.
    #[default]
    Vertical,
    /// Group columns side by side.
    Horizontal,
}

/// Sizes are in the same (arbitrary) units as the returned positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendOptions {
    pub orientation: Orientation,
    pub key_size: f64,
    pub text_size: f64,
    pub group_label_size: f64,
    pub spacing: f64,
    pub title: Option<String>,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            key_size: 10.0,
            text_size: 10.0,
            group_label_size: 12.0,
            spacing: 4.0,
            title: None,
        }
    }
}

impl LegendOptions {
    fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("key_size", self.key_size),
            ("text_size", self.text_size),
            ("group_label_size", self.group_label_size),
        ] {
            if !size.is_finite() || size <= 0.0 {
                return Err(MicroshadesError::InvalidInput(format!(
                    "{} must be positive, got {}",
                    name, size
                )));
            }
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(MicroshadesError::InvalidInput(format!(
                "spacing must be non-negative, got {}",
                self.spacing
            )));
        }
        Ok(())
    }
}

/// A swatch and its label. `(x, y)` is the swatch's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub hex: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// One group's block: the header line followed by its entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendColumn {
    pub group: String,
    pub header_x: f64,
    pub header_y: f64,
    pub entries: Vec<LegendEntry>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Option<String>,
    pub orientation: Orientation,
    pub text_size: f64,
    pub group_label_size: f64,
    pub columns: Vec<LegendColumn>,
    pub width: f64,
    pub height: f64,
}

impl Legend {
    /// All entries in reading order.
    pub fn entries(&self) -> impl Iterator<Item = &LegendEntry> {
        self.columns.iter().flat_map(|c| c.entries.iter())
    }
}

fn text_width(label: &str, size: f64) -> f64 {
    label.chars().count() as f64 * size * GLYPH_WIDTH
}

/// Lay out a standalone legend for a color table.
///
/// Groups appear in stacking order, each with its subgroups darkest first,
/// matching the order of segments in [`plot_stacked_bars`](super::plot_stacked_bars).
///
/// # Errors
/// `InvalidInput` for non-positive sizes or negative spacing.
pub fn custom_legend(colors: &ColorTable, options: &LegendOptions) -> Result<Legend> {
    options.validate()?;

    let row = options.key_size.max(options.text_size) + options.spacing;
    let header = options.group_label_size + options.spacing;
    let top = if options.title.is_some() { header } else { 0.0 };

    let (mut x, mut y) = (0.0, top);
    let mut columns = Vec::new();
    for group in colors.groups() {
        let group_entries = colors.group_entries(group);
        let mut label_width = text_width(group, options.group_label_size);
        let mut entries = Vec::with_capacity(group_entries.len());
        for (k, entry) in group_entries.iter().enumerate() {
            label_width = label_width.max(
                options.key_size + options.spacing + text_width(&entry.subgroup, options.text_size),
            );
            entries.push(LegendEntry {
                label: entry.subgroup.clone(),
                hex: entry.hex.clone(),
                x,
                y: y + header + k as f64 * row,
                size: options.key_size,
            });
        }
        let column = LegendColumn {
            group: group.to_string(),
            header_x: x,
            header_y: y,
            width: label_width,
            height: header + entries.len() as f64 * row,
            entries,
        };
        match options.orientation {
            Orientation::Vertical => y += column.height + options.spacing,
            Orientation::Horizontal => x += column.width + options.spacing,
        }
        columns.push(column);
    }

    let (width, height) = match options.orientation {
        Orientation::Vertical => (
            columns.iter().map(|c| c.width).fold(0.0, f64::max),
            columns.iter().map(|c| c.header_y + c.height).fold(top, f64::max),
        ),
        Orientation::Horizontal => (
            columns.iter().map(|c| c.header_x + c.width).fold(0.0, f64::max),
            top + columns.iter().map(|c| c.height).fold(0.0, f64::max),
        ),
    };
    let width = match &options.title {
        Some(title) => width.max(text_width(title, options.group_label_size)),
        None => width,
    };

    Ok(Legend {
        title: options.title.clone(),
        orientation: options.orientation,
        text_size: options.text_size,
        group_label_size: options.group_label_size,
        columns,
        width,
        height,
    })
}
