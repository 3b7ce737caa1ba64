//! Re-shade one group with a larger palette.

use super::{rank_subgroups, shade_group, GroupingKey, PlotData};
use crate::error::{MicroshadesError, Result};
use crate::palette::palette;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which group to extend, and with what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendRequest {
    pub group: String,
    /// Palette the group currently uses.
    pub existing_palette: String,
    /// Palette to sample the new shades from.
    pub new_palette: String,
    /// Shades to add on top of the group's current entry count.
    pub n_add: isize,
}

impl ExtendRequest {
    pub fn new(group: &str, existing_palette: &str, new_palette: &str, n_add: isize) -> Self {
        Self {
            group: group.to_string(),
            existing_palette: existing_palette.to_string(),
            new_palette: new_palette.to_string(),
            n_add,
        }
    }
}

/// Show more subgroups of one group by giving it more shades.
///
/// The group's subgroups are ranked again from the annotated rows and
/// shaded with `current entries + n_add` shades resampled from
/// `new_palette` (see [`Palette::ramp`](crate::palette::Palette::ramp)).
/// Entries and rows of every other group are left exactly as they were.
///
/// # Errors
/// - `MissingColumn` if `key` is not the grouping the colors were built with
/// - `InvalidInput` if the group is absent or does not use `existing_palette`
/// - `UnknownPalette` if `new_palette` is not registered
/// - `PaletteExhaustion` if the new shade count is below the group's
///   current entry count, or below one
///
/// The check counts the group's visible entries, not its distinct
/// subgroups in the data. A group whose tail was collapsed into
/// `Other <group>` therefore accepts any non-negative `n_add`; subgroups
/// that still do not fit are collapsed again.
pub fn extend_group(plot: &PlotData, key: &GroupingKey, request: &ExtendRequest) -> Result<PlotData> {
    key.check_matches(&plot.colors)?;

    let current = plot.colors.group_entries(&request.group);
    let first = current.first().ok_or_else(|| {
        MicroshadesError::InvalidInput(format!("Group '{}' has no color entries", request.group))
    })?;
    if first.palette != request.existing_palette {
        return Err(MicroshadesError::InvalidInput(format!(
            "Group '{}' uses palette '{}', not '{}'",
            request.group, first.palette, request.existing_palette
        )));
    }
    let group_order = first.group_order;
    let new_palette = palette(&request.new_palette)?;

    let visible = current.len();
    let count = visible as isize + request.n_add;
    if count < visible as isize || count < 1 {
        return Err(MicroshadesError::PaletteExhaustion {
            requested: visible,
            available: count.max(0) as usize,
        });
    }
    let count = count as usize;

    let ranked = rank_subgroups(
        plot.data
            .records
            .iter()
            .filter(|r| r.group == request.group)
            .map(|r| (r.source_subgroup.as_str(), r.proportion)),
    );
    let shades = new_palette.ramp(count);
    let shading = shade_group(&request.group, group_order, new_palette.name(), &shades, 0, &ranked);
    debug!(
        "Extended '{}' from {} to {} entries using {} shades of '{}'",
        request.group,
        visible,
        shading.entries.len(),
        count,
        new_palette.name()
    );

    let mut colors = plot.colors.clone();
    let insert_at = colors
        .entries
        .iter()
        .position(|e| e.group == request.group)
        .unwrap_or(colors.entries.len());
    colors.entries.retain(|e| e.group != request.group);
    let tail = colors.entries.split_off(insert_at.min(colors.entries.len()));
    colors.entries.extend(shading.entries);
    colors.entries.extend(tail);

    let hex_of: HashMap<&str, &str> = colors
        .entries
        .iter()
        .filter(|e| e.group == request.group)
        .map(|e| (e.subgroup.as_str(), e.hex.as_str()))
        .collect();

    let mut data = plot.data.clone();
    for record in data.records.iter_mut().filter(|r| r.group == request.group) {
        let shown = shading
            .labels
            .get(&record.source_subgroup)
            .cloned()
            .unwrap_or_else(|| record.source_subgroup.clone());
        record.hex = hex_of
            .get(shown.as_str())
            .map(|h| h.to_string())
            .ok_or_else(|| MicroshadesError::InvalidInput(format!("No color for '{}'", shown)))?;
        record.subgroup = shown;
    }

    Ok(PlotData { data, colors })
}
