//! Color assignment for two-level taxonomic groupings.
//!
//! The color assigner gives every selected group (e.g. a phylum) its own
//! palette and shades the group's subgroups (e.g. genera) by abundance:
//! the most abundant subgroup gets the darkest shade. Everything outside the
//! selection falls into a single gray "Other" bucket.
//!
//! All stages exchange a [`PlotData`] pair: the annotated long table and
//! the color lookup table built for it.

mod colors;
mod extend;
mod reorder;

pub use colors::{assign_colors, AssignOptions};
pub use extend::{extend_group, ExtendRequest};
pub use reorder::{reorder_samples, sample_ordering, ReorderOptions, SubgroupRef};

use crate::data::PreparedTable;
use crate::error::{MicroshadesError, Result};
use crate::palette::{color, PaletteFamily};
use rgb::RGB8;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Group and subgroup label of the bucket for unselected groups.
pub const OTHER: &str = "Other";

/// Shade of the family's gray palette used for the "Other" bucket.
pub const OTHER_SHADE: usize = 2;

/// Which rank columns form the two levels of the grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingKey {
    /// Broader rank choosing the palette, e.g. `Phylum`.
    pub group_field: String,
    /// Finer rank choosing the shade, e.g. `Genus`.
    pub subgroup_field: String,
}

impl GroupingKey {
    pub fn new(group_field: &str, subgroup_field: &str) -> Self {
        Self {
            group_field: group_field.to_string(),
            subgroup_field: subgroup_field.to_string(),
        }
    }

    /// Resolve both fields against a prepared table's rank columns.
    pub fn validate(&self, table: &PreparedTable) -> Result<(usize, usize)> {
        let group_idx = table.field_index(&self.group_field)?;
        let subgroup_idx = table.field_index(&self.subgroup_field)?;
        if group_idx == subgroup_idx {
            return Err(MicroshadesError::InvalidInput(format!(
                "Group and subgroup field are both '{}'",
                self.group_field
            )));
        }
        Ok((group_idx, subgroup_idx))
    }

    /// Check that `colors` was built with this key.
    pub(crate) fn check_matches(&self, colors: &ColorTable) -> Result<()> {
        if self.group_field != colors.group_field {
            return Err(MicroshadesError::MissingColumn(self.group_field.clone()));
        }
        if self.subgroup_field != colors.subgroup_field {
            return Err(MicroshadesError::MissingColumn(self.subgroup_field.clone()));
        }
        Ok(())
    }
}

/// The color given to one (group, subgroup) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorAssignment {
    pub group: String,
    /// Subgroup label as shown in charts; may be a collapsed
    /// `Other <group>` bucket.
    pub subgroup: String,
    pub palette: String,
    /// Shade index, 0 = lightest. Indexes the five-shade palette after
    /// assignment, and the resampled ramp after `extend_group`, so it can
    /// exceed the palette's own length.
    pub shade: usize,
    pub hex: String,
    /// Abundance rank within the group (1 = most abundant, darkest).
    pub rank: usize,
    /// Position of the group in stacking and legend order.
    pub group_order: usize,
    /// Summed proportion of the pair across all samples.
    pub total: f64,
}

impl ColorAssignment {
    /// Sort key for stacking and legend order.
    #[inline]
    pub fn order_key(&self) -> (usize, usize) {
        (self.group_order, self.rank)
    }
}

/// Color lookup table for a grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTable {
    pub group_field: String,
    pub subgroup_field: String,
    pub family: PaletteFamily,
    /// Selected groups in selection order.
    pub selected_groups: Vec<String>,
    pub entries: Vec<ColorAssignment>,
}

impl ColorTable {
    /// Look up the assignment for a displayed (group, subgroup) pair.
    pub fn lookup(&self, group: &str, subgroup: &str) -> Option<&ColorAssignment> {
        self.entries
            .iter()
            .find(|e| e.group == group && e.subgroup == subgroup)
    }

    /// Entries of one group, darkest first.
    pub fn group_entries(&self, group: &str) -> Vec<&ColorAssignment> {
        let mut entries: Vec<&ColorAssignment> =
            self.entries.iter().filter(|e| e.group == group).collect();
        entries.sort_by_key(|e| e.rank);
        entries
    }

    /// All entries in stacking order.
    pub fn ordered(&self) -> Vec<&ColorAssignment> {
        let mut entries: Vec<&ColorAssignment> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.order_key());
        entries
    }

    /// Groups present in the table, in stacking order.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for entry in self.ordered() {
            if !groups.contains(&entry.group.as_str()) {
                groups.push(&entry.group);
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A prepared row annotated with its grouping and color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub sample_id: String,
    /// Original label at the group rank.
    pub taxon_group: String,
    /// Selected group, or `Other`.
    pub group: String,
    /// Displayed subgroup label.
    pub subgroup: String,
    /// Original label at the subgroup rank.
    pub source_subgroup: String,
    pub proportion: f64,
    pub hex: String,
}

/// The annotated long table plus the sample axis order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedTable {
    pub group_field: String,
    pub subgroup_field: String,
    /// Sample axis order used by the chart renderer.
    pub sample_ids: Vec<String>,
    pub records: Vec<AnnotatedRecord>,
}

impl AnnotatedTable {
    /// Records of one sample, in table order.
    pub fn sample_records<'a>(&'a self, sample_id: &'a str) -> impl Iterator<Item = &'a AnnotatedRecord> + 'a {
        self.records.iter().filter(move |r| r.sample_id == sample_id)
    }

    /// Summed proportion of a displayed pair within one sample.
    pub fn proportion_of(&self, sample_id: &str, group: &str, subgroup: &str) -> f64 {
        self.sample_records(sample_id)
            .filter(|r| r.group == group && r.subgroup == subgroup)
            .map(|r| r.proportion)
            .sum()
    }
}

/// The (annotated table, color table) pair passed between stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub data: AnnotatedTable,
    pub colors: ColorTable,
}

/// Sum proportions per subgroup and sort descending.
///
/// Ties keep the order of first appearance.
pub(crate) fn rank_subgroups<'a, I>(rows: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(String, f64)> = Vec::new();
    for (subgroup, proportion) in rows {
        match index.get(subgroup) {
            Some(&i) => totals[i].1 += proportion,
            None => {
                index.insert(subgroup, totals.len());
                totals.push((subgroup.to_string(), proportion));
            }
        }
    }
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    totals
}

/// Label of the bucket collecting a group's lowest-ranked subgroups.
pub(crate) fn collapsed_label(group: &str) -> String {
    if group == OTHER {
        OTHER.to_string()
    } else {
        format!("{} {}", OTHER, group)
    }
}

/// Shades assigned to one group, and where each source subgroup landed.
pub(crate) struct GroupShading {
    pub entries: Vec<ColorAssignment>,
    /// source subgroup -> displayed subgroup
    pub labels: HashMap<String, String>,
}

/// Give ranked subgroups shades, darkest first.
///
/// `shades` are the shades in use, lightest first; `offset` is the palette
/// index of `shades[0]`. When there are more subgroups than shades, the
/// excess collapses into one bucket with the lightest shade.
pub(crate) fn shade_group(
    group: &str,
    group_order: usize,
    palette: &str,
    shades: &[RGB8],
    offset: usize,
    ranked: &[(String, f64)],
) -> GroupShading {
    let capacity = shades.len();
    let individual = if ranked.len() <= capacity {
        ranked.len()
    } else {
        capacity.saturating_sub(1)
    };

    let mut entries = Vec::with_capacity(individual + 1);
    let mut labels = HashMap::with_capacity(ranked.len());
    for (r, (subgroup, total)) in ranked.iter().take(individual).enumerate() {
        let local = capacity - 1 - r;
        entries.push(ColorAssignment {
            group: group.to_string(),
            subgroup: subgroup.clone(),
            palette: palette.to_string(),
            shade: offset + local,
            hex: color::to_hex(shades[local]),
            rank: r + 1,
            group_order,
            total: *total,
        });
        labels.insert(subgroup.clone(), subgroup.clone());
    }

    if ranked.len() > individual && capacity > 0 {
        let bucket = collapsed_label(group);
        let rest = &ranked[individual..];
        entries.push(ColorAssignment {
            group: group.to_string(),
            subgroup: bucket.clone(),
            palette: palette.to_string(),
            shade: offset,
            hex: color::to_hex(shades[0]),
            rank: individual + 1,
            group_order,
            total: rest.iter().map(|(_, t)| t).sum(),
        });
        for (subgroup, _) in rest {
            labels.insert(subgroup.clone(), bucket.clone());
        }
    }

    GroupShading { entries, labels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::palette;

    fn ranked(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(s, t)| (s.to_string(), *t)).collect()
    }

    #[test]
    fn test_rank_subgroups_sums_and_sorts() {
        let ranked = rank_subgroups(vec![
            ("Blautia", 0.1),
            ("Roseburia", 0.3),
            ("Blautia", 0.3),
            ("Dorea", 0.05),
        ]);
        assert_eq!(ranked[0].0, "Blautia");
        assert!((ranked[0].1 - 0.4).abs() < 1e-12);
        assert_eq!(ranked[1].0, "Roseburia");
        assert_eq!(ranked[2].0, "Dorea");
    }

    #[test]
    fn test_rank_subgroups_ties_keep_first_appearance() {
        let ranked = rank_subgroups(vec![("b", 0.2), ("a", 0.2), ("c", 0.2)]);
        let names: Vec<&str> = ranked.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_shade_group_darkest_first() {
        let p = palette("micro_blue").unwrap();
        let shading = shade_group("A", 0, p.name(), p.shades(), 0, &ranked(&[("x", 0.7), ("y", 0.3)]));
        assert_eq!(shading.entries.len(), 2);
        assert_eq!(shading.entries[0].shade, 4);
        assert_eq!(shading.entries[0].hex, "#4292C6");
        assert_eq!(shading.entries[0].rank, 1);
        assert_eq!(shading.entries[1].shade, 3);
        assert_eq!(shading.entries[1].rank, 2);
        assert_eq!(shading.labels["y"], "y");
    }

    #[test]
    fn test_shade_group_collapses_excess() {
        let p = palette("micro_green").unwrap();
        let subgroups = ranked(&[
            ("a", 0.30),
            ("b", 0.20),
            ("c", 0.15),
            ("d", 0.10),
            ("e", 0.05),
            ("f", 0.02),
        ]);
        let shading = shade_group("Firmicutes", 1, p.name(), p.shades(), 0, &subgroups);
        assert_eq!(shading.entries.len(), 5);
        let shades: Vec<usize> = shading.entries.iter().map(|e| e.shade).collect();
        assert_eq!(shades, vec![4, 3, 2, 1, 0]);
        let bucket = &shading.entries[4];
        assert_eq!(bucket.subgroup, "Other Firmicutes");
        assert_eq!(bucket.rank, 5);
        assert!((bucket.total - 0.07).abs() < 1e-12);
        assert_eq!(shading.labels["e"], "Other Firmicutes");
        assert_eq!(shading.labels["f"], "Other Firmicutes");
        assert_eq!(shading.labels["d"], "d");
    }

    #[test]
    fn test_shade_group_with_offset() {
        let p = palette("micro_orange").unwrap();
        let shading = shade_group(
            "A",
            0,
            p.name(),
            &p.shades()[2..],
            2,
            &ranked(&[("x", 0.5), ("y", 0.3), ("z", 0.1), ("w", 0.1)]),
        );
        let shades: Vec<usize> = shading.entries.iter().map(|e| e.shade).collect();
        assert_eq!(shades, vec![4, 3, 2]);
        assert_eq!(shading.entries[2].subgroup, "Other A");
        assert_eq!(shading.entries[2].hex, "#FDAE6B");
    }

    #[test]
    fn test_collapsed_label_for_other() {
        assert_eq!(collapsed_label("Other"), "Other");
        assert_eq!(collapsed_label("Proteobacteria"), "Other Proteobacteria");
    }
}
