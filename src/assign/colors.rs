//! Initial color assignment from a prepared table.

use super::{
    rank_subgroups, shade_group, AnnotatedRecord, AnnotatedTable, ColorAssignment, ColorTable,
    GroupingKey, PlotData, OTHER, OTHER_SHADE,
};
use crate::data::{PreparedTable, UNASSIGNED};
use crate::error::{MicroshadesError, Result};
use crate::palette::{base_palettes, gray_palette, PaletteFamily, MAX_SELECTED_GROUPS};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Options for [`assign_colors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignOptions {
    /// Groups that get their own palette, in palette order.
    pub selected_groups: Vec<String>,
    pub key: GroupingKey,
    /// Draw from the color-vision-deficiency friendly palettes.
    #[serde(default)]
    pub cvd: bool,
    /// Cap on the shades used per group (default: the palette length).
    #[serde(default)]
    pub max_shades: Option<usize>,
}

impl AssignOptions {
    pub fn new(selected_groups: &[&str], key: GroupingKey) -> Self {
        Self {
            selected_groups: selected_groups.iter().map(|s| s.to_string()).collect(),
            key,
            cvd: false,
            max_shades: None,
        }
    }

    pub fn cvd(mut self, cvd: bool) -> Self {
        self.cvd = cvd;
        self
    }

    pub fn max_shades(mut self, max_shades: usize) -> Self {
        self.max_shades = Some(max_shades);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.selected_groups.is_empty() {
            return Err(MicroshadesError::InvalidInput(
                "At least one group must be selected".to_string(),
            ));
        }
        if self.selected_groups.len() > MAX_SELECTED_GROUPS {
            return Err(MicroshadesError::PaletteExhaustion {
                requested: self.selected_groups.len(),
                available: MAX_SELECTED_GROUPS,
            });
        }
        let mut seen = HashSet::new();
        for group in &self.selected_groups {
            if group == OTHER {
                return Err(MicroshadesError::InvalidInput(format!(
                    "'{}' is reserved for unselected groups",
                    OTHER
                )));
            }
            if !seen.insert(group.as_str()) {
                return Err(MicroshadesError::InvalidInput(format!(
                    "Group '{}' is selected twice",
                    group
                )));
            }
        }
        if self.max_shades == Some(0) {
            return Err(MicroshadesError::InvalidInput(
                "max_shades must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assign a palette to every selected group and a shade to every subgroup.
///
/// For each selected group, subgroups are ranked by their proportion summed
/// over all samples; rank 1 receives the palette's darkest shade and each
/// following rank the next lighter one. If a group has more subgroups than
/// shades, the lowest-ranked ones share an `Other <group>` entry with the
/// lightest shade in use. Rows of unselected groups become `Other`/`Other`
/// with a single gray.
///
/// The result is fully determined by the table and the selection order.
///
/// # Errors
/// - `MissingColumn` if a grouping field is not a rank of `table`
/// - `PaletteExhaustion` if more groups are selected than base palettes exist
/// - `InvalidInput` for an empty, duplicated or reserved selection
pub fn assign_colors(table: &PreparedTable, options: &AssignOptions) -> Result<PlotData> {
    let (group_idx, subgroup_idx) = options.key.validate(table)?;
    options.validate()?;

    let family = PaletteFamily::from_cvd(options.cvd);
    let palettes = base_palettes(family);
    let selected: HashMap<&str, usize> = options
        .selected_groups
        .iter()
        .enumerate()
        .map(|(k, g)| (g.as_str(), k))
        .collect();

    let group_of = |lineage: &[Option<String>]| -> String {
        lineage[group_idx].clone().unwrap_or_else(|| UNASSIGNED.to_string())
    };
    let subgroup_of = |lineage: &[Option<String>]| -> String {
        lineage[subgroup_idx].clone().unwrap_or_else(|| UNASSIGNED.to_string())
    };

    let mut entries: Vec<ColorAssignment> = Vec::new();
    let mut labels: HashMap<(String, String), String> = HashMap::new();

    for (k, group) in options.selected_groups.iter().enumerate() {
        let rows: Vec<(String, f64)> = table
            .records()
            .iter()
            .filter(|r| r.lineage[group_idx].as_deref() == Some(group.as_str()))
            .map(|r| (subgroup_of(&r.lineage), r.proportion))
            .collect();
        if rows.is_empty() {
            warn!("Selected group '{}' does not occur in the data", group);
            continue;
        }
        let ranked = rank_subgroups(rows.iter().map(|(s, p)| (s.as_str(), *p)));

        let palette = palettes[k];
        let capacity = options.max_shades.unwrap_or(palette.len()).min(palette.len());
        let offset = palette.len() - capacity;
        if ranked.len() > capacity {
            warn!(
                "Group '{}' has {} subgroups but {} shades; collapsing the rest",
                group,
                ranked.len(),
                capacity
            );
        }
        let shading = shade_group(group, k, palette.name(), &palette.shades()[offset..], offset, &ranked);
        for (source, shown) in shading.labels {
            labels.insert((group.clone(), source), shown);
        }
        entries.extend(shading.entries);
    }

    let is_other = |lineage: &[Option<String>]| {
        lineage[group_idx]
            .as_deref()
            .map_or(true, |g| !selected.contains_key(g))
    };
    let other_rows: Vec<f64> = table
        .records()
        .iter()
        .filter(|r| is_other(&r.lineage))
        .map(|r| r.proportion)
        .collect();
    if !other_rows.is_empty() {
        let gray = gray_palette(family);
        entries.push(ColorAssignment {
            group: OTHER.to_string(),
            subgroup: OTHER.to_string(),
            palette: gray.name().to_string(),
            shade: OTHER_SHADE,
            hex: gray.hex(OTHER_SHADE).unwrap_or_else(|| gray.darkest_hex()),
            rank: 1,
            group_order: options.selected_groups.len(),
            total: other_rows.iter().sum(),
        });
    }

    let hex_of: HashMap<(&str, &str), &str> = entries
        .iter()
        .map(|e| ((e.group.as_str(), e.subgroup.as_str()), e.hex.as_str()))
        .collect();

    let mut records = Vec::with_capacity(table.len());
    for record in table.records() {
        let taxon_group = group_of(&record.lineage);
        let source_subgroup = subgroup_of(&record.lineage);
        let (group, subgroup) = if !is_other(&record.lineage) {
            let shown = labels
                .get(&(taxon_group.clone(), source_subgroup.clone()))
                .cloned()
                .unwrap_or_else(|| source_subgroup.clone());
            (taxon_group.clone(), shown)
        } else {
            (OTHER.to_string(), OTHER.to_string())
        };
        let hex = hex_of
            .get(&(group.as_str(), subgroup.as_str()))
            .map(|h| h.to_string())
            .ok_or_else(|| {
                MicroshadesError::InvalidInput(format!("No color for '{}' / '{}'", group, subgroup))
            })?;
        records.push(AnnotatedRecord {
            sample_id: record.sample_id.clone(),
            taxon_group,
            group,
            subgroup,
            source_subgroup,
            proportion: record.proportion,
            hex,
        });
    }

    debug!(
        "Assigned {} colors to {} rows ({} palette family)",
        entries.len(),
        records.len(),
        family.as_str()
    );

    Ok(PlotData {
        data: AnnotatedTable {
            group_field: options.key.group_field.clone(),
            subgroup_field: options.key.subgroup_field.clone(),
            sample_ids: table.sample_ids().to_vec(),
            records,
        },
        colors: ColorTable {
            group_field: options.key.group_field.clone(),
            subgroup_field: options.key.subgroup_field.clone(),
            family,
            selected_groups: options.selected_groups.clone(),
            entries,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PreparedRecord;

    fn record(sample: &str, phylum: Option<&str>, genus: Option<&str>, proportion: f64) -> PreparedRecord {
        PreparedRecord {
            sample_id: sample.to_string(),
            lineage: vec![phylum.map(str::to_string), genus.map(str::to_string)],
            proportion,
        }
    }

    fn create_test_table() -> PreparedTable {
        PreparedTable::new(
            vec!["Phylum".into(), "Genus".into()],
            vec!["S1".into(), "S2".into()],
            vec![
                record("S1", Some("Firmicutes"), Some("Blautia"), 0.2),
                record("S1", Some("Firmicutes"), Some("Roseburia"), 0.3),
                record("S1", Some("Bacteroidetes"), Some("Bacteroides"), 0.4),
                record("S1", Some("Proteobacteria"), Some("Escherichia"), 0.1),
                record("S2", Some("Firmicutes"), Some("Blautia"), 0.5),
                record("S2", Some("Firmicutes"), None, 0.1),
                record("S2", Some("Bacteroidetes"), Some("Prevotella"), 0.3),
                record("S2", None, None, 0.1),
            ],
        )
        .unwrap()
    }

    fn options(groups: &[&str]) -> AssignOptions {
        AssignOptions::new(groups, GroupingKey::new("Phylum", "Genus"))
    }

    #[test]
    fn test_shades_follow_abundance() {
        let plot = assign_colors(&create_test_table(), &options(&["Firmicutes", "Bacteroidetes"])).unwrap();
        let firmicutes = plot.colors.group_entries("Firmicutes");
        let names: Vec<&str> = firmicutes.iter().map(|e| e.subgroup.as_str()).collect();
        // Blautia 0.7, Roseburia 0.3, Unassigned 0.1
        assert_eq!(names, vec!["Blautia", "Roseburia", "Unassigned"]);
        let shades: Vec<usize> = firmicutes.iter().map(|e| e.shade).collect();
        assert_eq!(shades, vec![4, 3, 2]);
        assert!(firmicutes.iter().all(|e| e.palette == "micro_green"));
        assert_eq!(firmicutes[0].hex, "#238B45");

        let bacteroidetes = plot.colors.group_entries("Bacteroidetes");
        assert!(bacteroidetes.iter().all(|e| e.palette == "micro_orange"));
        assert_eq!(bacteroidetes[0].subgroup, "Bacteroides");
    }

    #[test]
    fn test_other_bucket_is_single_gray() {
        let plot = assign_colors(&create_test_table(), &options(&["Firmicutes", "Bacteroidetes"])).unwrap();
        let other = plot.colors.group_entries(OTHER);
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].palette, "micro_gray");
        assert_eq!(other[0].hex, "#969696");
        assert_eq!(other[0].group_order, 2);
        assert!((other[0].total - 0.2).abs() < 1e-12);

        let other_rows: Vec<&AnnotatedRecord> =
            plot.data.records.iter().filter(|r| r.group == OTHER).collect();
        assert_eq!(other_rows.len(), 2);
        assert!(other_rows.iter().all(|r| r.subgroup == OTHER && r.hex == "#969696"));
        assert_eq!(other_rows[1].taxon_group, UNASSIGNED);
    }

    #[test]
    fn test_cvd_family() {
        let plot = assign_colors(&create_test_table(), &options(&["Firmicutes"]).cvd(true)).unwrap();
        assert_eq!(plot.colors.family, PaletteFamily::Cvd);
        assert_eq!(plot.colors.lookup("Firmicutes", "Blautia").unwrap().palette, "micro_cvd_green");
        assert_eq!(plot.colors.lookup(OTHER, OTHER).unwrap().palette, "micro_cvd_gray");
    }

    #[test]
    fn test_rows_joined_with_colors() {
        let plot = assign_colors(&create_test_table(), &options(&["Firmicutes", "Bacteroidetes"])).unwrap();
        assert_eq!(plot.data.records.len(), 8);
        for row in &plot.data.records {
            let entry = plot.colors.lookup(&row.group, &row.subgroup).unwrap();
            assert_eq!(row.hex, entry.hex);
        }
    }

    #[test]
    fn test_deterministic() {
        let table = create_test_table();
        let opts = options(&["Bacteroidetes", "Firmicutes"]);
        let a = assign_colors(&table, &opts).unwrap();
        let b = assign_colors(&table, &opts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_selection_order_picks_palette() {
        let plot = assign_colors(&create_test_table(), &options(&["Bacteroidetes", "Firmicutes"])).unwrap();
        assert_eq!(plot.colors.lookup("Bacteroidetes", "Bacteroides").unwrap().palette, "micro_green");
        assert_eq!(plot.colors.lookup("Firmicutes", "Blautia").unwrap().palette, "micro_orange");
        assert_eq!(plot.colors.groups(), vec!["Bacteroidetes", "Firmicutes", OTHER]);
    }

    #[test]
    fn test_max_shades_collapses() {
        let plot = assign_colors(&create_test_table(), &options(&["Firmicutes"]).max_shades(2)).unwrap();
        let firmicutes = plot.colors.group_entries("Firmicutes");
        assert_eq!(firmicutes.len(), 2);
        assert_eq!(firmicutes[0].subgroup, "Blautia");
        assert_eq!(firmicutes[0].shade, 4);
        assert_eq!(firmicutes[1].subgroup, "Other Firmicutes");
        assert_eq!(firmicutes[1].shade, 3);
        let roseburia = plot
            .data
            .records
            .iter()
            .find(|r| r.source_subgroup == "Roseburia")
            .unwrap();
        assert_eq!(roseburia.subgroup, "Other Firmicutes");
    }

    #[test]
    fn test_absent_selected_group_keeps_palette_slot() {
        let plot = assign_colors(
            &create_test_table(),
            &options(&["Actinobacteria", "Firmicutes"]),
        )
        .unwrap();
        assert!(plot.colors.group_entries("Actinobacteria").is_empty());
        assert_eq!(plot.colors.lookup("Firmicutes", "Blautia").unwrap().palette, "micro_orange");
    }

    #[test]
    fn test_too_many_groups() {
        let result = assign_colors(&create_test_table(), &options(&["A", "B", "C", "D", "E", "F"]));
        assert!(matches!(
            result,
            Err(MicroshadesError::PaletteExhaustion {
                requested: 6,
                available: 5
            })
        ));
    }

    #[test]
    fn test_missing_field() {
        let opts = AssignOptions::new(&["Firmicutes"], GroupingKey::new("Phylum", "Species"));
        assert!(matches!(
            assign_colors(&create_test_table(), &opts),
            Err(MicroshadesError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_invalid_selection() {
        let table = create_test_table();
        assert!(assign_colors(&table, &options(&[])).is_err());
        assert!(assign_colors(&table, &options(&["Firmicutes", "Firmicutes"])).is_err());
        assert!(assign_colors(&table, &options(&["Other"])).is_err());
    }
}
