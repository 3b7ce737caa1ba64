//! Pipeline runner for composing and executing plot steps.

use crate::assign::{
    assign_colors, extend_group, reorder_samples, AssignOptions, ExtendRequest, GroupingKey,
    PlotData, ReorderOptions,
};
use crate::data::{AbundanceTable, PreparedTable};
use crate::error::{MicroshadesError, Result};
use crate::prepare::{prepare, PrepareOptions};
use crate::render::{
    custom_legend, plot_stacked_bars, ChartOptions, Legend, LegendOptions, StackedBarChart,
};
use log::info;
use serde::{Deserialize, Serialize};

/// A step in the plot pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Aggregate to a rank and convert to proportions.
    Prepare(PrepareOptions),
    /// Give selected groups palettes and subgroups shades.
    AssignColors(AssignOptions),
    /// Re-shade one group with more shades.
    ExtendGroup(ExtendRequest),
    /// Reorder the sample axis.
    ReorderSamples(ReorderOptions),
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
    #[serde(default)]
    pub chart: ChartOptions,
    #[serde(default)]
    pub legend: LegendOptions,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(MicroshadesError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(MicroshadesError::from)
    }
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub name: String,
    pub plot: PlotData,
    pub chart: StackedBarChart,
    pub legend: Legend,
}

/// Builder for constructing and running plot pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
    chart: ChartOptions,
    legend: LegendOptions,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
            chart: ChartOptions::default(),
            legend: LegendOptions::default(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
            chart: config.chart.clone(),
            legend: config.legend.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Prepare with explicit options.
    pub fn prepare(mut self, options: PrepareOptions) -> Self {
        self.steps.push(PipelineStep::Prepare(options));
        self
    }

    /// Prepare at a rank, dropping missing and zero rows.
    pub fn prepare_at_rank(self, rank: &str) -> Self {
        self.prepare(PrepareOptions::at_rank(rank))
    }

    /// Assign colors with explicit options.
    pub fn assign(mut self, options: AssignOptions) -> Self {
        self.steps.push(PipelineStep::AssignColors(options));
        self
    }

    /// Assign standard palettes to `selected` groups.
    pub fn assign_colors(self, selected: &[&str], group_field: &str, subgroup_field: &str) -> Self {
        self.assign(AssignOptions::new(selected, GroupingKey::new(group_field, subgroup_field)))
    }

    /// Add `n_add` shades to a group.
    pub fn extend_group(mut self, group: &str, existing_palette: &str, new_palette: &str, n_add: isize) -> Self {
        self.steps.push(PipelineStep::ExtendGroup(ExtendRequest::new(
            group,
            existing_palette,
            new_palette,
            n_add,
        )));
        self
    }

    /// Reorder samples.
    pub fn reorder_samples(mut self, options: ReorderOptions) -> Self {
        self.steps.push(PipelineStep::ReorderSamples(options));
        self
    }

    /// Set the chart labels and stacking.
    pub fn chart(mut self, options: ChartOptions) -> Self {
        self.chart = options;
        self
    }

    /// Set the legend layout.
    pub fn legend(mut self, options: LegendOptions) -> Self {
        self.legend = options;
        self
    }

    /// Get the steps.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Convert to a serializable config.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(|s| s.to_string()),
            steps: self.steps.clone(),
            chart: self.chart.clone(),
            legend: self.legend.clone(),
        }
    }

    /// Run the pipeline on an abundance table.
    pub fn run(&self, table: &AbundanceTable) -> Result<PipelineOutput> {
        info!("Running pipeline '{}' with {} steps", self.name, self.steps.len());
        let mut state = PipelineState::default();
        for (i, step) in self.steps.iter().enumerate() {
            info!("Step {}/{}: {}", i + 1, self.steps.len(), step.label());
            state = state.apply(table, step)?;
        }
        self.finalize(state)
    }

    fn finalize(&self, state: PipelineState) -> Result<PipelineOutput> {
        let plot = state.plot.ok_or_else(|| {
            MicroshadesError::Pipeline("Pipeline must include a color assignment step".to_string())
        })?;
        let chart = plot_stacked_bars(&plot, &self.chart)?;
        let legend = custom_legend(&plot.colors, &self.legend)?;
        Ok(PipelineOutput {
            name: self.name.clone(),
            plot,
            chart,
            legend,
        })
    }
}

impl PipelineStep {
    fn label(&self) -> String {
        match self {
            PipelineStep::Prepare(o) => {
                format!("prepare at {}", o.rank.as_deref().unwrap_or("deepest rank"))
            }
            PipelineStep::AssignColors(o) => format!(
                "assign colors to {} groups by {}/{}",
                o.selected_groups.len(),
                o.key.group_field,
                o.key.subgroup_field
            ),
            PipelineStep::ExtendGroup(r) => format!("extend '{}' by {}", r.group, r.n_add),
            PipelineStep::ReorderSamples(o) => match &o.by {
                Some(by) => format!("reorder samples by {}/{}", by.group, by.subgroup),
                None => "reorder samples by most abundant subgroup".to_string(),
            },
        }
    }
}

/// Internal state during pipeline execution.
#[derive(Default)]
struct PipelineState {
    prepared: Option<PreparedTable>,
    key: Option<GroupingKey>,
    plot: Option<PlotData>,
}

impl PipelineState {
    fn apply(mut self, table: &AbundanceTable, step: &PipelineStep) -> Result<Self> {
        match step {
            PipelineStep::Prepare(options) => {
                self.prepared = Some(prepare(table, options)?);
                self.key = None;
                self.plot = None;
            }
            PipelineStep::AssignColors(options) => {
                let prepared = self.prepared.as_ref().ok_or_else(|| {
                    MicroshadesError::Pipeline("Must prepare before assigning colors".to_string())
                })?;
                self.plot = Some(assign_colors(prepared, options)?);
                self.key = Some(options.key.clone());
            }
            PipelineStep::ExtendGroup(request) => {
                let (plot, key) = self.plot.as_ref().zip(self.key.as_ref()).ok_or_else(|| {
                    MicroshadesError::Pipeline("Must assign colors before extending a group".to_string())
                })?;
                self.plot = Some(extend_group(plot, key, request)?);
            }
            PipelineStep::ReorderSamples(options) => {
                let plot = self.plot.as_ref().ok_or_else(|| {
                    MicroshadesError::Pipeline("Must assign colors before reordering samples".to_string())
                })?;
                self.plot = Some(reorder_samples(plot, options)?);
            }
        }
        Ok(self)
    }
}

/// Convenience function: prepare at the subgroup rank, assign colors and
/// order samples by the most abundant subgroup.
pub fn plot_microshades(
    table: &AbundanceTable,
    selected: &[&str],
    group_field: &str,
    subgroup_field: &str,
    cvd: bool,
) -> Result<PipelineOutput> {
    let options = AssignOptions::new(selected, GroupingKey::new(group_field, subgroup_field)).cvd(cvd);
    Pipeline::new()
        .name("microshades")
        .prepare_at_rank(subgroup_field)
        .assign(options)
        .reorder_samples(ReorderOptions::default())
        .run(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AbundanceRecord;

    fn create_test_table() -> AbundanceTable {
        let ranks = vec!["Phylum".to_string(), "Genus".to_string(), "Species".to_string()];
        let mut records = Vec::new();
        let rows: [(&str, &str, &str, f64); 7] = [
            ("Firmicutes", "Blautia", "B. obeum", 40.0),
            ("Firmicutes", "Blautia", "B. wexlerae", 20.0),
            ("Firmicutes", "Roseburia", "R. intestinalis", 30.0),
            ("Bacteroidetes", "Bacteroides", "B. fragilis", 50.0),
            ("Bacteroidetes", "Prevotella", "P. copri", 10.0),
            ("Proteobacteria", "Escherichia", "E. coli", 15.0),
            ("Actinobacteria", "Bifidobacterium", "B. longum", 35.0),
        ];
        for (k, sample) in ["S1", "S2", "S3"].iter().enumerate() {
            for (p, g, s, a) in rows.iter() {
                let abundance = a * (k as f64 + 1.0) + if *g == "Prevotella" { 40.0 * k as f64 } else { 0.0 };
                records.push(AbundanceRecord::new(sample, &[Some(*p), Some(*g), Some(*s)], abundance));
            }
        }
        AbundanceTable::new(ranks, records).unwrap()
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .prepare_at_rank("Genus")
            .assign_colors(&["Firmicutes", "Bacteroidetes"], "Phylum", "Genus")
            .extend_group("Firmicutes", "micro_orange", "micro_orange", 1)
            .reorder_samples(ReorderOptions::default());

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.steps.len(), 4);
        assert_eq!(config.description.as_deref(), Some("Test pipeline"));
    }

    #[test]
    fn test_pipeline_run() {
        let output = Pipeline::new()
            .name("gut")
            .prepare_at_rank("Genus")
            .assign_colors(&["Firmicutes", "Bacteroidetes"], "Phylum", "Genus")
            .reorder_samples(ReorderOptions::default().by("Bacteroidetes", "Prevotella"))
            .run(&create_test_table())
            .unwrap();

        assert_eq!(output.name, "gut");
        assert_eq!(output.chart.bars.len(), 3);
        // Prevotella grows with the sample index.
        assert_eq!(output.plot.data.sample_ids, vec!["S3", "S2", "S1"]);
        assert_eq!(output.chart.samples, vec!["S3", "S2", "S1"]);
        assert_eq!(output.legend.columns.len(), 3);
        for bar in &output.chart.bars {
            assert!((bar.total() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pipeline_with_extend() {
        let output = Pipeline::new()
            .prepare_at_rank("Species")
            .assign_colors(&["Firmicutes"], "Phylum", "Species")
            .extend_group("Firmicutes", "micro_green", "micro_green", 2)
            .run(&create_test_table())
            .unwrap();
        let firmicutes = output.plot.colors.group_entries("Firmicutes");
        assert_eq!(firmicutes.len(), 3);
        assert_eq!(firmicutes[0].hex, "#238B45");
    }

    #[test]
    fn test_plot_microshades() {
        let output =
            plot_microshades(&create_test_table(), &["Bacteroidetes"], "Phylum", "Genus", true).unwrap();
        assert_eq!(output.plot.colors.family.as_str(), "cvd");
        assert_eq!(output.plot.colors.group_entries("Bacteroidetes")[0].palette, "micro_cvd_green");
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let pipeline = Pipeline::new()
            .name("example")
            .prepare_at_rank("Genus")
            .assign(
                AssignOptions::new(&["Firmicutes", "Bacteroidetes"], GroupingKey::new("Phylum", "Genus"))
                    .cvd(true)
                    .max_shades(4),
            )
            .extend_group("Firmicutes", "micro_cvd_orange", "micro_orange", 2)
            .reorder_samples(ReorderOptions::default());

        let config = pipeline.to_config(Some("Example microshades pipeline"));
        let yaml = config.to_yaml().unwrap();

        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.name, "example");
        assert_eq!(parsed.steps.len(), 4);
        assert_eq!(parsed, config);

        let rebuilt = Pipeline::from_config(&parsed);
        assert_eq!(rebuilt.steps(), pipeline.steps());
    }

    #[test]
    fn test_pipeline_error_handling() {
        let table = create_test_table();

        let result = Pipeline::new()
            .assign_colors(&["Firmicutes"], "Phylum", "Genus")
            .run(&table);
        assert!(matches!(result, Err(MicroshadesError::Pipeline(_))));

        let result = Pipeline::new()
            .prepare_at_rank("Genus")
            .extend_group("Firmicutes", "micro_green", "micro_green", 1)
            .run(&table);
        assert!(matches!(result, Err(MicroshadesError::Pipeline(_))));

        let result = Pipeline::new().prepare_at_rank("Genus").run(&table);
        assert!(matches!(result, Err(MicroshadesError::Pipeline(_))));
    }

    #[test]
    fn test_pipeline_propagates_step_errors() {
        let result = Pipeline::new()
            .prepare_at_rank("Genus")
            .assign_colors(&["Firmicutes"], "Phylum", "Family")
            .run(&create_test_table());
        assert!(matches!(result, Err(MicroshadesError::MissingColumn(_))));
    }
}
