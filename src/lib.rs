//! Microshades: abundance-shaded color assignment for microbiome plots
//!
//! This library turns a taxonomic abundance table into the data behind a
//! stacked bar chart in which each selected top-rank group (e.g. a phylum)
//! gets its own palette and its subgroups (e.g. genera) are shaded from
//! dark to light by abundance.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **palette**: Built-in standard and colorblind-friendly palettes
//! - **data**: Core data structures (AbundanceTable, CountMatrix, Taxonomy, Metadata)
//! - **prepare**: Aggregation to a rank and conversion to proportions
//! - **assign**: Color assignment, group extension and sample ordering
//! - **render**: Stacked bar chart, legend and contribution chart objects
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use microshades::prelude::*;
//!
//! // Load data
//! let table = AbundanceTable::from_tsv("abundance.tsv").unwrap();
//!
//! // Run plot pipeline
//! let output = Pipeline::new()
//!     .prepare_at_rank("Genus")
//!     .assign_colors(&["Firmicutes", "Bacteroidetes"], "Phylum", "Genus")
//!     .extend_group("Firmicutes", "micro_green", "micro_green", 2)
//!     .reorder_samples(ReorderOptions::default())
//!     .run(&table)
//!     .unwrap();
//! ```

pub mod assign;
pub mod data;
pub mod error;
pub mod palette;
pub mod pipeline;
pub mod prepare;
pub mod render;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::assign::{
        assign_colors, extend_group, reorder_samples, sample_ordering, AnnotatedRecord,
        AnnotatedTable, AssignOptions, ColorAssignment, ColorTable, ExtendRequest, GroupingKey,
        PlotData, ReorderOptions, SubgroupRef, OTHER,
    };
    pub use crate::data::{
        AbundanceRecord, AbundanceTable, CountMatrix, Metadata, PreparedRecord, PreparedTable,
        Taxonomy, Variable,
    };
    pub use crate::error::{MicroshadesError, Result};
    pub use crate::palette::{palette, palette_names, Palette, PaletteFamily};
    pub use crate::pipeline::{plot_microshades, Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
    pub use crate::prepare::{prepare, relative_abundance, PrepareOptions, ProportionMatrix};
    pub use crate::render::{
        custom_legend, plot_contributions, plot_stacked_bars, summarize_contributions,
        ChartOptions, ContributionLevel, ContributionOptions, ContributionSummary, Legend,
        LegendOptions, Orientation, StackDirection, StackedBarChart, SummaryKind,
    };
}
