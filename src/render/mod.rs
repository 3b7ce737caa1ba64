//! Chart value objects built from a [`PlotData`](crate::assign::PlotData).
//!
//! Nothing here draws pixels. Each builder returns a serializable
//! description (positions, colors, labels, stacking order) that an external
//! plotting or layout library turns into graphics.

mod chart;
mod contribution;
mod legend;

pub use chart::{plot_stacked_bars, Bar, ChartOptions, FillScale, Segment, StackDirection, StackedBarChart};
pub use contribution::{
    plot_contributions, summarize_contributions, ContributionChart, ContributionLevel,
    ContributionOptions, ContributionSummary, SummaryKind,
};
pub use legend::{custom_legend, Legend, LegendColumn, LegendEntry, LegendOptions, Orientation};
