//! Pipeline composition and execution for microshades plots.

mod runner;

pub use runner::{plot_microshades, Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
