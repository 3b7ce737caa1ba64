//! microshades - stacked abundance plots with colorblind-aware shading
//!
//! Command-line interface for the microshades plot pipeline.

use clap::{Parser, Subcommand, ValueEnum};
use microshades::assign::{AssignOptions, GroupingKey, ReorderOptions};
use microshades::data::{AbundanceTable, CountMatrix, Metadata, Taxonomy};
use microshades::error::Result;
use microshades::palette::{base_palettes, gray_palette, palette, palette_names, PaletteFamily};
use microshades::pipeline::{Pipeline, PipelineConfig};
use microshades::render::{plot_contributions, ContributionLevel, ContributionOptions, SummaryKind};
use std::path::{Path, PathBuf};

/// CLI-friendly summary kind
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSummaryKind {
    Mean,
    Median,
    Box,
}

impl From<CliSummaryKind> for SummaryKind {
    fn from(kind: CliSummaryKind) -> Self {
        match kind {
            CliSummaryKind::Mean => SummaryKind::Mean,
            CliSummaryKind::Median => SummaryKind::Median,
            CliSummaryKind::Box => SummaryKind::Box,
        }
    }
}

/// CLI-friendly contribution level
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLevel {
    Group,
    Subgroup,
}

impl From<CliLevel> for ContributionLevel {
    fn from(level: CliLevel) -> Self {
        match level {
            CliLevel::Group => ContributionLevel::Group,
            CliLevel::Subgroup => ContributionLevel::Subgroup,
        }
    }
}

/// Abundance-shaded stacked bar plots for microbiome data
#[derive(Parser)]
#[command(name = "microshades")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in palettes
    Palettes {
        /// Show the colorblind-friendly family
        #[arg(long)]
        cvd: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write an example pipeline configuration
    Example {
        /// Output path for the YAML file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Path to long-format abundance TSV, or a count matrix with --taxonomy
        #[arg(short, long)]
        abundance: PathBuf,

        /// Taxonomy TSV; treats --abundance as a features x samples count matrix
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// Output path for the chart JSON
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Plot with default settings
    Plot {
        /// Path to long-format abundance TSV, or a count matrix with --taxonomy
        #[arg(short, long)]
        abundance: PathBuf,

        /// Taxonomy TSV; treats --abundance as a features x samples count matrix
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// Rank choosing the palette
        #[arg(long, default_value = "Phylum")]
        group_rank: String,

        /// Rank choosing the shade
        #[arg(long, default_value = "Genus")]
        subgroup_rank: String,

        /// Comma-separated groups to color, at most five
        #[arg(short, long)]
        select: String,

        /// Use colorblind-friendly palettes
        #[arg(long)]
        cvd: bool,

        /// Output path for the chart JSON
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize group contributions within one covariate level
    Contributions {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Path to long-format abundance TSV, or a count matrix with --taxonomy
        #[arg(short, long)]
        abundance: PathBuf,

        /// Taxonomy TSV; treats --abundance as a features x samples count matrix
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Metadata column to filter on
        #[arg(long)]
        covariate: String,

        /// Value of the covariate to keep
        #[arg(long)]
        value: String,

        /// Summarize whole groups or each subgroup
        #[arg(long, value_enum, default_value = "group")]
        level: CliLevel,

        /// Summary statistic to chart
        #[arg(short, long, value_enum, default_value = "mean")]
        kind: CliSummaryKind,

        /// Output path for the chart JSON (prints a table if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Palettes { cvd, format } => cmd_palettes(cvd, &format),

        Commands::Example { output } => cmd_example(&output),

        Commands::Run {
            config,
            abundance,
            taxonomy,
            output,
        } => cmd_run(&config, &abundance, taxonomy.as_deref(), &output),

        Commands::Plot {
            abundance,
            taxonomy,
            group_rank,
            subgroup_rank,
            select,
            cvd,
            output,
        } => cmd_plot(
            &abundance,
            taxonomy.as_deref(),
            &group_rank,
            &subgroup_rank,
            &select,
            cvd,
            &output,
        ),

        Commands::Contributions {
            config,
            abundance,
            taxonomy,
            metadata,
            covariate,
            value,
            level,
            kind,
            output,
        } => cmd_contributions(
            &config,
            &abundance,
            taxonomy.as_deref(),
            &metadata,
            ContributionOptions::new(&covariate, &value, level.into()),
            kind.into(),
            output.as_deref(),
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load the abundance table from either input layout.
fn load_table(abundance_path: &Path, taxonomy_path: Option<&Path>) -> Result<AbundanceTable> {
    eprintln!("Loading data...");
    let table = match taxonomy_path {
        Some(taxonomy_path) => {
            let counts = CountMatrix::from_tsv(abundance_path)?;
            let taxonomy = Taxonomy::from_tsv(taxonomy_path)?;
            eprintln!(
                "Loaded {} features x {} samples",
                counts.n_features(),
                counts.n_samples()
            );
            AbundanceTable::from_count_matrix(&counts, &taxonomy)?
        }
        None => AbundanceTable::from_tsv(abundance_path)?,
    };
    eprintln!(
        "Loaded {} records over {} samples (ranks: {})",
        table.n_records(),
        table.sample_ids().len(),
        table.ranks().join(", ")
    );
    Ok(table)
}

fn load_config(config_path: &Path) -> Result<PipelineConfig> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    PipelineConfig::from_yaml(&config_str)
}

/// List palettes
fn cmd_palettes(cvd: bool, format: &str) -> Result<()> {
    let family = PaletteFamily::from_cvd(cvd);
    match format {
        "json" => {
            let mut listing = serde_json::Map::new();
            for name in palette_names(family) {
                listing.insert(name.to_string(), serde_json::json!(palette(name)?.hexes()));
            }
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        _ => {
            println!("{} palettes (lightest to darkest)", family.as_str());
            for name in palette_names(family) {
                println!("  {:<22} {}", name, palette(name)?.hexes().join(" "));
            }
            let order: Vec<&str> = base_palettes(family).iter().map(|p| p.name()).collect();
            println!();
            println!("Assignment order: {}", order.join(", "));
            println!("Reserved for Other: {}", gray_palette(family).name());
        }
    }
    Ok(())
}

/// Write an example configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-microshades")
        .prepare_at_rank("Genus")
        .assign(
            AssignOptions::new(
                &["Proteobacteria", "Actinobacteria", "Bacteroidetes", "Firmicutes"],
                GroupingKey::new("Phylum", "Genus"),
            )
            .cvd(true),
        )
        .extend_group("Firmicutes", "micro_cvd_purple", "micro_purple", 2)
        .reorder_samples(ReorderOptions::default());

    let config = pipeline.to_config(Some(
        "Example microshades pipeline: four phyla, Firmicutes extended by two genera",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

/// Run a pipeline from configuration
fn cmd_run(config_path: &Path, abundance_path: &Path, taxonomy_path: Option<&Path>, output_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let table = load_table(abundance_path, taxonomy_path)?;

    eprintln!("Running pipeline '{}'...", config.name);
    let output = Pipeline::from_config(&config).run(&table)?;

    eprintln!("Writing chart to {:?}...", output_path);
    std::fs::write(output_path, serde_json::to_string_pretty(&output)?)?;

    eprintln!(
        "Done! {} bars, {} legend entries",
        output.chart.bars.len(),
        output.legend.entries().count()
    );
    Ok(())
}

/// Plot with default pipeline settings
fn cmd_plot(
    abundance_path: &Path,
    taxonomy_path: Option<&Path>,
    group_rank: &str,
    subgroup_rank: &str,
    select: &str,
    cvd: bool,
    output_path: &Path,
) -> Result<()> {
    let table = load_table(abundance_path, taxonomy_path)?;
    let selected: Vec<&str> = select.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect();

    eprintln!("Coloring {} by {}...", selected.join(", "), subgroup_rank);
    let output = microshades::pipeline::plot_microshades(&table, &selected, group_rank, subgroup_rank, cvd)?;

    std::fs::write(output_path, serde_json::to_string_pretty(&output)?)?;
    eprintln!("Wrote chart to {:?}", output_path);

    for entry in output.plot.colors.ordered() {
        eprintln!("  {:<20} {:<30} {}", entry.group, entry.subgroup, entry.hex);
    }
    Ok(())
}

/// Summarize contributions within a covariate level
fn cmd_contributions(
    config_path: &Path,
    abundance_path: &Path,
    taxonomy_path: Option<&Path>,
    metadata_path: &Path,
    options: ContributionOptions,
    kind: SummaryKind,
    output_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let table = load_table(abundance_path, taxonomy_path)?;
    let metadata = Metadata::from_tsv(metadata_path)?;

    let output = Pipeline::from_config(&config).run(&table)?;
    let chart = plot_contributions(&output.plot, &metadata, &options, kind)?;

    match output_path {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&chart)?)?;
            eprintln!("Wrote contribution chart to {:?}", path);
        }
        None => {
            println!("{}", chart.title);
            for summary in &chart.summaries {
                println!("  {}", summary);
            }
        }
    }
    Ok(())
}
