/// dashtable report runner
///
/// Loads one dataset, runs its dashboard recipes and writes every panel as
/// `<panel>_data.csv` plus `kpis.json` into the output directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dashtable::report::{self, ReportConfig};
use dashtable::{load, FilterSpec, LoadOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DatasetKind {
    Ratings,
    Superstore,
}

#[derive(Parser)]
#[command(about = "Aggregate a ratings or superstore CSV into dashboard-ready tables.")]
struct Args {
    /// Which dashboard recipes to run.
    #[arg(value_enum)]
    kind: DatasetKind,

    /// Source CSV with a header row.
    input: PathBuf,

    /// Output directory (created when missing).
    #[arg(long, env = "DASHTABLE_OUT", default_value = "processed_data")]
    out: PathBuf,

    /// JSON file with report parameters; flags below override it.
    #[arg(long, env = "DASHTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum ratings for a group to be shown.
    #[arg(long, env = "DASHTABLE_MIN_COUNT")]
    min_count: Option<usize>,

    /// Share (percent) under which genres are folded into "Other".
    #[arg(long, env = "DASHTABLE_OTHER_THRESHOLD")]
    other_threshold: Option<f64>,

    /// Release-year smoothing window; 0 disables smoothing.
    #[arg(long, env = "DASHTABLE_SMOOTH")]
    smooth: Option<usize>,

    /// Keep only rows whose column has one of the values: `column=a,b,c`
    /// (repeatable).
    #[arg(long = "only")]
    only: Vec<String>,
}

fn parse_selection(arg: &str) -> Result<FilterSpec> {
    let (column, values) = arg
        .split_once('=')
        .with_context(|| format!("--only expects column=value[,value...], got '{}'", arg))?;
    let values: Vec<&str> = values.split(',').map(str::trim).filter(|v| !v.is_empty()).collect();
    Ok(FilterSpec::one_of(column.trim(), values))
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => report::read_config(path)
            .with_context(|| format!("reading report config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if let Some(min_count) = args.min_count {
        config.min_count = min_count;
    }
    if let Some(threshold) = args.other_threshold {
        config.other_threshold = threshold;
    }
    if let Some(window) = args.smooth {
        config.smoothing_window = window;
    }

    let options = match args.kind {
        DatasetKind::Ratings => LoadOptions::movie_ratings(),
        DatasetKind::Superstore => LoadOptions::superstore(),
    };
    let dataset = load(&args.input, &options)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let selection = args
        .only
        .iter()
        .map(|arg| parse_selection(arg))
        .collect::<Result<Vec<_>>>()?;
    let dataset = dataset.filter(&selection)?;

    let report = match args.kind {
        DatasetKind::Ratings => report::ratings_report(&dataset, &config)?,
        DatasetKind::Superstore => report::superstore_report(&dataset)?,
    };
    let written = report::write_report(&args.out, &report)?;

    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
