use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::Parser;
use log::info;

use qdm_builder::utils::logging::{create_spinner, finish_progress_bar, print_build_summary};
use qdm_builder::{
    BuilderConfig, CodeLookup, CodeTable, MeasurementPeriod, NoCodeLookup, OrphanPolicy,
    ParquetQueryExecutor, QdmBuilder, RequestContext, SourceRegistry,
};

#[derive(Parser, Debug)]
#[command(
    name = "qdm-builder",
    about = "Build per-patient QDM models from a directory of Parquet tables."
)]
struct Args {
    /// Directory holding one Parquet file or directory per table
    data_dir: PathBuf,

    /// Only build these subjects (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    subjects: Vec<String>,

    /// Start of the measurement period (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// End of the measurement period (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Only sweep these categories (comma separated)
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// JSON builder configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON code table used to resolve display terms
    #[arg(long)]
    codes: Option<PathBuf>,

    /// Sweep categories in parallel
    #[arg(long)]
    parallel: bool,

    /// Abort when a record references a subject that was not enumerated
    #[arg(long)]
    fail_on_orphans: bool,

    /// Show a progress bar during the category sweep
    #[arg(long)]
    progress: bool,

    /// Write patients to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a per-category summary when done
    #[arg(long)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BuilderConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => BuilderConfig::default(),
    };
    config.parallel |= args.parallel;
    config.show_progress |= args.progress;
    if args.fail_on_orphans {
        config.orphan_policy = OrphanPolicy::Fail;
    }

    let codes: Arc<dyn CodeLookup> = match &args.codes {
        Some(path) => Arc::new(
            CodeTable::from_json_file(path)
                .with_context(|| format!("Failed to load code table {}", path.display()))?,
        ),
        None => Arc::new(NoCodeLookup),
    };

    let executor = ParquetQueryExecutor::new(&args.data_dir)
        .with_context(|| format!("Invalid data directory {}", args.data_dir.display()))?
        .with_batch_size(config.batch_size)
        .with_date_formats(config.date_formats.clone());

    let registry = if args.categories.is_empty() {
        SourceRegistry::standard()
    } else {
        Arc::new(SourceRegistry::standard_subset(&args.categories)?)
    };

    let mut ctx = if args.subjects.is_empty() {
        RequestContext::all()
    } else {
        RequestContext::for_subjects(args.subjects.iter().cloned())
    };
    match (args.start, args.end) {
        (Some(start), Some(end)) => ctx = ctx.with_period(MeasurementPeriod::new(start, end)?),
        (None, None) => {}
        _ => bail!("--start and --end must be given together"),
    }

    let builder = QdmBuilder::with_registry(Arc::new(executor), codes, registry, config)?;
    let output = builder
        .build_with_report(&ctx)
        .context("QDM build failed")?;

    let spinner = create_spinner(Some("Writing patients"));
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &output.patients)?;
            writer.flush()?;
            info!("Wrote {} patients to {}", output.patients.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &output.patients)?;
            writeln!(stdout)?;
        }
    }
    finish_progress_bar(&spinner, Some("Done"));

    if args.summary {
        print_build_summary(&output.report);
    }

    Ok(())
}
