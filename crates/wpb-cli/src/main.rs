//! wpb CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use wpb_columnar::EventBatch;
use wpb_core::{Period, Variation};
use wpb_processor::{ChunkOutput, FeatureTable, LeptonFlavor, RunMetadata, ZToLLProcessor};

mod job;

#[derive(Parser)]
#[command(name = "wpb")]
#[command(about = "wpb - Z->ll control-region event selection, corrections and weights")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process event chunks and write the merged output
    Run {
        /// Job configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Event chunk (JSON). Repeat for several chunks.
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Lepton channel {ele, mu}
        #[arg(long)]
        lepton_flavor: LeptonFlavor,

        /// Data-taking period {2016APV, 2016, 2017, 2018}
        #[arg(long)]
        year: Period,

        /// Systematic variation (nominal, or a single shift such as JESUp)
        #[arg(long, default_value = "nominal")]
        syst: String,

        /// Processor name
        #[arg(long, default_value = "ztoll")]
        processor: String,

        /// Channel label, recorded in the output
        #[arg(long, default_value = "")]
        channel: String,

        /// Sample key, recorded in the output
        #[arg(long, default_value = "")]
        sample: String,

        /// Output type
        #[arg(long, default_value = "array")]
        output_type: String,

        /// Partitions to run, 1-based over the inputs (e.g. 1,2,3). Defaults to all.
        #[arg(long)]
        nsample: Option<String>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Validate a job configuration without processing events
    CheckConfig {
        /// Job configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Only check this period. Defaults to every period.
        #[arg(long)]
        year: Option<Period>,

        /// Only check this channel. Defaults to both.
        #[arg(long)]
        lepton_flavor: Option<LeptonFlavor>,
    },

    /// Print version information
    Version,
}

/// Job parameters echoed into the output.
#[derive(Debug, Serialize)]
struct JobInfo {
    processor: String,
    channel: String,
    lepton_flavor: LeptonFlavor,
    sample: String,
    year: Period,
    syst: String,
    output_type: String,
    nsample: Vec<usize>,
    inputs: Vec<PathBuf>,
}

/// Top-level output document. Serialized directly so column and weight
/// order survive.
#[derive(Serialize)]
struct RunOutput<'a> {
    job: &'a JobInfo,
    metadata: &'a RunMetadata,
    arrays: &'a FeatureTable,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            config,
            input,
            lepton_flavor,
            year,
            syst,
            processor,
            channel,
            sample,
            output_type,
            nsample,
            output,
            threads,
        } => {
            if processor != "ztoll" {
                bail!("unknown processor '{processor}' (supported: ztoll)");
            }
            if output_type != "array" {
                bail!("unsupported output type '{output_type}' (supported: array)");
            }
            let partitions = parse_partitions(nsample.as_deref(), input.len())?;
            let inputs: Vec<PathBuf> = partitions.iter().map(|&i| input[i - 1].clone()).collect();
            let info = JobInfo {
                processor,
                channel,
                lepton_flavor,
                sample,
                year,
                syst,
                output_type,
                nsample: partitions,
                inputs,
            };
            cmd_run(&config, info, output.as_ref(), threads)
        }
        Commands::CheckConfig { config, year, lepton_flavor } => cmd_check_config(&config, year, lepton_flavor),
        Commands::Version => {
            println!("wpb {}", wpb_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_run(config: &Path, info: JobInfo, output: Option<&PathBuf>, threads: usize) -> Result<()> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    let job = job::read_job_config(config)?;
    let processor_config =
        job.processor_config(info.year, info.lepton_flavor, Variation::from(info.syst.as_str()))?;
    let processor = ZToLLProcessor::new(processor_config).context("invalid processor configuration")?;

    let outputs: Vec<Result<ChunkOutput>> =
        info.inputs.par_iter().map(|path| process_chunk(&processor, path)).collect();
    let mut total = ChunkOutput::default();
    for out in outputs {
        total.merge(out?).context("merging chunk outputs")?;
    }
    tracing::info!(
        chunks = info.inputs.len(),
        events_before = total.metadata.events_before,
        events_after = total.metadata.events_after,
        sumw = total.metadata.sumw,
        "run complete"
    );

    let doc = RunOutput { job: &info, metadata: &total.metadata, arrays: &total.arrays };
    write_json(output, &doc)
}

fn process_chunk(processor: &ZToLLProcessor, path: &Path) -> Result<ChunkOutput> {
    tracing::info!(path = %path.display(), "loading chunk");
    let bytes = std::fs::read(path).with_context(|| format!("reading chunk {}", path.display()))?;
    let events: EventBatch =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing chunk {}", path.display()))?;
    let out = processor.process(&events).with_context(|| format!("processing chunk {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        events = out.metadata.events_before,
        selected = out.metadata.events_after,
        "chunk processed"
    );
    Ok(out)
}

fn cmd_check_config(config: &Path, year: Option<Period>, flavor: Option<LeptonFlavor>) -> Result<()> {
    let job = job::read_job_config(config)?;
    let periods: Vec<Period> = year.map_or_else(|| Period::all().to_vec(), |p| vec![p]);
    let flavors: Vec<LeptonFlavor> = flavor.map_or_else(|| vec![LeptonFlavor::Ele, LeptonFlavor::Mu], |f| vec![f]);
    for &period in &periods {
        for &flavor in &flavors {
            let processor_config = job.processor_config(period, flavor, Variation::Nominal)?;
            ZToLLProcessor::new(processor_config)
                .with_context(|| format!("invalid configuration for {period} / {flavor}"))?;
            println!("{period} {flavor}: ok");
        }
    }
    Ok(())
}

/// Parse `--nsample 1,2,3` into sorted, deduplicated 1-based partition indices.
fn parse_partitions(list: Option<&str>, n_inputs: usize) -> Result<Vec<usize>> {
    let Some(list) = list else {
        return Ok((1..=n_inputs).collect());
    };
    let mut out = Vec::new();
    for part in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let i: usize = part.parse().with_context(|| format!("invalid partition '{part}'"))?;
        if i == 0 || i > n_inputs {
            bail!("partition {i} out of range (1..={n_inputs})");
        }
        out.push(i);
    }
    out.sort_unstable();
    out.dedup();
    if out.is_empty() {
        bail!("--nsample selects no partitions");
    }
    Ok(out)
}

fn write_json<T: Serialize>(output: Option<&PathBuf>, value: &T) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
