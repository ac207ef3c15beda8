//! 分割基准批处理程序.
//!
//! `manual` 子命令从导出的人工标注图层生成人工分割掩膜;
//! `match` 子命令将两个自动分割流程的颗粒与人工颗粒匹配, 并写出所有表格.

mod manual;
mod profile;
mod result;
mod runner;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use seg_berry::consts::{ALPHA_THRESHOLD, DEFAULT_PROPERTIES, MIN_AREA};
use seg_berry::matching::MatchPolicy;
use seg_berry::measure::Property;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "segbench")]
#[command(about = "Underwater particle segmentation benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Dataset root directory. Defaults to $HOME/dataset/segmentation_benchmark
    #[arg(long, global = true, env = utils::loader::DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Number of worker threads. Defaults to the number of cpus
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Abort on the first malformed frame instead of skipping it
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Turn exported annotation layers into manual masks, particles and EcoTaxa files
    Manual {
        /// Minimum particle area in pixels; smaller or equal regions are dropped
        #[arg(long, default_value_t = MIN_AREA)]
        min_area: usize,

        /// Alpha level (0-255) above which a pixel belongs to a particle
        #[arg(long, default_value_t = ALPHA_THRESHOLD)]
        alpha_threshold: u8,

        /// Sample (transect) identifier
        #[arg(long, default_value = "")]
        sample_id: String,

        /// Comma separated region properties to measure
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PROPERTIES.map(String::from))]
        properties: Vec<String>,
    },

    /// Match automated particles against manual particles
    Match {
        /// `iou`, `iou:<threshold>` or `strict`
        #[arg(long, default_value = "iou")]
        policy: MatchPolicy,

        /// Comma separated region properties to measure
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PROPERTIES.map(String::from))]
        properties: Vec<String>,

        /// Join manual particles with the taxonomy export
        #[arg(long)]
        taxonomy: bool,

        /// Output directory. Defaults to <data-dir>/matches_bbox
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).env().init()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads.unwrap_or_else(utils::cpus))
        .build_global()?;

    let layout = utils::loader::layout(cli.data_dir)
        .context("cannot locate the dataset directory, pass --data-dir")?;

    let result = match cli.command {
        Command::Manual {
            min_area,
            alpha_threshold,
            sample_id,
            properties,
        } => {
            let config = manual::ManualConfig {
                min_area,
                alpha_threshold,
                sample_id,
                properties: Property::parse_list(&properties)?,
                fail_fast: cli.fail_fast,
            };
            manual::run(&layout, &config)?
        }
        Command::Match {
            policy,
            properties,
            taxonomy,
            output,
        } => {
            let config = runner::MatchConfig {
                policy,
                properties: Property::parse_list(&properties)?,
                taxonomy,
                fail_fast: cli.fail_fast,
                output,
            };
            runner::run(&layout, &config)?
        }
    };
    result.analyze()?;
    Ok(())
}
