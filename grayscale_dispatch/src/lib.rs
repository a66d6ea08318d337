use anyhow::Result;
use log::info;
use std::time::Duration;

pub mod buffer;
pub mod codec;
pub mod dispatch;
pub mod driver;
pub mod kernel;
pub mod partition;

pub use buffer::{index_to_xy, Pixel, PixelBuffer, SharedPixels};
pub use codec::{decode_bytes, encode_jpeg, load_image, save_jpeg, CodecError};
pub use dispatch::{for_each_queued, process_with_channel};
pub use driver::{format_timing, run_strategies, run_strategy, time_strategy, Strategy, StrategyRun};
pub use kernel::grayscale;
pub use partition::{for_each_partitioned, partition_ranges, process_with_barrier, TailPolicy};

/// Size of the worker pool used by both strategies unless overridden.
pub const NUM_WORKERS: usize = 4;
pub const DEFAULT_INPUT: &str = "input.jpg";
pub const DEFAULT_OUTPUT: &str = "output.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub num_workers: usize,
    /// Task channel capacity for the channel strategy; 0 is a rendezvous.
    pub channel_capacity: usize,
    pub tail_policy: TailPolicy,
}

pub fn default_config() -> Config {
    Config { num_workers: NUM_WORKERS, channel_capacity: 0, tail_policy: TailPolicy::Skip }
}

impl Default for Config {
    fn default() -> Self { default_config() }
}

#[derive(Debug, Clone)]
pub struct Params {
    pub in_image_name: String,
    pub out_image_name: String,
    pub config: Config,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            in_image_name: DEFAULT_INPUT.to_string(),
            out_image_name: DEFAULT_OUTPUT.to_string(),
            config: default_config(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub runs: Vec<StrategyRun>,
}

impl RunSummary {
    pub fn timings(&self) -> Vec<(Strategy, Duration)> {
        self.runs.iter().map(|r| (r.strategy, r.elapsed)).collect()
    }

    pub fn run(&self, strategy: Strategy) -> Option<&StrategyRun> {
        self.runs.iter().find(|r| r.strategy == strategy)
    }
}

/// Loads the input, times both strategies on their own copies, prints the timings and
/// writes each result to the output path in turn. The last write wins.
pub fn process(params: Params) -> Result<RunSummary> {
    let Params { in_image_name, out_image_name, config } = params;
    info!("Starting grayscale dispatch benchmark");
    info!("Input image: {}", in_image_name);
    info!("Output image: {}", out_image_name);
    info!(
        "Workers: {}, channel capacity: {}, tail policy: {}, host cores: {}",
        config.num_workers,
        config.channel_capacity,
        config.tail_policy,
        num_cpus::get()
    );

    let input = load_image(&in_image_name)?;
    info!("Loaded {}x{} image", input.width(), input.height());

    let runs = run_strategies(&input, &config);
    for run in &runs {
        println!("{}", format_timing(run));
    }
    for run in &runs {
        save_jpeg(&out_image_name, &run.output)?;
        info!("Saved {} strategy output to {}", run.strategy, out_image_name);
    }
    Ok(RunSummary { runs })
}
