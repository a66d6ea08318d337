use log::{info, warn};
use std::fmt;
use std::time::{Duration, Instant};

use crate::buffer::PixelBuffer;
use crate::dispatch::process_with_channel;
use crate::partition::process_with_barrier;
use crate::Config;

/// The two ways of spreading the per-pixel pass over the worker pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Static contiguous ranges, joined on a completion barrier.
    Barrier,
    /// Indices dispatched one by one through a bounded channel.
    Channel,
}

impl Strategy {
    /// Execution order used by [`run_strategies`].
    pub const ALL: [Strategy; 2] = [Strategy::Barrier, Strategy::Channel];

    pub fn name(self) -> &'static str {
        match self {
            Self::Barrier => "barrier",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs one strategy in place and returns how many pixels it processed.
pub fn run_strategy(strategy: Strategy, buffer: &mut PixelBuffer, config: &Config) -> usize {
    match strategy {
        Strategy::Barrier => process_with_barrier(buffer, config.num_workers, config.tail_policy),
        Strategy::Channel => process_with_channel(buffer, config.num_workers, config.channel_capacity),
    }
}

#[derive(Clone, Debug)]
pub struct StrategyRun {
    pub strategy: Strategy,
    pub elapsed: Duration,
    pub pixels: usize,
    pub output: PixelBuffer,
}

/// Times a strategy over `buffer`, which it consumes and returns processed.
pub fn time_strategy(strategy: Strategy, mut buffer: PixelBuffer, config: &Config) -> StrategyRun {
    let start = Instant::now();
    let pixels = run_strategy(strategy, &mut buffer, config);
    let elapsed = start.elapsed();
    info!("{} strategy: {} pixels in {:?}", strategy, pixels, elapsed);
    StrategyRun { strategy, elapsed, pixels, output: buffer }
}

/// Clones `input` once per strategy up front, then times each strategy in turn on its
/// own copy. The second strategy starts only after the first has joined.
pub fn run_strategies(input: &PixelBuffer, config: &Config) -> Vec<StrategyRun> {
    if input.is_empty() {
        warn!("input image has no pixels; strategies have nothing to do");
    } else if config.num_workers > input.len() {
        warn!("{} workers for {} pixels; some workers will idle", config.num_workers, input.len());
    }
    let copies: Vec<PixelBuffer> = Strategy::ALL.iter().map(|_| input.clone()).collect();
    Strategy::ALL
        .into_iter()
        .zip(copies)
        .map(|(strategy, buffer)| time_strategy(strategy, buffer, config))
        .collect()
}

pub fn format_timing(run: &StrategyRun) -> String {
    format!("Elapsed time with {} strategy: {:?}", run.strategy, run.elapsed)
}
